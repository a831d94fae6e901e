// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use rand::RngCore;
use rand_chacha::rand_core::CryptoRngCore;
use ulid::Ulid;

use crate::{User, clock::Clock};

/// A boxed [`Clock`]
pub type BoxClock = Box<dyn Clock + Send>;
/// A boxed random number generator
pub type BoxRng = Box<dyn CryptoRngCore + Send>;

/// Generate a new lowercase ULID-based identifier, seeded from the given
/// clock and random number generator.
pub fn generate_id(clock: &dyn Clock, rng: &mut (dyn RngCore + Send)) -> String {
    Ulid::from_datetime_with_source(clock.now().into(), rng)
        .to_string()
        .to_lowercase()
}

/// Generate an identifier for a billing record created on behalf of a user.
///
/// Those look like `sub_01J..._user-ali`, with the given prefix, a ULID and
/// the first characters of the user ID.
pub fn generate_billing_id(
    prefix: &str,
    clock: &dyn Clock,
    rng: &mut (dyn RngCore + Send),
    owner: &User,
) -> String {
    let ulid = Ulid::from_datetime_with_source(clock.now().into(), rng);
    format!("{prefix}_{ulid}_{}", owner.short_id())
}
