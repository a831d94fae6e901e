// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

#![allow(clippy::module_name_repetitions)]

use thiserror::Error;

pub(crate) mod billing;
pub mod clock;
pub(crate) mod spaces;
pub(crate) mod users;
mod utils;
pub(crate) mod verifications;

/// Error when a value read from storage can't be mapped to one of the known
/// variants of an enum.
#[derive(Debug, Error)]
#[error("unknown {kind} {value:?}")]
pub struct UnknownVariantError {
    kind: &'static str,
    value: String,
}

impl UnknownVariantError {
    pub(crate) fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

pub use ulid::Ulid;

pub use self::{
    billing::{
        CardDetails, PaymentMethod, Subscription, SubscriptionInterval, SubscriptionStatus,
    },
    clock::{Clock, SystemClock},
    spaces::{Space, SpaceMember, SpaceMemberRole, SpaceTier},
    users::User,
    utils::{BoxClock, BoxRng, generate_billing_id, generate_id},
    verifications::{
        DuplicateVerifications, EMAIL_VERIFICATION_IDENTIFIER_PATTERN, OrphanedVerification,
        Verification, email_verification_target,
    },
};
