// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Maintenance endpoints, protected by a shared secret

mod authorization;
pub mod clean_verifications;
mod flags;
pub mod grant_pro;

pub use self::authorization::{AdminAuthorization, AdminSecret};
