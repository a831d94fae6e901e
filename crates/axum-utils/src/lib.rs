// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

#![deny(clippy::future_not_send)]
#![allow(clippy::module_name_repetitions)]

pub mod fancy_error;
pub mod sentry;
pub mod session;

pub use axum;

pub use self::{
    fancy_error::InternalError,
    session::{SessionUserId, UserIdHeader},
};
