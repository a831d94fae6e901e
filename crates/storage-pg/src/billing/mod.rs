// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! A module containing the PostgreSQL implementation of the billing
//! repositories

mod payment_method;
mod subscription;

pub use self::{
    payment_method::PgPaymentMethodRepository, subscription::PgSubscriptionRepository,
};
