// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Repositories to interact with billing records: subscriptions and payment
//! methods

mod payment_method;
mod subscription;

pub use self::{
    payment_method::PaymentMethodRepository,
    subscription::{SubscriptionPlan, SubscriptionRepository},
};
