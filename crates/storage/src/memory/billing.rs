// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::cmp::Reverse;

use async_trait::async_trait;
use proize_data_model::{
    CardDetails, PaymentMethod, Space, Subscription, SubscriptionStatus, User,
    generate_billing_id,
};
use rand::RngCore;

use super::{MemoryData, MemoryError};
use crate::{
    Clock,
    billing::{PaymentMethodRepository, SubscriptionPlan, SubscriptionRepository},
};

pub(super) struct MemorySubscriptionRepository<'c> {
    data: &'c mut MemoryData,
}

impl<'c> MemorySubscriptionRepository<'c> {
    pub(super) fn new(data: &'c mut MemoryData) -> Self {
        Self { data }
    }
}

#[async_trait]
impl SubscriptionRepository for MemorySubscriptionRepository<'_> {
    type Error = MemoryError;

    async fn find_for_space(
        &mut self,
        space: &Space,
    ) -> Result<Option<Subscription>, Self::Error> {
        Ok(self
            .data
            .subscriptions
            .iter()
            .filter(|subscription| subscription.space_id == space.id)
            .min_by_key(|subscription| {
                (Reverse(subscription.active), Reverse(subscription.created_at))
            })
            .cloned())
    }

    async fn find_active_for_user(
        &mut self,
        user: &User,
    ) -> Result<Option<Subscription>, Self::Error> {
        Ok(self
            .data
            .subscriptions
            .iter()
            .find(|subscription| subscription.user_id == user.id && subscription.active)
            .cloned())
    }

    async fn add(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        user: &User,
        space: &Space,
        plan: &SubscriptionPlan,
    ) -> Result<Subscription, Self::Error> {
        let now = clock.now();
        let subscription = Subscription {
            id: generate_billing_id("sub", clock, rng, user),
            price_id: plan.price_id.clone(),
            subscription_item_id: generate_billing_id("sitem", clock, rng, user),
            amount: plan.amount,
            status: SubscriptionStatus::Active,
            quantity: plan.quantity,
            active: true,
            currency: plan.currency.clone(),
            interval: plan.interval,
            created_at: now,
            period_start: now,
            period_end: plan.period_end(now),
            cancel_at_period_end: false,
            user_id: user.id.clone(),
            space_id: space.id.clone(),
        };

        self.data.subscriptions.push(subscription.clone());
        Ok(subscription)
    }
}

pub(super) struct MemoryPaymentMethodRepository<'c> {
    data: &'c mut MemoryData,
}

impl<'c> MemoryPaymentMethodRepository<'c> {
    pub(super) fn new(data: &'c mut MemoryData) -> Self {
        Self { data }
    }
}

#[async_trait]
impl PaymentMethodRepository for MemoryPaymentMethodRepository<'_> {
    type Error = MemoryError;

    async fn list_for_user(&mut self, user: &User) -> Result<Vec<PaymentMethod>, Self::Error> {
        Ok(self
            .data
            .payment_methods
            .iter()
            .filter(|payment_method| payment_method.user_id == user.id)
            .cloned()
            .collect())
    }

    async fn add_card(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        user: &User,
        card: CardDetails,
    ) -> Result<PaymentMethod, Self::Error> {
        let now = clock.now();
        let payment_method = PaymentMethod {
            id: generate_billing_id("pm", clock, rng, user),
            user_id: user.id.clone(),
            kind: PaymentMethod::CARD.to_owned(),
            data: serde_json::to_value(card)?,
            created_at: now,
            updated_at: now,
        };

        self.data.payment_methods.push(payment_method.clone());
        Ok(payment_method)
    }
}
