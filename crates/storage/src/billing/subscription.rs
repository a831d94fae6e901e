// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use async_trait::async_trait;
use chrono::{DateTime, Months, Utc};
use proize_data_model::{Space, Subscription, SubscriptionInterval, User};
use rand::RngCore;

use crate::{Clock, repository_impl};

/// The plan a new [`Subscription`] is created from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionPlan {
    /// The price ID in the payment provider
    pub price_id: String,

    /// Amount in the minor unit of the currency
    pub amount: i64,

    /// Three-letter currency code
    pub currency: String,

    /// Number of seats
    pub quantity: i32,

    /// Renewal interval
    pub interval: SubscriptionInterval,

    /// Length of the first period, in years
    pub duration_years: u32,
}

impl SubscriptionPlan {
    /// Compute the end of the first period of a subscription started at
    /// `start`
    ///
    /// Saturates to the maximum representable date on overflow.
    #[must_use]
    pub fn period_end(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        start
            .checked_add_months(Months::new(self.duration_years.saturating_mul(12)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// A [`SubscriptionRepository`] helps interacting with [`Subscription`] saved
/// in the storage backend
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// The error type returned by the repository
    type Error;

    /// Find the most relevant [`Subscription`] of a [`Space`]
    ///
    /// Active subscriptions come first, then the most recently created.
    /// Returns `None` if the space has no subscription.
    ///
    /// # Parameters
    ///
    /// * `space`: The [`Space`] to look the subscription for
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn find_for_space(&mut self, space: &Space)
    -> Result<Option<Subscription>, Self::Error>;

    /// Find an active [`Subscription`] created on behalf of a [`User`]
    ///
    /// Returns `None` if the user has no active subscription.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn find_active_for_user(
        &mut self,
        user: &User,
    ) -> Result<Option<Subscription>, Self::Error>;

    /// Create an active [`Subscription`] for a [`Space`], on behalf of a
    /// [`User`]
    ///
    /// The subscription period starts now, and lasts for the duration of the
    /// plan.
    ///
    /// # Parameters
    ///
    /// * `rng`: The random number generator to use
    /// * `clock`: The clock used to generate timestamps
    /// * `user`: The [`User`] subscribing
    /// * `space`: The [`Space`] the subscription applies to
    /// * `plan`: The [`SubscriptionPlan`] to subscribe to
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn add(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        user: &User,
        space: &Space,
        plan: &SubscriptionPlan,
    ) -> Result<Subscription, Self::Error>;
}

repository_impl!(SubscriptionRepository:
    async fn find_for_space(&mut self, space: &Space) -> Result<Option<Subscription>, Self::Error>;
    async fn find_active_for_user(&mut self, user: &User) -> Result<Option<Subscription>, Self::Error>;
    async fn add(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        user: &User,
        space: &Space,
        plan: &SubscriptionPlan,
    ) -> Result<Subscription, Self::Error>;
);

#[cfg(test)]
mod tests {
    use chrono::{Datelike, TimeZone};

    use super::*;

    #[test]
    fn test_period_end() {
        let plan = SubscriptionPlan {
            price_id: "price_lifetime_premium".to_owned(),
            amount: 5600,
            currency: "EUR".to_owned(),
            quantity: 999,
            interval: SubscriptionInterval::Year,
            duration_years: 99,
        };

        let start = Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap();
        let end = plan.period_end(start);
        assert_eq!(end.year(), 2123);
        assert_eq!(end.month(), 2);
        assert_eq!(end.day(), 28);

        let plan = SubscriptionPlan {
            duration_years: u32::MAX,
            ..plan
        };
        assert_eq!(plan.period_end(start), DateTime::<Utc>::MAX_UTC);
    }
}
