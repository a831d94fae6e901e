// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use proize_data_model::{Space, Subscription, SubscriptionStatus, User, generate_billing_id};
use proize_storage::{
    Clock,
    billing::{SubscriptionPlan, SubscriptionRepository},
};
use rand::RngCore;
use sqlx::PgConnection;

use crate::{DatabaseError, DatabaseInconsistencyError, tracing::ExecuteExt};

/// An implementation of [`SubscriptionRepository`] for a PostgreSQL connection
pub struct PgSubscriptionRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgSubscriptionRepository<'c> {
    /// Create a new [`PgSubscriptionRepository`] from an active PostgreSQL
    /// connection
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct SubscriptionLookup {
    id: String,
    price_id: String,
    subscription_item_id: String,
    amount: i64,
    status: String,
    quantity: i32,
    active: bool,
    currency: String,
    interval: String,
    created_at: DateTime<Utc>,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    cancel_at_period_end: bool,
    user_id: String,
    space_id: String,
}

impl TryFrom<SubscriptionLookup> for Subscription {
    type Error = DatabaseInconsistencyError;

    fn try_from(value: SubscriptionLookup) -> Result<Self, Self::Error> {
        let status = value.status.parse().map_err(|e| {
            DatabaseInconsistencyError::on("subscriptions")
                .column("status")
                .row(&value.id)
                .source(e)
        })?;

        let interval = value.interval.parse().map_err(|e| {
            DatabaseInconsistencyError::on("subscriptions")
                .column("interval")
                .row(&value.id)
                .source(e)
        })?;

        Ok(Subscription {
            id: value.id,
            price_id: value.price_id,
            subscription_item_id: value.subscription_item_id,
            amount: value.amount,
            status,
            quantity: value.quantity,
            active: value.active,
            currency: value.currency,
            interval,
            created_at: value.created_at,
            period_start: value.period_start,
            period_end: value.period_end,
            cancel_at_period_end: value.cancel_at_period_end,
            user_id: value.user_id,
            space_id: value.space_id,
        })
    }
}

#[async_trait]
impl SubscriptionRepository for PgSubscriptionRepository<'_> {
    type Error = DatabaseError;

    #[tracing::instrument(
        name = "db.subscription.find_for_space",
        skip_all,
        fields(
            db.query.text,
            %space.id,
        ),
        err,
    )]
    async fn find_for_space(
        &mut self,
        space: &Space,
    ) -> Result<Option<Subscription>, Self::Error> {
        let res = sqlx::query_as::<_, SubscriptionLookup>(
            r#"
                SELECT id, price_id, subscription_item_id, amount, status, quantity,
                       active, currency, "interval", created_at, period_start,
                       period_end, cancel_at_period_end, user_id, space_id
                FROM subscriptions
                WHERE space_id = $1
                ORDER BY active DESC, created_at DESC
                LIMIT 1
            "#,
        )
        .bind(&space.id)
        .traced()
        .fetch_optional(&mut *self.conn)
        .await?;

        let Some(res) = res else {
            return Ok(None);
        };

        Ok(Some(res.try_into()?))
    }

    #[tracing::instrument(
        name = "db.subscription.find_active_for_user",
        skip_all,
        fields(
            db.query.text,
            %user.id,
        ),
        err,
    )]
    async fn find_active_for_user(
        &mut self,
        user: &User,
    ) -> Result<Option<Subscription>, Self::Error> {
        let res = sqlx::query_as::<_, SubscriptionLookup>(
            r#"
                SELECT id, price_id, subscription_item_id, amount, status, quantity,
                       active, currency, "interval", created_at, period_start,
                       period_end, cancel_at_period_end, user_id, space_id
                FROM subscriptions
                WHERE user_id = $1 AND active
                ORDER BY created_at DESC
                LIMIT 1
            "#,
        )
        .bind(&user.id)
        .traced()
        .fetch_optional(&mut *self.conn)
        .await?;

        let Some(res) = res else {
            return Ok(None);
        };

        Ok(Some(res.try_into()?))
    }

    #[tracing::instrument(
        name = "db.subscription.add",
        skip_all,
        fields(
            db.query.text,
            subscription.id,
            subscription.price_id = %plan.price_id,
            %user.id,
            %space.id,
        ),
        err,
    )]
    async fn add(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        user: &User,
        space: &Space,
        plan: &SubscriptionPlan,
    ) -> Result<Subscription, Self::Error> {
        let now = clock.now();
        let id = generate_billing_id("sub", clock, rng, user);
        let subscription_item_id = generate_billing_id("sitem", clock, rng, user);
        let period_end = plan.period_end(now);
        tracing::Span::current().record("subscription.id", tracing::field::display(&id));

        sqlx::query(
            r#"
                INSERT INTO subscriptions
                    ( id, price_id, subscription_item_id, amount, status, quantity
                    , active, currency, "interval", created_at, period_start
                    , period_end, cancel_at_period_end, user_id, space_id
                    )
                VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7, $8, $9, $9, $10, FALSE, $11, $12)
            "#,
        )
        .bind(&id)
        .bind(&plan.price_id)
        .bind(&subscription_item_id)
        .bind(plan.amount)
        .bind(SubscriptionStatus::Active.as_str())
        .bind(plan.quantity)
        .bind(&plan.currency)
        .bind(plan.interval.as_str())
        .bind(now)
        .bind(period_end)
        .bind(&user.id)
        .bind(&space.id)
        .traced()
        .execute(&mut *self.conn)
        .await?;

        Ok(Subscription {
            id,
            price_id: plan.price_id.clone(),
            subscription_item_id,
            amount: plan.amount,
            status: SubscriptionStatus::Active,
            quantity: plan.quantity,
            active: true,
            currency: plan.currency.clone(),
            interval: plan.interval,
            created_at: now,
            period_start: now,
            period_end,
            cancel_at_period_end: false,
            user_id: user.id.clone(),
            space_id: space.id.clone(),
        })
    }
}
