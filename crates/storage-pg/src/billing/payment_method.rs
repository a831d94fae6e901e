// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use proize_data_model::{CardDetails, PaymentMethod, User, generate_billing_id};
use proize_storage::{Clock, billing::PaymentMethodRepository};
use rand::RngCore;
use sqlx::{PgConnection, types::Json};

use crate::{DatabaseError, tracing::ExecuteExt};

/// An implementation of [`PaymentMethodRepository`] for a PostgreSQL
/// connection
pub struct PgPaymentMethodRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgPaymentMethodRepository<'c> {
    /// Create a new [`PgPaymentMethodRepository`] from an active PostgreSQL
    /// connection
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct PaymentMethodLookup {
    id: String,
    user_id: String,
    #[sqlx(rename = "type")]
    kind: String,
    data: Json<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PaymentMethodLookup> for PaymentMethod {
    fn from(value: PaymentMethodLookup) -> Self {
        PaymentMethod {
            id: value.id,
            user_id: value.user_id,
            kind: value.kind,
            data: value.data.0,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[async_trait]
impl PaymentMethodRepository for PgPaymentMethodRepository<'_> {
    type Error = DatabaseError;

    #[tracing::instrument(
        name = "db.payment_method.list_for_user",
        skip_all,
        fields(
            db.query.text,
            %user.id,
        ),
        err,
    )]
    async fn list_for_user(&mut self, user: &User) -> Result<Vec<PaymentMethod>, Self::Error> {
        let res = sqlx::query_as::<_, PaymentMethodLookup>(
            r#"
                SELECT id, user_id, type, data, created_at, updated_at
                FROM payment_methods
                WHERE user_id = $1
                ORDER BY created_at, id
            "#,
        )
        .bind(&user.id)
        .traced()
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(res.into_iter().map(Into::into).collect())
    }

    #[tracing::instrument(
        name = "db.payment_method.add_card",
        skip_all,
        fields(
            db.query.text,
            payment_method.id,
            %user.id,
        ),
        err,
    )]
    async fn add_card(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        user: &User,
        card: CardDetails,
    ) -> Result<PaymentMethod, Self::Error> {
        let now = clock.now();
        let id = generate_billing_id("pm", clock, rng, user);
        let data = serde_json::to_value(card)?;
        tracing::Span::current().record("payment_method.id", tracing::field::display(&id));

        sqlx::query(
            r#"
                INSERT INTO payment_methods (id, user_id, type, data, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $5)
            "#,
        )
        .bind(&id)
        .bind(&user.id)
        .bind(PaymentMethod::CARD)
        .bind(Json(&data))
        .bind(now)
        .traced()
        .execute(&mut *self.conn)
        .await?;

        Ok(PaymentMethod {
            id,
            user_id: user.id.clone(),
            kind: PaymentMethod::CARD.to_owned(),
            data,
            created_at: now,
            updated_at: now,
        })
    }
}
