// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! A module containing the PostgreSQL implementation of the [`UserRepository`]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use proize_data_model::{User, generate_id};
use proize_storage::{Clock, user::UserRepository};
use rand::RngCore;
use sqlx::PgConnection;

use crate::{DatabaseError, tracing::ExecuteExt};

/// An implementation of [`UserRepository`] for a PostgreSQL connection
pub struct PgUserRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgUserRepository<'c> {
    /// Create a new [`PgUserRepository`] from an active PostgreSQL connection
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct UserLookup {
    id: String,
    name: Option<String>,
    email: String,
    customer_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<UserLookup> for User {
    fn from(value: UserLookup) -> Self {
        User {
            id: value.id,
            name: value.name,
            email: value.email,
            customer_id: value.customer_id,
            created_at: value.created_at,
        }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository<'_> {
    type Error = DatabaseError;

    #[tracing::instrument(
        name = "db.user.lookup",
        skip_all,
        fields(
            db.query.text,
            user.id = id,
        ),
        err,
    )]
    async fn lookup(&mut self, id: &str) -> Result<Option<User>, Self::Error> {
        let res = sqlx::query_as::<_, UserLookup>(
            r#"
                SELECT id, name, email, customer_id, created_at
                FROM users
                WHERE id = $1
            "#,
        )
        .bind(id)
        .traced()
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(res.map(Into::into))
    }

    #[tracing::instrument(
        name = "db.user.all",
        skip_all,
        fields(
            db.query.text,
        ),
        err,
    )]
    async fn all(&mut self) -> Result<Vec<User>, Self::Error> {
        let res = sqlx::query_as::<_, UserLookup>(
            r#"
                SELECT id, name, email, customer_id, created_at
                FROM users
                ORDER BY id
            "#,
        )
        .traced()
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(res.into_iter().map(Into::into).collect())
    }

    #[tracing::instrument(
        name = "db.user.add",
        skip_all,
        fields(
            db.query.text,
            user.id,
            user.email = %email,
        ),
        err,
    )]
    async fn add(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        name: Option<String>,
        email: String,
    ) -> Result<User, Self::Error> {
        let created_at = clock.now();
        let id = generate_id(clock, rng);
        tracing::Span::current().record("user.id", tracing::field::display(&id));

        sqlx::query(
            r#"
                INSERT INTO users (id, name, email, created_at)
                VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&id)
        .bind(name.as_deref())
        .bind(&email)
        .bind(created_at)
        .traced()
        .execute(&mut *self.conn)
        .await?;

        Ok(User {
            id,
            name,
            email,
            customer_id: None,
            created_at,
        })
    }

    #[tracing::instrument(
        name = "db.user.set_customer_id",
        skip_all,
        fields(
            db.query.text,
            %user.id,
            user.customer_id = %customer_id,
        ),
        err,
    )]
    async fn set_customer_id(
        &mut self,
        mut user: User,
        customer_id: String,
    ) -> Result<User, Self::Error> {
        let res = sqlx::query("UPDATE users SET customer_id = $2 WHERE id = $1")
            .bind(&user.id)
            .bind(&customer_id)
            .traced()
            .execute(&mut *self.conn)
            .await?;

        DatabaseError::ensure_affected_rows(&res, 1)?;

        user.customer_id = Some(customer_id);
        Ok(user)
    }
}
