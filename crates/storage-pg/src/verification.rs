// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! A module containing the PostgreSQL implementation of the
//! [`VerificationRepository`]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use proize_data_model::{
    DuplicateVerifications, EMAIL_VERIFICATION_IDENTIFIER_PATTERN, OrphanedVerification,
    Verification, generate_id,
};
use proize_storage::{Clock, verification::VerificationRepository};
use rand::RngCore;
use sqlx::PgConnection;

use crate::{DatabaseError, DatabaseInconsistencyError, tracing::ExecuteExt};

/// An implementation of [`VerificationRepository`] for a PostgreSQL connection
pub struct PgVerificationRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgVerificationRepository<'c> {
    /// Create a new [`PgVerificationRepository`] from an active PostgreSQL
    /// connection
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct VerificationLookup {
    id: String,
    identifier: String,
    value: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<VerificationLookup> for Verification {
    fn from(value: VerificationLookup) -> Self {
        Verification {
            id: value.id,
            identifier: value.identifier,
            value: value.value,
            expires_at: value.expires_at,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct DuplicateLookup {
    identifier: String,
    ids: Vec<String>,
}

impl TryFrom<DuplicateLookup> for DuplicateVerifications {
    type Error = DatabaseInconsistencyError;

    fn try_from(value: DuplicateLookup) -> Result<Self, Self::Error> {
        let row = value.identifier.clone();
        DuplicateVerifications::new(value.identifier, value.ids).ok_or_else(|| {
            DatabaseInconsistencyError::on("verifications")
                .column("identifier")
                .row(&row)
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct OrphanLookup {
    id: String,
    identifier: String,
    email: String,
}

impl From<OrphanLookup> for OrphanedVerification {
    fn from(value: OrphanLookup) -> Self {
        OrphanedVerification {
            id: value.id,
            identifier: value.identifier,
            email: value.email,
        }
    }
}

#[async_trait]
impl VerificationRepository for PgVerificationRepository<'_> {
    type Error = DatabaseError;

    #[tracing::instrument(
        name = "db.verification.lookup",
        skip_all,
        fields(
            db.query.text,
            verification.id = id,
        ),
        err,
    )]
    async fn lookup(&mut self, id: &str) -> Result<Option<Verification>, Self::Error> {
        let res = sqlx::query_as::<_, VerificationLookup>(
            r#"
                SELECT id, identifier, value, expires_at, created_at, updated_at
                FROM verifications
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
        name = "db.verification.add",
        skip_all,
        fields(
            db.query.text,
            verification.id,
            verification.identifier = %identifier,
        ),
        err,
    )]
    async fn add(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        identifier: String,
        value: String,
        expires_at: DateTime<Utc>,
    ) -> Result<Verification, Self::Error> {
        let created_at = clock.now();
        let id = generate_id(clock, rng);
        tracing::Span::current().record("verification.id", tracing::field::display(&id));

        sqlx::query(
            r#"
                INSERT INTO verifications
                    (id, identifier, value, expires_at, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $5)
            "#,
        )
        .bind(&id)
        .bind(&identifier)
        .bind(&value)
        .bind(expires_at)
        .bind(created_at)
        .traced()
        .execute(&mut *self.conn)
        .await?;

        Ok(Verification {
            id,
            identifier,
            value,
            expires_at,
            created_at,
            updated_at: created_at,
        })
    }

    #[tracing::instrument(
        name = "db.verification.count",
        skip_all,
        fields(
            db.query.text,
        ),
        err,
    )]
    async fn count(&mut self) -> Result<usize, Self::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM verifications")
            .traced()
            .fetch_one(&mut *self.conn)
            .await?;

        count
            .try_into()
            .map_err(DatabaseError::to_invalid_operation)
    }

    #[tracing::instrument(
        name = "db.verification.find_duplicates",
        skip_all,
        fields(
            db.query.text,
        ),
        err,
    )]
    async fn find_duplicates(&mut self) -> Result<Vec<DuplicateVerifications>, Self::Error> {
        let res = sqlx::query_as::<_, DuplicateLookup>(
            r#"
                SELECT identifier,
                       array_agg(id ORDER BY created_at DESC, id DESC) AS ids
                FROM verifications
                GROUP BY identifier
                HAVING COUNT(*) > 1
                ORDER BY identifier
            "#,
        )
        .traced()
        .fetch_all(&mut *self.conn)
        .await?;

        let duplicates = res
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(duplicates)
    }

    #[tracing::instrument(
        name = "db.verification.find_orphaned_email_verifications",
        skip_all,
        fields(
            db.query.text,
        ),
        err,
    )]
    async fn find_orphaned_email_verifications(
        &mut self,
    ) -> Result<Vec<OrphanedVerification>, Self::Error> {
        // The pattern captures the email in its only capturing group, which is
        // what `substring` returns
        let res = sqlx::query_as::<_, OrphanLookup>(
            r#"
                SELECT v.id, v.identifier, v.email
                FROM (
                    SELECT id, identifier, substring(identifier FROM $1) AS email
                    FROM verifications
                    WHERE identifier ~ $1
                ) AS v
                WHERE NOT EXISTS (
                    SELECT 1
                    FROM users u
                    WHERE lower(u.email) = lower(v.email)
                )
                ORDER BY v.id
            "#,
        )
        .bind(EMAIL_VERIFICATION_IDENTIFIER_PATTERN)
        .traced()
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(res.into_iter().map(Into::into).collect())
    }

    #[tracing::instrument(
        name = "db.verification.delete_by_ids",
        skip_all,
        fields(
            db.query.text,
            verification.count = ids.len(),
        ),
        err,
    )]
    async fn delete_by_ids(&mut self, ids: &[String]) -> Result<usize, Self::Error> {
        if ids.is_empty() {
            return Ok(0);
        }

        let res = sqlx::query("DELETE FROM verifications WHERE id = ANY($1)")
            .bind(ids)
            .traced()
            .execute(&mut *self.conn)
            .await?;

        res.rows_affected()
            .try_into()
            .map_err(DatabaseError::to_invalid_operation)
    }
}
