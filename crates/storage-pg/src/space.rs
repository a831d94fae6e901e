// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! A module containing the PostgreSQL implementation of the [`SpaceRepository`]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use proize_data_model::{Space, SpaceMember, SpaceMemberRole, SpaceTier, User, generate_id};
use proize_storage::{Clock, space::SpaceRepository};
use rand::RngCore;
use sqlx::PgConnection;

use crate::{DatabaseError, DatabaseInconsistencyError, tracing::ExecuteExt};

/// An implementation of [`SpaceRepository`] for a PostgreSQL connection
pub struct PgSpaceRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgSpaceRepository<'c> {
    /// Create a new [`PgSpaceRepository`] from an active PostgreSQL connection
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct SpaceLookup {
    id: String,
    name: String,
    owner_id: String,
    tier: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<SpaceLookup> for Space {
    type Error = DatabaseInconsistencyError;

    fn try_from(value: SpaceLookup) -> Result<Self, Self::Error> {
        let tier = value.tier.parse().map_err(|e| {
            DatabaseInconsistencyError::on("spaces")
                .column("tier")
                .row(&value.id)
                .source(e)
        })?;

        Ok(Space {
            id: value.id,
            name: value.name,
            owner_id: value.owner_id,
            tier,
            created_at: value.created_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct SpaceMemberLookup {
    id: String,
    space_id: String,
    user_id: String,
    role: String,
    last_selected_at: Option<DateTime<Utc>>,
}

impl TryFrom<SpaceMemberLookup> for SpaceMember {
    type Error = DatabaseInconsistencyError;

    fn try_from(value: SpaceMemberLookup) -> Result<Self, Self::Error> {
        let role = value.role.parse().map_err(|e| {
            DatabaseInconsistencyError::on("space_members")
                .column("role")
                .row(&value.id)
                .source(e)
        })?;

        Ok(SpaceMember {
            id: value.id,
            space_id: value.space_id,
            user_id: value.user_id,
            role,
            last_selected_at: value.last_selected_at,
        })
    }
}

#[async_trait]
impl SpaceRepository for PgSpaceRepository<'_> {
    type Error = DatabaseError;

    #[tracing::instrument(
        name = "db.space.find_first_owned_by",
        skip_all,
        fields(
            db.query.text,
            %owner.id,
        ),
        err,
    )]
    async fn find_first_owned_by(&mut self, owner: &User) -> Result<Option<Space>, Self::Error> {
        let res = sqlx::query_as::<_, SpaceLookup>(
            r#"
                SELECT id, name, owner_id, tier, created_at
                FROM spaces
                WHERE owner_id = $1
                ORDER BY created_at ASC, id ASC
                LIMIT 1
            "#,
        )
        .bind(&owner.id)
        .traced()
        .fetch_optional(&mut *self.conn)
        .await?;

        let Some(res) = res else {
            return Ok(None);
        };

        Ok(Some(res.try_into()?))
    }

    #[tracing::instrument(
        name = "db.space.add",
        skip_all,
        fields(
            db.query.text,
            space.id,
            space.name = %name,
            %owner.id,
        ),
        err,
    )]
    async fn add(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        owner: &User,
        name: String,
    ) -> Result<Space, Self::Error> {
        let created_at = clock.now();
        let id = generate_id(clock, rng);
        tracing::Span::current().record("space.id", tracing::field::display(&id));

        sqlx::query(
            r#"
                INSERT INTO spaces (id, name, owner_id, tier, created_at)
                VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&id)
        .bind(&name)
        .bind(&owner.id)
        .bind(SpaceTier::Hobby.as_str())
        .bind(created_at)
        .traced()
        .execute(&mut *self.conn)
        .await?;

        Ok(Space {
            id,
            name,
            owner_id: owner.id.clone(),
            tier: SpaceTier::Hobby,
            created_at,
        })
    }

    #[tracing::instrument(
        name = "db.space.set_tier",
        skip_all,
        fields(
            db.query.text,
            %space.id,
            space.tier = %tier,
        ),
        err,
    )]
    async fn set_tier(&mut self, mut space: Space, tier: SpaceTier) -> Result<Space, Self::Error> {
        let res = sqlx::query("UPDATE spaces SET tier = $2 WHERE id = $1")
            .bind(&space.id)
            .bind(tier.as_str())
            .traced()
            .execute(&mut *self.conn)
            .await?;

        DatabaseError::ensure_affected_rows(&res, 1)?;

        space.tier = tier;
        Ok(space)
    }

    #[tracing::instrument(
        name = "db.space.add_member",
        skip_all,
        fields(
            db.query.text,
            %space.id,
            %user.id,
            space_member.role = %role,
        ),
        err,
    )]
    async fn add_member(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        space: &Space,
        user: &User,
        role: SpaceMemberRole,
    ) -> Result<SpaceMember, Self::Error> {
        let now = clock.now();
        let id = generate_id(clock, rng);

        sqlx::query(
            r#"
                INSERT INTO space_members (id, space_id, user_id, role, last_selected_at)
                VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&id)
        .bind(&space.id)
        .bind(&user.id)
        .bind(role.as_str())
        .bind(now)
        .traced()
        .execute(&mut *self.conn)
        .await?;

        Ok(SpaceMember {
            id,
            space_id: space.id.clone(),
            user_id: user.id.clone(),
            role,
            last_selected_at: Some(now),
        })
    }

    #[tracing::instrument(
        name = "db.space.list_members",
        skip_all,
        fields(
            db.query.text,
            %space.id,
        ),
        err,
    )]
    async fn list_members(&mut self, space: &Space) -> Result<Vec<SpaceMember>, Self::Error> {
        let res = sqlx::query_as::<_, SpaceMemberLookup>(
            r#"
                SELECT id, space_id, user_id, role, last_selected_at
                FROM space_members
                WHERE space_id = $1
                ORDER BY id
            "#,
        )
        .bind(&space.id)
        .traced()
        .fetch_all(&mut *self.conn)
        .await?;

        let members = res
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(members)
    }
}
