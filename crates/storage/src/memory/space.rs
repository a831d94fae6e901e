// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use async_trait::async_trait;
use proize_data_model::{
    Space, SpaceMember, SpaceMemberRole, SpaceTier, User, generate_id,
};
use rand::RngCore;

use super::{MemoryData, MemoryError};
use crate::{Clock, space::SpaceRepository};

pub(super) struct MemorySpaceRepository<'c> {
    data: &'c mut MemoryData,
}

impl<'c> MemorySpaceRepository<'c> {
    pub(super) fn new(data: &'c mut MemoryData) -> Self {
        Self { data }
    }
}

#[async_trait]
impl SpaceRepository for MemorySpaceRepository<'_> {
    type Error = MemoryError;

    async fn find_first_owned_by(&mut self, owner: &User) -> Result<Option<Space>, Self::Error> {
        Ok(self
            .data
            .spaces
            .iter()
            .filter(|space| space.owner_id == owner.id)
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
            .cloned())
    }

    async fn add(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        owner: &User,
        name: String,
    ) -> Result<Space, Self::Error> {
        let space = Space {
            id: generate_id(clock, rng),
            name,
            owner_id: owner.id.clone(),
            tier: SpaceTier::Hobby,
            created_at: clock.now(),
        };

        self.data.spaces.push(space.clone());
        Ok(space)
    }

    async fn set_tier(&mut self, mut space: Space, tier: SpaceTier) -> Result<Space, Self::Error> {
        let row = self
            .data
            .spaces
            .iter_mut()
            .find(|row| row.id == space.id)
            .ok_or_else(|| MemoryError::RowNotFound {
                table: "spaces",
                id: space.id.clone(),
            })?;

        row.tier = tier;
        space.tier = tier;
        Ok(space)
    }

    async fn add_member(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        space: &Space,
        user: &User,
        role: SpaceMemberRole,
    ) -> Result<SpaceMember, Self::Error> {
        let member = SpaceMember {
            id: generate_id(clock, rng),
            space_id: space.id.clone(),
            user_id: user.id.clone(),
            role,
            last_selected_at: Some(clock.now()),
        };

        self.data.space_members.push(member.clone());
        Ok(member)
    }

    async fn list_members(&mut self, space: &Space) -> Result<Vec<SpaceMember>, Self::Error> {
        Ok(self
            .data
            .space_members
            .iter()
            .filter(|member| member.space_id == space.id)
            .cloned()
            .collect())
    }
}
