// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Repository to interact with [`Space`]s and their members

use async_trait::async_trait;
use proize_data_model::{Space, SpaceMember, SpaceMemberRole, SpaceTier, User};
use rand::RngCore;

use crate::{Clock, repository_impl};

/// A [`SpaceRepository`] helps interacting with [`Space`] and [`SpaceMember`]
/// saved in the storage backend
#[async_trait]
pub trait SpaceRepository: Send + Sync {
    /// The error type returned by the repository
    type Error;

    /// Find the first [`Space`] owned by a [`User`], the oldest one
    ///
    /// Returns `None` if the user owns no space
    ///
    /// # Parameters
    ///
    /// * `owner`: The [`User`] owning the space
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn find_first_owned_by(&mut self, owner: &User) -> Result<Option<Space>, Self::Error>;

    /// Create a new [`Space`] on the hobby tier
    ///
    /// Returns the newly created [`Space`]
    ///
    /// # Parameters
    ///
    /// * `rng`: The random number generator to use
    /// * `clock`: The clock used to generate timestamps
    /// * `owner`: The [`User`] owning the space
    /// * `name`: The name of the space
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn add(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        owner: &User,
        name: String,
    ) -> Result<Space, Self::Error>;

    /// Change the tier of a [`Space`]
    ///
    /// Returns the updated [`Space`]
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn set_tier(&mut self, space: Space, tier: SpaceTier) -> Result<Space, Self::Error>;

    /// Add a [`User`] as a member of a [`Space`]
    ///
    /// The membership is marked as the last selected space of the user.
    ///
    /// # Parameters
    ///
    /// * `rng`: The random number generator to use
    /// * `clock`: The clock used to generate timestamps
    /// * `space`: The [`Space`] to add the member to
    /// * `user`: The [`User`] to add
    /// * `role`: The role of the user in the space
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn add_member(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        space: &Space,
        user: &User,
        role: SpaceMemberRole,
    ) -> Result<SpaceMember, Self::Error>;

    /// List the members of a [`Space`]
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn list_members(&mut self, space: &Space) -> Result<Vec<SpaceMember>, Self::Error>;
}

repository_impl!(SpaceRepository:
    async fn find_first_owned_by(&mut self, owner: &User) -> Result<Option<Space>, Self::Error>;
    async fn add(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        owner: &User,
        name: String,
    ) -> Result<Space, Self::Error>;
    async fn set_tier(&mut self, space: Space, tier: SpaceTier) -> Result<Space, Self::Error>;
    async fn add_member(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        space: &Space,
        user: &User,
        role: SpaceMemberRole,
    ) -> Result<SpaceMember, Self::Error>;
    async fn list_members(&mut self, space: &Space) -> Result<Vec<SpaceMember>, Self::Error>;
);
