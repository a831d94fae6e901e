// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Repository to interact with [`Verification`] tokens

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use proize_data_model::{DuplicateVerifications, OrphanedVerification, Verification};
use rand::RngCore;

use crate::{Clock, repository_impl};

/// A [`VerificationRepository`] helps interacting with [`Verification`] tokens
/// saved in the storage backend
#[async_trait]
pub trait VerificationRepository: Send + Sync {
    /// The error type returned by the repository
    type Error;

    /// Lookup a [`Verification`] by its ID
    ///
    /// Returns `None` if no [`Verification`] was found
    ///
    /// # Parameters
    ///
    /// * `id`: The ID of the [`Verification`] to lookup
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn lookup(&mut self, id: &str) -> Result<Option<Verification>, Self::Error>;

    /// Create a new [`Verification`]
    ///
    /// Returns the newly created [`Verification`]
    ///
    /// # Parameters
    ///
    /// * `rng`: The random number generator to use
    /// * `clock`: The clock used to generate timestamps
    /// * `identifier`: The identifier of the token
    /// * `value`: The secret value of the token
    /// * `expires_at`: When the token expires
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn add(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        identifier: String,
        value: String,
        expires_at: DateTime<Utc>,
    ) -> Result<Verification, Self::Error>;

    /// Count all the [`Verification`] tokens
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn count(&mut self) -> Result<usize, Self::Error>;

    /// Find the identifiers shared by more than one [`Verification`]
    ///
    /// Groups are ordered by identifier. Within a group, IDs are ordered from
    /// the most recently created to the oldest, ties being broken by the ID in
    /// descending order.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn find_duplicates(&mut self) -> Result<Vec<DuplicateVerifications>, Self::Error>;

    /// Find the email verification tokens whose target email doesn't match
    /// any user, ignoring case
    ///
    /// Identifiers which are not the one of an email verification token are
    /// never returned. Results are ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn find_orphaned_email_verifications(
        &mut self,
    ) -> Result<Vec<OrphanedVerification>, Self::Error>;

    /// Delete the [`Verification`] tokens with the given IDs
    ///
    /// Returns the number of tokens actually deleted. IDs which don't exist
    /// are ignored.
    ///
    /// # Parameters
    ///
    /// * `ids`: The IDs of the tokens to delete
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn delete_by_ids(&mut self, ids: &[String]) -> Result<usize, Self::Error>;
}

repository_impl!(VerificationRepository:
    async fn lookup(&mut self, id: &str) -> Result<Option<Verification>, Self::Error>;
    async fn add(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        identifier: String,
        value: String,
        expires_at: DateTime<Utc>,
    ) -> Result<Verification, Self::Error>;
    async fn count(&mut self) -> Result<usize, Self::Error>;
    async fn find_duplicates(&mut self) -> Result<Vec<DuplicateVerifications>, Self::Error>;
    async fn find_orphaned_email_verifications(
        &mut self,
    ) -> Result<Vec<OrphanedVerification>, Self::Error>;
    async fn delete_by_ids(&mut self, ids: &[String]) -> Result<usize, Self::Error>;
);
