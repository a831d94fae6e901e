// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Repository to interact with [`User`]s

use async_trait::async_trait;
use proize_data_model::User;
use rand::RngCore;

use crate::{Clock, repository_impl};

/// A [`UserRepository`] helps interacting with [`User`] saved in the storage
/// backend
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// The error type returned by the repository
    type Error;

    /// Lookup a [`User`] by its ID
    ///
    /// Returns `None` if no [`User`] was found
    ///
    /// # Parameters
    ///
    /// * `id`: The ID of the [`User`] to lookup
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn lookup(&mut self, id: &str) -> Result<Option<User>, Self::Error>;

    /// List all the [`User`]s, ordered by ID
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn all(&mut self) -> Result<Vec<User>, Self::Error>;

    /// Create a new [`User`]
    ///
    /// Returns the newly created [`User`]
    ///
    /// # Parameters
    ///
    /// * `rng`: The random number generator to use
    /// * `clock`: The clock used to generate timestamps
    /// * `name`: The display name of the user, if any
    /// * `email`: The email address of the user
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn add(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        name: Option<String>,
        email: String,
    ) -> Result<User, Self::Error>;

    /// Record the payment provider customer of a [`User`]
    ///
    /// Returns the updated [`User`]
    ///
    /// # Parameters
    ///
    /// * `user`: The [`User`] to update
    /// * `customer_id`: The ID of the customer in the payment provider
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn set_customer_id(&mut self, user: User, customer_id: String)
    -> Result<User, Self::Error>;
}

repository_impl!(UserRepository:
    async fn lookup(&mut self, id: &str) -> Result<Option<User>, Self::Error>;
    async fn all(&mut self) -> Result<Vec<User>, Self::Error>;
    async fn add(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        name: Option<String>,
        email: String,
    ) -> Result<User, Self::Error>;
    async fn set_customer_id(&mut self, user: User, customer_id: String) -> Result<User, Self::Error>;
);
