// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use async_trait::async_trait;
use proize_data_model::{CardDetails, PaymentMethod, User};
use rand::RngCore;

use crate::{Clock, repository_impl};

/// A [`PaymentMethodRepository`] helps interacting with [`PaymentMethod`]
/// saved in the storage backend
#[async_trait]
pub trait PaymentMethodRepository: Send + Sync {
    /// The error type returned by the repository
    type Error;

    /// List the [`PaymentMethod`]s of a [`User`]
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn list_for_user(&mut self, user: &User) -> Result<Vec<PaymentMethod>, Self::Error>;

    /// Record a card as a [`PaymentMethod`] of a [`User`]
    ///
    /// Returns the newly created [`PaymentMethod`]
    ///
    /// # Parameters
    ///
    /// * `rng`: The random number generator to use
    /// * `clock`: The clock used to generate timestamps
    /// * `user`: The [`User`] owning the card
    /// * `card`: The [`CardDetails`] to record
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn add_card(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        user: &User,
        card: CardDetails,
    ) -> Result<PaymentMethod, Self::Error>;
}

repository_impl!(PaymentMethodRepository:
    async fn list_for_user(&mut self, user: &User) -> Result<Vec<PaymentMethod>, Self::Error>;
    async fn add_card(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        user: &User,
        card: CardDetails,
    ) -> Result<PaymentMethod, Self::Error>;
);
