// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! An in-memory storage backend, used in tests
//!
//! Every [`MemoryRepository`] works on its own copy of the data, which
//! replaces the shared state when the repository is saved. This gives the same
//! all-or-nothing behaviour as a database transaction, without any isolation
//! between concurrent repositories: the last one to be saved wins.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use futures_util::{FutureExt, future::BoxFuture, lock::Mutex};
use proize_data_model::{PaymentMethod, Space, SpaceMember, Subscription, User, Verification};
use thiserror::Error;

use crate::{
    BoxRepository, MapErr, RepositoryAccess, RepositoryError, RepositoryFactory,
    RepositoryTransaction,
    billing::{PaymentMethodRepository, SubscriptionRepository},
    space::SpaceRepository,
    user::UserRepository,
    verification::VerificationRepository,
};

mod billing;
mod space;
mod user;
mod verification;


/// Errors returned by the in-memory backend
#[derive(Debug, Error)]
pub enum MemoryError {
    /// The backend was marked as unavailable
    #[error("the storage backend is unavailable")]
    Unavailable,

    /// A failure was injected in an operation
    #[error("injected failure in {operation}")]
    Injected {
        /// The operation which failed
        operation: &'static str,
    },

    /// A row which was expected to exist is missing
    #[error("row {id:?} not found in {table}")]
    RowNotFound {
        /// The table looked up
        table: &'static str,

        /// The ID of the missing row
        id: String,
    },

    /// Failed to encode a value
    #[error("failed to encode a value")]
    Encode(#[from] serde_json::Error),
}

/// All the rows of the in-memory backend
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryData {
    pub(crate) verifications: Vec<Verification>,
    pub(crate) users: Vec<User>,
    pub(crate) spaces: Vec<Space>,
    pub(crate) space_members: Vec<SpaceMember>,
    pub(crate) subscriptions: Vec<Subscription>,
    pub(crate) payment_methods: Vec<PaymentMethod>,
}

/// Knobs to make the backend fail on purpose
#[derive(Debug)]
struct Faults {
    unavailable: AtomicBool,

    /// How many verification deletions succeed before they start failing
    verification_deletes_budget: AtomicUsize,
}

impl Default for Faults {
    fn default() -> Self {
        Self {
            unavailable: AtomicBool::new(false),
            verification_deletes_budget: AtomicUsize::new(usize::MAX),
        }
    }
}

impl Faults {
    fn check_verification_delete(&self) -> Result<(), MemoryError> {
        let allowed = self
            .verification_deletes_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |budget| {
                budget.checked_sub(1)
            })
            .is_ok();

        if allowed {
            Ok(())
        } else {
            Err(MemoryError::Injected {
                operation: "verification deletion",
            })
        }
    }
}

/// A [`RepositoryFactory`] creating [`MemoryRepository`] sharing the same
/// data
#[derive(Debug, Clone, Default)]
pub struct MemoryRepositoryFactory {
    data: Arc<Mutex<MemoryData>>,
    faults: Arc<Faults>,
}

impl MemoryRepositoryFactory {
    /// Create a new factory, with an empty backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new [`MemoryRepository`], wrapping a copy of the current data
    ///
    /// # Errors
    ///
    /// Returns an error if the backend was marked as unavailable
    pub async fn repository(&self) -> Result<MemoryRepository, MemoryError> {
        if self.faults.unavailable.load(Ordering::SeqCst) {
            return Err(MemoryError::Unavailable);
        }

        let data = self.data.lock().await.clone();
        Ok(MemoryRepository {
            shared: Arc::clone(&self.data),
            faults: Arc::clone(&self.faults),
            data,
        })
    }

    /// Mark the backend as unavailable, making every new repository fail
    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Let the next `count` verification deletions succeed, and fail the
    /// following ones
    pub fn fail_verification_deletes_after(&self, count: usize) {
        self.faults
            .verification_deletes_budget
            .store(count, Ordering::SeqCst);
    }

    /// Number of verification tokens currently saved
    pub async fn verification_count(&self) -> usize {
        self.data.lock().await.verifications.len()
    }
}

#[async_trait]
impl RepositoryFactory for MemoryRepositoryFactory {
    async fn create(&self) -> Result<BoxRepository, RepositoryError> {
        let repo = self
            .repository()
            .await
            .map_err(RepositoryError::from_error)?;

        Ok(repo.boxed())
    }
}

/// A unit of work over the in-memory backend
pub struct MemoryRepository {
    shared: Arc<Mutex<MemoryData>>,
    faults: Arc<Faults>,
    data: MemoryData,
}

impl MemoryRepository {
    /// Wrap this repository in a [`BoxRepository`]
    #[must_use]
    pub fn boxed(self) -> BoxRepository {
        Box::new(MapErr::new(self, RepositoryError::from_error))
    }
}

impl RepositoryTransaction for MemoryRepository {
    type Error = MemoryError;

    fn save(self: Box<Self>) -> BoxFuture<'static, Result<(), Self::Error>> {
        let Self { shared, data, .. } = *self;
        async move {
            *shared.lock().await = data;
            Ok(())
        }
        .boxed()
    }

    fn cancel(self: Box<Self>) -> BoxFuture<'static, Result<(), Self::Error>> {
        async move { Ok(()) }.boxed()
    }
}

impl RepositoryAccess for MemoryRepository {
    type Error = MemoryError;

    fn verification<'c>(
        &'c mut self,
    ) -> Box<dyn VerificationRepository<Error = Self::Error> + 'c> {
        Box::new(verification::MemoryVerificationRepository::new(
            &mut self.data,
            &self.faults,
        ))
    }

    fn user<'c>(&'c mut self) -> Box<dyn UserRepository<Error = Self::Error> + 'c> {
        Box::new(user::MemoryUserRepository::new(&mut self.data))
    }

    fn space<'c>(&'c mut self) -> Box<dyn SpaceRepository<Error = Self::Error> + 'c> {
        Box::new(space::MemorySpaceRepository::new(&mut self.data))
    }

    fn subscription<'c>(
        &'c mut self,
    ) -> Box<dyn SubscriptionRepository<Error = Self::Error> + 'c> {
        Box::new(billing::MemorySubscriptionRepository::new(&mut self.data))
    }

    fn payment_method<'c>(
        &'c mut self,
    ) -> Box<dyn PaymentMethodRepository<Error = Self::Error> + 'c> {
        Box::new(billing::MemoryPaymentMethodRepository::new(&mut self.data))
    }
}
