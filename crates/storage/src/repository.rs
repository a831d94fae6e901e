// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use async_trait::async_trait;
use futures_util::{FutureExt, TryFutureExt, future::BoxFuture};
use thiserror::Error;

use crate::{
    MapErr,
    billing::{PaymentMethodRepository, SubscriptionRepository},
    space::SpaceRepository,
    user::UserRepository,
    verification::VerificationRepository,
};

/// A [`Repository`] helps interacting with the underlying storage backend.
pub trait Repository<E>:
    RepositoryAccess<Error = E> + RepositoryTransaction<Error = E> + Send
where
    E: std::error::Error + Send + Sync + 'static,
{
}

impl<E, R> Repository<E> for R
where
    R: RepositoryAccess<Error = E> + RepositoryTransaction<Error = E> + Send,
    E: std::error::Error + Send + Sync + 'static,
{
}

/// A type-erased [`Repository`]
pub type BoxRepository = Box<dyn Repository<RepositoryError> + Send + Sync + 'static>;

/// A type-erased error that can be returned by a repository operation
#[derive(Debug, Error)]
#[error(transparent)]
pub struct RepositoryError {
    source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl RepositoryError {
    /// Construct a [`RepositoryError`] from any error kind
    pub fn from_error<E>(value: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            source: Box::new(value),
        }
    }
}

/// A factory of [`BoxRepository`], each one wrapping a fresh unit of work
#[async_trait]
pub trait RepositoryFactory {
    /// Create a new [`BoxRepository`]
    ///
    /// # Errors
    ///
    /// Returns a [`RepositoryError`] if the storage backend is unavailable
    async fn create(&self) -> Result<BoxRepository, RepositoryError>;
}

/// A type-erased [`RepositoryFactory`]
pub type BoxRepositoryFactory = Box<dyn RepositoryFactory + Send + Sync + 'static>;

/// A [`RepositoryTransaction`] can be saved or cancelled, after a series
/// of operations.
pub trait RepositoryTransaction {
    /// The error type used by the [`Self::save`] and [`Self::cancel`] functions
    type Error;

    /// Commit the transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage backend failed to commit the
    /// transaction.
    fn save(self: Box<Self>) -> BoxFuture<'static, Result<(), Self::Error>>;

    /// Rollback the transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage backend failed to rollback
    /// the transaction.
    fn cancel(self: Box<Self>) -> BoxFuture<'static, Result<(), Self::Error>>;
}

/// Access the various repositories the backend implements.
///
/// All the methods return a boxed trait object, which can be used to access a
/// particular repository. The lifetime of the returned object is bound to the
/// lifetime of the whole repository, so that only one mutable reference to the
/// repository is used at a time.
///
/// When adding a new repository, you should add a new method to this trait, and
/// update the implementations for [`MapErr`] and [`Box<R>`] below.
pub trait RepositoryAccess: Send {
    /// The backend-specific error type used by each repository.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Get a [`VerificationRepository`]
    fn verification<'c>(
        &'c mut self,
    ) -> Box<dyn VerificationRepository<Error = Self::Error> + 'c>;

    /// Get an [`UserRepository`]
    fn user<'c>(&'c mut self) -> Box<dyn UserRepository<Error = Self::Error> + 'c>;

    /// Get a [`SpaceRepository`]
    fn space<'c>(&'c mut self) -> Box<dyn SpaceRepository<Error = Self::Error> + 'c>;

    /// Get a [`SubscriptionRepository`]
    fn subscription<'c>(
        &'c mut self,
    ) -> Box<dyn SubscriptionRepository<Error = Self::Error> + 'c>;

    /// Get a [`PaymentMethodRepository`]
    fn payment_method<'c>(
        &'c mut self,
    ) -> Box<dyn PaymentMethodRepository<Error = Self::Error> + 'c>;
}

impl<R, F, E> RepositoryTransaction for MapErr<R, F>
where
    R: RepositoryTransaction,
    R::Error: 'static,
    F: FnMut(R::Error) -> E + Send + Sync + 'static,
    E: std::error::Error,
{
    type Error = E;

    fn save(self: Box<Self>) -> BoxFuture<'static, Result<(), Self::Error>> {
        Box::new(self.inner).save().map_err(self.mapper).boxed()
    }

    fn cancel(self: Box<Self>) -> BoxFuture<'static, Result<(), Self::Error>> {
        Box::new(self.inner).cancel().map_err(self.mapper).boxed()
    }
}

impl<R, F, E> RepositoryAccess for MapErr<R, F>
where
    R: RepositoryAccess,
    R::Error: 'static,
    F: FnMut(R::Error) -> E + Send + Sync + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    type Error = E;

    fn verification<'c>(
        &'c mut self,
    ) -> Box<dyn VerificationRepository<Error = Self::Error> + 'c> {
        Box::new(MapErr::new(self.inner.verification(), &mut self.mapper))
    }

    fn user<'c>(&'c mut self) -> Box<dyn UserRepository<Error = Self::Error> + 'c> {
        Box::new(MapErr::new(self.inner.user(), &mut self.mapper))
    }

    fn space<'c>(&'c mut self) -> Box<dyn SpaceRepository<Error = Self::Error> + 'c> {
        Box::new(MapErr::new(self.inner.space(), &mut self.mapper))
    }

    fn subscription<'c>(
        &'c mut self,
    ) -> Box<dyn SubscriptionRepository<Error = Self::Error> + 'c> {
        Box::new(MapErr::new(self.inner.subscription(), &mut self.mapper))
    }

    fn payment_method<'c>(
        &'c mut self,
    ) -> Box<dyn PaymentMethodRepository<Error = Self::Error> + 'c> {
        Box::new(MapErr::new(self.inner.payment_method(), &mut self.mapper))
    }
}

impl<R: RepositoryAccess + ?Sized> RepositoryAccess for Box<R> {
    type Error = R::Error;

    fn verification<'c>(
        &'c mut self,
    ) -> Box<dyn VerificationRepository<Error = Self::Error> + 'c> {
        (**self).verification()
    }

    fn user<'c>(&'c mut self) -> Box<dyn UserRepository<Error = Self::Error> + 'c> {
        (**self).user()
    }

    fn space<'c>(&'c mut self) -> Box<dyn SpaceRepository<Error = Self::Error> + 'c> {
        (**self).space()
    }

    fn subscription<'c>(
        &'c mut self,
    ) -> Box<dyn SubscriptionRepository<Error = Self::Error> + 'c> {
        (**self).subscription()
    }

    fn payment_method<'c>(
        &'c mut self,
    ) -> Box<dyn PaymentMethodRepository<Error = Self::Error> + 'c> {
        (**self).payment_method()
    }
}
