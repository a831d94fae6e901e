// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! An implementation of the storage repositories on a PostgreSQL database
//!
//! Every repository works on a single connection, and the [`PgRepository`]
//! wraps a transaction: nothing is persisted until it is saved.
//!
//! Queries are plain SQL strings bound at runtime, and their rows are mapped
//! through [`sqlx::FromRow`] structs into the types of [`proize_data_model`].
//! Conversions which can fail, like parsing an enum stored as text, report a
//! [`DatabaseInconsistencyError`].
//!
//! The schema is defined by the migrations in the `migrations` directory,
//! embedded in the [`MIGRATOR`].

#![deny(clippy::future_not_send, missing_docs)]
#![allow(clippy::module_name_repetitions)]

use sqlx::migrate::Migrator;

pub mod billing;
mod errors;
pub(crate) mod repository;
pub mod space;
pub(crate) mod tracing;
pub mod user;
pub mod verification;


pub use self::{
    errors::{DatabaseError, DatabaseInconsistencyError},
    repository::{PgRepository, PgRepositoryFactory},
    tracing::ExecuteExt,
};

/// Embedded migrations, applied by `proize database migrate`
pub static MIGRATOR: Migrator = sqlx::migrate!();
