// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

#![deny(clippy::future_not_send)]
#![allow(clippy::module_name_repetitions)]

use std::convert::Infallible;

use axum::{
    Router,
    extract::{FromRef, FromRequestParts},
    routing::{get, post},
};
use proize_axum_utils::UserIdHeader;
use proize_storage::{BoxClock, BoxRepositoryFactory, BoxRng, billing::SubscriptionPlan};
use sqlx::PgPool;

mod admin;
mod health;
mod stripe;
#[cfg(test)]
mod test_utils;

/// Implement `From<E>` for `RouteError`, for "internal server error" kind of
/// errors.
#[macro_export]
macro_rules! impl_from_error_for_route {
    ($route_error:ty : $error:ty) => {
        impl From<$error> for $route_error {
            fn from(e: $error) -> Self {
                Self::Internal(Box::new(e))
            }
        }
    };
    ($error:ty) => {
        impl_from_error_for_route!(self::RouteError: $error);
    };
}

pub use self::{admin::AdminSecret, stripe::CheckoutSettings};

pub fn healthcheck_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    PgPool: FromRef<S>,
{
    Router::new().route("/health", get(self::health::get))
}

pub fn admin_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    AdminSecret: FromRef<S>,
    BoxRepositoryFactory: FromRef<S>,
    SubscriptionPlan: FromRef<S>,
    BoxClock: FromRequestParts<S, Rejection = Infallible>,
    BoxRng: FromRequestParts<S, Rejection = Infallible>,
{
    Router::new()
        .route(
            "/api/proize/clean-verifications",
            get(self::admin::clean_verifications::handler)
                .post(self::admin::clean_verifications::handler),
        )
        .route(
            "/api/proize/proize-all-users",
            post(self::admin::grant_pro::handler),
        )
}

pub fn billing_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    BoxRepositoryFactory: FromRef<S>,
    CheckoutSettings: FromRef<S>,
    UserIdHeader: FromRef<S>,
    BoxClock: FromRequestParts<S, Rejection = Infallible>,
{
    Router::new().route(
        "/api/stripe/checkout",
        post(self::stripe::checkout::handler),
    )
}
