// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::convert::Infallible;

use axum::extract::{FromRef, FromRequestParts};
use proize_axum_utils::UserIdHeader;
use proize_handlers::{AdminSecret, CheckoutSettings};
use proize_storage::{BoxClock, BoxRepositoryFactory, BoxRng, SystemClock, billing::SubscriptionPlan};
use proize_storage_pg::PgRepositoryFactory;
use rand::SeedableRng;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub repository_factory: PgRepositoryFactory,
    pub admin_secret: AdminSecret,
    pub checkout: CheckoutSettings,
    pub plan: SubscriptionPlan,
    pub user_id_header: UserIdHeader,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(input: &AppState) -> Self {
        input.repository_factory.pool()
    }
}

impl FromRef<AppState> for BoxRepositoryFactory {
    fn from_ref(input: &AppState) -> Self {
        input.repository_factory.clone().boxed()
    }
}

impl FromRef<AppState> for AdminSecret {
    fn from_ref(input: &AppState) -> Self {
        input.admin_secret.clone()
    }
}

impl FromRef<AppState> for CheckoutSettings {
    fn from_ref(input: &AppState) -> Self {
        input.checkout.clone()
    }
}

impl FromRef<AppState> for SubscriptionPlan {
    fn from_ref(input: &AppState) -> Self {
        input.plan.clone()
    }
}

impl FromRef<AppState> for UserIdHeader {
    fn from_ref(input: &AppState) -> Self {
        input.user_id_header.clone()
    }
}

impl FromRequestParts<AppState> for BoxClock {
    type Rejection = Infallible;

    async fn from_request_parts(
        _parts: &mut axum::http::request::Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let clock = SystemClock::default();
        Ok(Box::new(clock))
    }
}

impl FromRequestParts<AppState> for BoxRng {
    type Rejection = Infallible;

    async fn from_request_parts(
        _parts: &mut axum::http::request::Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let rng = rand_chacha::ChaChaRng::from_entropy();
        Ok(Box::new(rng))
    }
}
