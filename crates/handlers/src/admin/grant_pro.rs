// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use proize_axum_utils::record_error;
use proize_storage::{BoxClock, BoxRepositoryFactory, BoxRng, billing::SubscriptionPlan};
use proize_tasks::{GrantError, GrantSummary, grant_pro_to_all_users};
use serde::Serialize;

use super::AdminAuthorization;
use crate::impl_from_error_for_route;

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl_from_error_for_route!(GrantError);

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        let sentry_event_id = record_error!(self);
        let response = ErrorResponse {
            success: false,
            error: self.to_string(),
        };

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            sentry_event_id,
            Json(response),
        )
            .into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct GrantResponse {
    success: bool,
    summary: GrantSummary,
}

#[tracing::instrument(name = "handler.admin.grant_pro", skip_all)]
pub async fn handler(
    _: AdminAuthorization,
    State(repository_factory): State<BoxRepositoryFactory>,
    State(plan): State<SubscriptionPlan>,
    clock: BoxClock,
    mut rng: BoxRng,
) -> Result<Json<GrantResponse>, RouteError> {
    let summary = grant_pro_to_all_users(&*repository_factory, &clock, &mut rng, &plan).await?;

    tracing::info!(
        users_processed = summary.users_processed,
        subscriptions_created = summary.subscriptions_created,
        payment_methods_created = summary.payment_methods_created,
        "Granted the pro entitlement to all users"
    );

    Ok(Json(GrantResponse {
        success: true,
        summary,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Request, StatusCode};
    use proize_data_model::SpaceTier;
    use proize_storage::{RepositoryAccess, RepositoryTransaction};
    use serde_json::{Value, json};

    use crate::test_utils::{ADMIN_SECRET, RequestBuilderExt, ResponseExt, TestState, setup};

    #[tokio::test]
    async fn test_unauthorized() {
        setup();
        let state = TestState::new();

        let request = Request::post("/api/proize/proize-all-users").empty();
        let response = state.request(request).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["ok"], false);
    }

    #[tokio::test]
    async fn test_grant() {
        setup();
        let state = TestState::new();

        let mut repo = state.repository().await;
        let mut rng = state.rng();
        let alice = repo
            .user()
            .add(
                &mut rng,
                &state.clock,
                Some("Alice".to_owned()),
                "alice@example.com".to_owned(),
            )
            .await
            .unwrap();
        repo.user()
            .add(&mut rng, &state.clock, None, "bob@example.com".to_owned())
            .await
            .unwrap();
        repo.save().await.unwrap();

        let request = Request::post("/api/proize/proize-all-users")
            .bearer(ADMIN_SECRET)
            .empty();
        let response = state.request(request).await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(
            body,
            json!({
                "success": true,
                "summary": {
                    "usersProcessed": 2,
                    "subscriptionsCreated": 2,
                    "subscriptionsSkipped": 0,
                    "paymentMethodsCreated": 2,
                    "paymentMethodsSkipped": 0,
                },
            })
        );

        let mut repo = state.repository().await;
        let space = repo
            .space()
            .find_first_owned_by(&alice)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(space.tier, SpaceTier::Pro);
        let subscription = repo
            .subscription()
            .find_for_space(&space)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(subscription.price_id, state.plan.price_id);
        let methods = repo.payment_method().list_for_user(&alice).await.unwrap();
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].card().unwrap().name, "Alice");
        repo.cancel().await.unwrap();

        // Running again skips everyone
        let request = Request::post("/api/proize/proize-all-users")
            .bearer(ADMIN_SECRET)
            .empty();
        let response = state.request(request).await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["summary"]["usersProcessed"], 2);
        assert_eq!(body["summary"]["subscriptionsCreated"], 0);
        assert_eq!(body["summary"]["subscriptionsSkipped"], 2);
        assert_eq!(body["summary"]["paymentMethodsCreated"], 0);
    }

    #[tokio::test]
    async fn test_storage_failure() {
        setup();
        let state = TestState::new();
        state.repository_factory.set_unavailable(true);

        let request = Request::post("/api/proize/proize-all-users")
            .bearer(ADMIN_SECRET)
            .empty();
        let response = state.request(request).await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }
}
