// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use proize_axum_utils::record_error;
use proize_storage::BoxRepositoryFactory;
use proize_tasks::{ReconcileError, ReconciliationReport, reconcile};
use serde::Serialize;

use super::{
    AdminAuthorization,
    flags::{self, FlagsQuery},
};
use crate::impl_from_error_for_route;

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error(
        "To perform the deletion, pass confirm=true or include {{ confirm: true }} in POST body."
    )]
    ConfirmationRequired,
}

impl_from_error_for_route!(proize_storage::RepositoryError);

impl From<ReconcileError> for RouteError {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::ConfirmationRequired => Self::ConfirmationRequired,
            ReconcileError::Storage(e) => Self::Internal(Box::new(e)),
        }
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum ErrorResponse {
    Message { ok: bool, message: String },
    Error { ok: bool, error: String },
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        let sentry_event_id = record_error!(self, Self::Internal(_));
        let (status, response) = match &self {
            Self::ConfirmationRequired => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::Message {
                    ok: false,
                    message: self.to_string(),
                },
            ),
            Self::Internal(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::Error {
                    ok: false,
                    error: e.to_string(),
                },
            ),
        };

        (status, sentry_event_id, Json(response)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct CleanResponse {
    ok: bool,

    #[serde(flatten)]
    report: ReconciliationReport,
}

#[tracing::instrument(name = "handler.admin.clean_verifications", skip_all)]
pub async fn handler(
    _: AdminAuthorization,
    State(repository_factory): State<BoxRepositoryFactory>,
    Query(query): Query<FlagsQuery>,
    body: Bytes,
) -> Result<Json<CleanResponse>, RouteError> {
    let options = flags::parse(&query, &body);
    tracing::info!(
        dry_run = options.dry_run,
        confirm = options.confirm,
        "Reconciling verification tokens"
    );

    let repo = repository_factory.create().await?;
    let report = reconcile(repo, options).await?;

    Ok(Json(CleanResponse { ok: true, report }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Request, StatusCode};
    use chrono::Duration;
    use proize_storage::{Clock, RepositoryAccess, RepositoryTransaction};
    use serde_json::{Value, json};

    use crate::test_utils::{ADMIN_SECRET, RequestBuilderExt, ResponseExt, TestState, setup};

    /// Seed the store with the tokens of the worked example: two tokens
    /// sharing `tok-x` and an email verification for an unknown user
    async fn seed(state: &TestState) -> (String, String, String) {
        let mut repo = state.repository().await;
        let mut rng = state.rng();
        let expires_at = state.clock.now() + Duration::hours(1);

        let a = repo
            .verification()
            .add(&mut rng, &state.clock, "tok-x".to_owned(), "1".to_owned(), expires_at)
            .await
            .unwrap();
        state.clock.advance(Duration::minutes(1));
        let b = repo
            .verification()
            .add(&mut rng, &state.clock, "tok-x".to_owned(), "2".to_owned(), expires_at)
            .await
            .unwrap();
        state.clock.advance(Duration::minutes(1));
        let c = repo
            .verification()
            .add(
                &mut rng,
                &state.clock,
                "email-verification-user@example.com".to_owned(),
                "3".to_owned(),
                expires_at,
            )
            .await
            .unwrap();
        repo.save().await.unwrap();

        (a.id, b.id, c.id)
    }

    #[tokio::test]
    async fn test_unauthorized() {
        setup();
        let state = TestState::new();
        seed(&state).await;
        // Storage is never reached
        state.repository_factory.set_unavailable(true);

        let request = Request::post("/api/proize/clean-verifications?confirm=true").empty();
        let response = state.request(request).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], "Missing authorization header");

        let request = Request::post("/api/proize/clean-verifications?confirm=true")
            .bearer("not-the-secret")
            .empty();
        let response = state.request(request).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], "Unauthorized");

        let request = Request::get("/api/proize/clean-verifications")
            .header("Authorization", "Basic Zm9vOmJhcg==")
            .empty();
        let response = state.request(request).await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        state.repository_factory.set_unavailable(false);
        assert_eq!(state.repository_factory.verification_count().await, 3);
    }

    #[tokio::test]
    async fn test_no_secret_configured() {
        setup();
        let mut state = TestState::new();
        state.admin_secret = crate::AdminSecret::new(None);

        let request = Request::get("/api/proize/clean-verifications?dryRun=true")
            .bearer(ADMIN_SECRET)
            .empty();
        let response = state.request(request).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["ok"], false);
    }

    #[tokio::test]
    async fn test_dry_run() {
        setup();
        let state = TestState::new();
        let (a, b, c) = seed(&state).await;

        let request = Request::get("/api/proize/clean-verifications?dryRun=true")
            .bearer(ADMIN_SECRET)
            .empty();
        let response = state.request(request).await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(
            body,
            json!({
                "ok": true,
                "dryRun": true,
                "duplicatesCount": 1,
                "duplicates": [{ "identifier": "tok-x", "keep": b, "delete": [a] }],
                "orphanedCount": 1,
                "orphanedRows": [{
                    "id": c,
                    "identifier": "email-verification-user@example.com",
                    "email": "user@example.com",
                }],
            })
        );

        assert_eq!(state.repository_factory.verification_count().await, 3);
    }

    #[tokio::test]
    async fn test_confirmation_required() {
        setup();
        let state = TestState::new();
        seed(&state).await;

        let request = Request::post("/api/proize/clean-verifications")
            .bearer(ADMIN_SECRET)
            .empty();
        let response = state.request(request).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["ok"], false);
        assert_eq!(
            body["message"],
            "To perform the deletion, pass confirm=true or include { confirm: true } in POST body."
        );

        // Only the exact "true" value confirms
        let request = Request::post("/api/proize/clean-verifications?confirm=1")
            .bearer(ADMIN_SECRET)
            .json(json!({ "confirm": "yes" }));
        let response = state.request(request).await;
        response.assert_status(StatusCode::BAD_REQUEST);

        assert_eq!(state.repository_factory.verification_count().await, 3);
    }

    #[tokio::test]
    async fn test_array_body_does_not_confirm() {
        setup();
        let state = TestState::new();
        seed(&state).await;

        let request = Request::post("/api/proize/clean-verifications")
            .bearer(ADMIN_SECRET)
            .json(json!([false, true]));
        let response = state.request(request).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["ok"], false);

        assert_eq!(state.repository_factory.verification_count().await, 3);
    }

    #[tokio::test]
    async fn test_confirmed_run() {
        setup();
        let state = TestState::new();
        let (a, b, c) = seed(&state).await;

        let request = Request::post("/api/proize/clean-verifications")
            .bearer(ADMIN_SECRET)
            .json(json!({ "confirm": true }));
        let response = state.request(request).await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["ok"], true);
        assert_eq!(body["dryRun"], false);
        assert_eq!(body["duplicates"][0]["delete"], json!([a]));
        assert_eq!(body["orphanedRows"][0]["id"], json!(c));
        assert_eq!(
            body["deleted"],
            json!({ "deletedDupesCount": 1, "deletedOrphansCount": 1 })
        );

        let mut repo = state.repository().await;
        assert_eq!(repo.verification().count().await.unwrap(), 1);
        assert!(repo.verification().lookup(&b).await.unwrap().is_some());

        // A second run has nothing left to do
        let request = Request::post("/api/proize/clean-verifications?confirm=true")
            .bearer(ADMIN_SECRET)
            .empty();
        let response = state.request(request).await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["duplicatesCount"], 0);
        assert_eq!(body["orphanedCount"], 0);
        assert_eq!(
            body["deleted"],
            json!({ "deletedDupesCount": 0, "deletedOrphansCount": 0 })
        );
    }

    #[tokio::test]
    async fn test_storage_failure() {
        setup();
        let state = TestState::new();
        seed(&state).await;

        state.repository_factory.fail_verification_deletes_after(1);
        let request = Request::post("/api/proize/clean-verifications?confirm=true")
            .bearer(ADMIN_SECRET)
            .empty();
        let response = state.request(request).await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json();
        assert_eq!(body["ok"], false);
        assert!(body["error"].is_string());

        // Nothing was deleted
        assert_eq!(state.repository_factory.verification_count().await, 3);

        state.repository_factory.set_unavailable(true);
        let request = Request::get("/api/proize/clean-verifications?dryRun=true")
            .bearer(ADMIN_SECRET)
            .empty();
        let response = state.request(request).await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json();
        assert_eq!(body["ok"], false);
    }
}
