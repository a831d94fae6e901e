// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::collections::BTreeMap;

use axum::{
    Form, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use proize_axum_utils::{SessionUserId, record_error};
use proize_billing::{BillingError, CheckoutSessionRequest, CustomerRequest};
use proize_storage::{BoxClock, BoxRepositoryFactory, RepositoryAccess, RepositoryTransaction};
use serde::{Deserialize, Serialize};

use super::CheckoutSettings;
use crate::impl_from_error_for_route;

const PORTAL_PATH: &str = "/api/stripe/portal";
const DEFAULT_SUCCESS_PATH: &str = "/api/stripe/portal?session_id={CHECKOUT_SESSION_ID}";
const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Monthly,
    Yearly,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    period: Period,
    success_path: Option<String>,
    return_path: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("User with ID {0} not found")]
    UserNotFound(String),

    #[error("Space with owner ID {0} not found")]
    SpaceNotFound(String),

    #[error("Billing is not configured")]
    NotConfigured,

    #[error("Invalid redirect path {0:?}")]
    InvalidPath(String),

    #[error("Something went wrong while creating a checkout session")]
    MissingCheckoutUrl,
}

impl_from_error_for_route!(proize_storage::RepositoryError);
impl_from_error_for_route!(BillingError);

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        let sentry_event_id = record_error!(
            self,
            Self::Internal(_) | Self::NotConfigured | Self::MissingCheckoutUrl
        );
        let status = match &self {
            Self::UserNotFound(_) | Self::SpaceNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidPath(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) | Self::NotConfigured | Self::MissingCheckoutUrl => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let response = ErrorResponse {
            error: self.to_string(),
        };

        (status, sentry_event_id, Json(response)).into_response()
    }
}

#[tracing::instrument(
    name = "handler.stripe.checkout",
    skip_all,
    fields(user.id, checkout.period),
)]
pub async fn handler(
    clock: BoxClock,
    State(repository_factory): State<BoxRepositoryFactory>,
    State(settings): State<CheckoutSettings>,
    SessionUserId(user_id): SessionUserId,
    Form(form): Form<CheckoutForm>,
) -> Result<Redirect, RouteError> {
    let absolute = |path: &str| {
        settings
            .absolute(path)
            .ok_or_else(|| RouteError::InvalidPath(path.to_owned()))
    };

    let Some(user_id) = user_id else {
        let mut login = absolute(LOGIN_PATH)?;
        if let Some(return_path) = &form.return_path {
            login
                .query_pairs_mut()
                .append_pair("redirect", return_path);
        }
        return Ok(Redirect::to(login.as_str()));
    };
    let span = tracing::Span::current();
    span.record("user.id", user_id.as_str());
    span.record("checkout.period", tracing::field::debug(form.period));

    let backend = settings.backend.as_ref().ok_or(RouteError::NotConfigured)?;

    let mut repo = repository_factory.create().await?;

    let user = repo
        .user()
        .lookup(&user_id)
        .await?
        .ok_or_else(|| RouteError::UserNotFound(user_id.clone()))?;

    let space = repo
        .space()
        .find_first_owned_by(&user)
        .await?
        .ok_or_else(|| RouteError::SpaceNotFound(user_id.clone()))?;

    let (user, customer_id) = if let Some(customer_id) = user.customer_id.clone() {
        tracing::debug!(customer.id = %customer_id, "Reusing the billing customer");
        (user, customer_id)
    } else {
        let customer = backend
            .provider
            .create_customer(&CustomerRequest {
                email: user.email.clone(),
                name: user.name.clone(),
                user_id: user.id.clone(),
            })
            .await?;

        tracing::info!(customer.id = %customer.id, "Created a billing customer");
        let user = repo
            .user()
            .set_customer_id(user, customer.id.clone())
            .await?;
        (user, customer.id)
    };

    let active_subscription = repo.subscription().find_active_for_user(&user).await?;
    repo.save().await?;

    if active_subscription.is_some() {
        tracing::info!("User already has an active subscription");
        let portal = absolute(PORTAL_PATH)?;
        return Ok(Redirect::to(portal.as_str()));
    }

    let success_path = form
        .success_path
        .as_deref()
        .or(form.return_path.as_deref())
        .unwrap_or(DEFAULT_SUCCESS_PATH);
    let cancel_path = form.return_path.as_deref().unwrap_or("/");

    let price_id = match form.period {
        Period::Monthly => &backend.monthly_price_id,
        Period::Yearly => &backend.yearly_price_id,
    };

    let metadata = BTreeMap::from([
        ("userId".to_owned(), user.id.clone()),
        ("spaceId".to_owned(), space.id.clone()),
    ]);

    let session = backend
        .provider
        .create_checkout_session(&CheckoutSessionRequest {
            customer_id,
            price_id: price_id.clone(),
            success_url: absolute(success_path)?,
            cancel_url: absolute(cancel_path)?,
            metadata,
            expires_at: clock.now() + backend.expiry,
        })
        .await?;

    let url = session.url.ok_or(RouteError::MissingCheckoutUrl)?;
    tracing::info!(checkout.session.id = %session.id, "Created a checkout session");

    Ok(Redirect::to(url.as_str()))
}

#[cfg(test)]
mod tests {
    use axum::http::{Request, StatusCode, header::LOCATION};
    use proize_data_model::{SpaceMemberRole, User};
    use proize_storage::{Clock, RepositoryAccess, RepositoryTransaction};
    use serde_json::Value;

    use crate::test_utils::{RequestBuilderExt, ResponseExt, TestState, setup};

    /// Create a user owning a space
    async fn user_with_space(state: &TestState, customer_id: Option<&str>) -> User {
        let mut repo = state.repository().await;
        let mut rng = state.rng();
        let user = repo
            .user()
            .add(
                &mut rng,
                &state.clock,
                Some("Alice".to_owned()),
                "alice@example.com".to_owned(),
            )
            .await
            .unwrap();
        let user = match customer_id {
            Some(customer_id) => repo
                .user()
                .set_customer_id(user, customer_id.to_owned())
                .await
                .unwrap(),
            None => user,
        };
        let space = repo
            .space()
            .add(&mut rng, &state.clock, &user, "Personal".to_owned())
            .await
            .unwrap();
        repo.space()
            .add_member(&mut rng, &state.clock, &space, &user, SpaceMemberRole::Admin)
            .await
            .unwrap();
        repo.save().await.unwrap();
        user
    }

    fn checkout(user_id: Option<&str>, form: &[(&str, &str)]) -> Request<String> {
        let mut builder = Request::post("/api/stripe/checkout");
        if let Some(user_id) = user_id {
            builder = builder.header("x-proize-user-id", user_id);
        }
        builder.form(form)
    }

    #[tokio::test]
    async fn test_anonymous_redirects_to_login() {
        setup();
        let state = TestState::new();

        let response = state.request(checkout(None, &[])).await;
        response.assert_status(StatusCode::SEE_OTHER);
        response.assert_header_value(LOCATION, "https://app.example.com/login");

        let response = state
            .request(checkout(None, &[("return_path", "/settings/billing")]))
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        response.assert_header_value(
            LOCATION,
            "https://app.example.com/login?redirect=%2Fsettings%2Fbilling",
        );

        assert!(state.billing.customers().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_user_or_space() {
        setup();
        let state = TestState::new();

        let response = state.request(checkout(Some("nobody"), &[])).await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["error"], "User with ID nobody not found");

        let mut repo = state.repository().await;
        let user = repo
            .user()
            .add(
                &mut state.rng(),
                &state.clock,
                None,
                "bob@example.com".to_owned(),
            )
            .await
            .unwrap();
        repo.save().await.unwrap();

        let response = state.request(checkout(Some(&user.id), &[])).await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(
            body["error"],
            format!("Space with owner ID {} not found", user.id)
        );
        assert!(state.billing.customers().await.is_empty());
    }

    #[tokio::test]
    async fn test_checkout() {
        setup();
        let state = TestState::new();
        let user = user_with_space(&state, None).await;

        let response = state
            .request(checkout(Some(&user.id), &[("period", "yearly")]))
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        response.assert_header_value(LOCATION, "https://checkout.stripe.test/c/pay/cs_mock1");

        // The customer was created and saved on the user
        let customers = state.billing.customers().await;
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].email, "alice@example.com");
        assert_eq!(customers[0].name.as_deref(), Some("Alice"));
        let mut repo = state.repository().await;
        let saved = repo.user().lookup(&user.id).await.unwrap().unwrap();
        assert_eq!(saved.customer_id.as_deref(), Some("cus_mock1"));
        let space = repo
            .space()
            .find_first_owned_by(&saved)
            .await
            .unwrap()
            .unwrap();
        repo.cancel().await.unwrap();

        let sessions = state.billing.checkout_sessions().await;
        assert_eq!(sessions.len(), 1);
        let session = &sessions[0];
        assert_eq!(session.customer_id, "cus_mock1");
        assert_eq!(session.price_id, "price_yearly");
        assert_eq!(
            session.success_url.as_str(),
            "https://app.example.com/api/stripe/portal?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(session.cancel_url.as_str(), "https://app.example.com/");
        assert_eq!(session.metadata["userId"], user.id);
        assert_eq!(session.metadata["spaceId"], space.id);
        assert_eq!(
            session.expires_at,
            state.clock.now() + chrono::Duration::minutes(30)
        );

        // A second checkout reuses the customer
        let response = state
            .request(checkout(
                Some(&user.id),
                &[
                    ("success_path", "/welcome"),
                    ("return_path", "/settings/billing"),
                ],
            ))
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(state.billing.customers().await.len(), 1);

        let sessions = state.billing.checkout_sessions().await;
        assert_eq!(sessions.len(), 2);
        let session = &sessions[1];
        assert_eq!(session.customer_id, "cus_mock1");
        assert_eq!(session.price_id, "price_monthly");
        assert_eq!(session.success_url.as_str(), "https://app.example.com/welcome");
        assert_eq!(
            session.cancel_url.as_str(),
            "https://app.example.com/settings/billing"
        );
    }

    #[tokio::test]
    async fn test_return_path_is_the_success_fallback() {
        setup();
        let state = TestState::new();
        let user = user_with_space(&state, Some("cus_existing")).await;

        let response = state
            .request(checkout(Some(&user.id), &[("return_path", "/settings")]))
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert!(state.billing.customers().await.is_empty());

        let sessions = state.billing.checkout_sessions().await;
        assert_eq!(sessions[0].customer_id, "cus_existing");
        assert_eq!(sessions[0].success_url.as_str(), "https://app.example.com/settings");
        assert_eq!(sessions[0].cancel_url.as_str(), "https://app.example.com/settings");
    }

    #[tokio::test]
    async fn test_subscribed_user_goes_to_portal() {
        setup();
        let state = TestState::new();
        let user = user_with_space(&state, Some("cus_existing")).await;

        let mut repo = state.repository().await;
        let space = repo
            .space()
            .find_first_owned_by(&user)
            .await
            .unwrap()
            .unwrap();
        repo.subscription()
            .add(&mut state.rng(), &state.clock, &user, &space, &state.plan)
            .await
            .unwrap();
        repo.save().await.unwrap();

        let response = state.request(checkout(Some(&user.id), &[])).await;
        response.assert_status(StatusCode::SEE_OTHER);
        response.assert_header_value(LOCATION, "https://app.example.com/api/stripe/portal");
        assert!(state.billing.checkout_sessions().await.is_empty());
    }

    #[tokio::test]
    async fn test_provider_failures() {
        setup();
        let state = TestState::new();
        let user = user_with_space(&state, Some("cus_existing")).await;

        state.billing.set_without_url(true);
        let response = state.request(checkout(Some(&user.id), &[])).await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json();
        assert_eq!(
            body["error"],
            "Something went wrong while creating a checkout session"
        );

        state.billing.set_without_url(false);
        state.billing.set_failing(true);
        let response = state.request(checkout(Some(&user.id), &[])).await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json();
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_billing_disabled() {
        setup();
        let mut state = TestState::new();
        state.checkout = crate::CheckoutSettings::disabled("https://app.example.com/".parse().unwrap());
        let user = user_with_space(&state, None).await;

        let response = state.request(checkout(Some(&user.id), &[])).await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json();
        assert_eq!(body["error"], "Billing is not configured");
    }

    #[tokio::test]
    async fn test_foreign_redirect_rejected() {
        setup();
        let state = TestState::new();
        let user = user_with_space(&state, Some("cus_existing")).await;

        let response = state
            .request(checkout(
                Some(&user.id),
                &[("success_path", "https://evil.example.com/")],
            ))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(state.billing.checkout_sessions().await.is_empty());
    }
}
