// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{
    convert::Infallible,
    sync::{Arc, Mutex},
};

use axum::{
    Router,
    body::{Bytes, HttpBody},
    extract::{FromRef, FromRequestParts},
    http::{
        HeaderName, Request, Response, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
};
use chrono::Duration;
use proize_axum_utils::UserIdHeader;
use proize_billing::MockBillingProvider;
use proize_storage::{
    BoxClock, BoxRepository, BoxRepositoryFactory, BoxRng, RepositoryFactory,
    billing::SubscriptionPlan, clock::MockClock, memory::MemoryRepositoryFactory,
};
use proize_data_model::SubscriptionInterval;
use rand::SeedableRng;
use rand_chacha::ChaChaRng;
use serde::{Serialize, de::DeserializeOwned};
use tower::{Service, ServiceExt};

use crate::{AdminSecret, CheckoutSettings};

pub(crate) const ADMIN_SECRET: &str = "admin-secret";

pub(crate) fn setup() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
}

#[derive(Clone)]
pub(crate) struct TestState {
    pub repository_factory: MemoryRepositoryFactory,
    pub clock: Arc<MockClock>,
    pub rng: Arc<Mutex<ChaChaRng>>,
    pub admin_secret: AdminSecret,
    pub billing: Arc<MockBillingProvider>,
    pub checkout: CheckoutSettings,
    pub plan: SubscriptionPlan,
    pub user_id_header: UserIdHeader,
}

impl TestState {
    /// Create a new test state, backed by an empty in-memory storage and a
    /// mock billing provider
    pub fn new() -> Self {
        let billing = Arc::new(MockBillingProvider::new());
        let checkout = CheckoutSettings::new(
            "https://app.example.com/".parse().unwrap(),
            billing.clone(),
            "price_monthly".to_owned(),
            "price_yearly".to_owned(),
            Duration::minutes(30),
        );

        let plan = SubscriptionPlan {
            price_id: "price_lifetime_premium".to_owned(),
            amount: 5600,
            currency: "EUR".to_owned(),
            quantity: 999,
            interval: SubscriptionInterval::Year,
            duration_years: 99,
        };

        Self {
            repository_factory: MemoryRepositoryFactory::new(),
            clock: Arc::new(MockClock::default()),
            rng: Arc::new(Mutex::new(ChaChaRng::seed_from_u64(42))),
            admin_secret: AdminSecret::new(Some(ADMIN_SECRET)),
            billing,
            checkout,
            plan,
            user_id_header: UserIdHeader::new(HeaderName::from_static("x-proize-user-id")),
        }
    }

    /// Send a request to the admin and billing routers
    pub async fn request<B>(&self, request: Request<B>) -> Response<String>
    where
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: std::error::Error + Send + Sync,
    {
        let app = crate::admin_router()
            .merge(crate::billing_router())
            .with_state(self.clone());

        send(app, request).await
    }

    /// Get a repository over the shared in-memory storage
    pub async fn repository(&self) -> BoxRepository {
        self.repository_factory.create().await.unwrap()
    }

    /// Get a fresh RNG, seeded from the shared one
    pub fn rng(&self) -> ChaChaRng {
        let mut parent_rng = self.rng.lock().expect("Failed to lock RNG");
        ChaChaRng::from_rng(&mut *parent_rng).expect("Failed to seed RNG")
    }
}

/// Drive a router with a single request, collecting the response body
pub(crate) async fn send<B>(app: Router, request: Request<B>) -> Response<String>
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: std::error::Error + Send + Sync,
{
    let Ok(mut service) = app.into_service().ready_oneshot().await;
    let Ok(response) = service.call(request).await;

    let (parts, body) = response.into_parts();

    let body = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read response body");
    let body = std::str::from_utf8(&body)
        .expect("Response body is not valid UTF-8")
        .to_owned();

    Response::from_parts(parts, body)
}

impl FromRef<TestState> for BoxRepositoryFactory {
    fn from_ref(input: &TestState) -> Self {
        Box::new(input.repository_factory.clone())
    }
}

impl FromRef<TestState> for AdminSecret {
    fn from_ref(input: &TestState) -> Self {
        input.admin_secret.clone()
    }
}

impl FromRef<TestState> for CheckoutSettings {
    fn from_ref(input: &TestState) -> Self {
        input.checkout.clone()
    }
}

impl FromRef<TestState> for SubscriptionPlan {
    fn from_ref(input: &TestState) -> Self {
        input.plan.clone()
    }
}

impl FromRef<TestState> for UserIdHeader {
    fn from_ref(input: &TestState) -> Self {
        input.user_id_header.clone()
    }
}

impl FromRequestParts<TestState> for BoxClock {
    type Rejection = Infallible;

    async fn from_request_parts(
        _parts: &mut axum::http::request::Parts,
        state: &TestState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Box::new(state.clock.clone()))
    }
}

impl FromRequestParts<TestState> for BoxRng {
    type Rejection = Infallible;

    async fn from_request_parts(
        _parts: &mut axum::http::request::Parts,
        state: &TestState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Box::new(state.rng()))
    }
}

pub(crate) trait RequestBuilderExt {
    /// Builds the request with the given JSON value as body.
    fn json<T: Serialize>(self, body: T) -> Request<String>;

    /// Builds the request with the given form value as body.
    fn form<T: Serialize>(self, body: T) -> Request<String>;

    /// Sets the request Authorization header to the given bearer token.
    fn bearer(self, token: &str) -> Self;

    /// Builds the request with an empty body.
    fn empty(self) -> Request<String>;
}

impl RequestBuilderExt for axum::http::request::Builder {
    fn json<T: Serialize>(self, body: T) -> Request<String> {
        self.header(CONTENT_TYPE, "application/json")
            .body(serde_json::to_string(&body).unwrap())
            .unwrap()
    }

    fn form<T: Serialize>(self, body: T) -> Request<String> {
        self.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(serde_urlencoded::to_string(&body).unwrap())
            .unwrap()
    }

    fn bearer(self, token: &str) -> Self {
        self.header(AUTHORIZATION, format!("Bearer {token}"))
    }

    fn empty(self) -> Request<String> {
        self.body(String::new()).unwrap()
    }
}

pub(crate) trait ResponseExt {
    /// Asserts that the response has the given status code.
    ///
    /// # Panics
    ///
    /// Panics if the response has a different status code.
    fn assert_status(&self, status: StatusCode);

    /// Asserts that the response has the given header value.
    ///
    /// # Panics
    ///
    /// Panics if the response does not have the given header or if the header
    /// value does not match.
    fn assert_header_value(&self, header: HeaderName, value: &str);

    /// Get the response body as JSON.
    ///
    /// # Panics
    ///
    /// Panics if the response is missing the `Content-Type: application/json`,
    /// or if the body is not valid JSON.
    fn json<T: DeserializeOwned>(&self) -> T;
}

impl ResponseExt for Response<String> {
    #[track_caller]
    fn assert_status(&self, status: StatusCode) {
        assert_eq!(
            self.status(),
            status,
            "HTTP status code mismatch: got {}, expected {}. Body: {}",
            self.status(),
            status,
            self.body()
        );
    }

    #[track_caller]
    fn assert_header_value(&self, header: HeaderName, value: &str) {
        let actual_value = self
            .headers()
            .get(&header)
            .unwrap_or_else(|| panic!("Missing header {header}"));

        assert_eq!(
            actual_value,
            value,
            "Header mismatch: got {:?}, expected {:?}",
            self.headers().get(header),
            value
        );
    }

    #[track_caller]
    fn json<T: DeserializeOwned>(&self) -> T {
        self.assert_header_value(CONTENT_TYPE, "application/json");
        serde_json::from_str(self.body()).expect("JSON deserialization failed")
    }
}
