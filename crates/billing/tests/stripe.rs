// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::collections::BTreeMap;

use assert_matches::assert_matches;
use chrono::{TimeZone, Utc};
use proize_billing::{
    BillingError, BillingProvider, CheckoutSessionRequest, CustomerRequest, StripeClient,
};
use serde_json::json;
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, header, method, path},
};

const SECRET_KEY: &str = "sk_test_secret";

async fn init_test() -> (StripeClient, MockServer) {
    let mock_server = MockServer::start().await;
    let endpoint = Url::parse(&format!("{}/", mock_server.uri())).expect("Couldn't parse URL");
    let client = StripeClient::new(endpoint, SECRET_KEY.to_owned(), reqwest::Client::new());

    (client, mock_server)
}

fn checkout_request() -> CheckoutSessionRequest {
    CheckoutSessionRequest {
        customer_id: "cus_123".to_owned(),
        price_id: "price_yearly".to_owned(),
        success_url: Url::parse("https://proize.example.com/billing").unwrap(),
        cancel_url: Url::parse("https://proize.example.com/").unwrap(),
        metadata: BTreeMap::from([
            ("spaceId".to_owned(), "space-1".to_owned()),
            ("userId".to_owned(), "user-1".to_owned()),
        ]),
        expires_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 30, 0).unwrap(),
    }
}

#[tokio::test]
async fn pass_create_customer() {
    let (client, mock_server) = init_test().await;

    Mock::given(method("POST"))
        .and(path("/v1/customers"))
        .and(header("authorization", format!("Bearer {SECRET_KEY}").as_str()))
        .and(body_string_contains("email=alice%40example.com"))
        .and(body_string_contains("name=Alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cus_123",
            "object": "customer",
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let customer = client
        .create_customer(&CustomerRequest {
            email: "alice@example.com".to_owned(),
            name: Some("Alice".to_owned()),
            user_id: "user-1".to_owned(),
        })
        .await
        .unwrap();

    assert_eq!(customer.id, "cus_123");
}

#[tokio::test]
async fn pass_create_checkout_session() {
    let (client, mock_server) = init_test().await;

    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .and(header("authorization", format!("Bearer {SECRET_KEY}").as_str()))
        .and(body_string_contains("mode=subscription"))
        .and(body_string_contains("customer=cus_123"))
        .and(body_string_contains("expires_at=1735691400"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_test_123",
            "object": "checkout.session",
            "url": "https://checkout.stripe.com/c/pay/cs_test_123",
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = client
        .create_checkout_session(&checkout_request())
        .await
        .unwrap();

    assert_eq!(session.id, "cs_test_123");
    assert_eq!(
        session.url.unwrap().as_str(),
        "https://checkout.stripe.com/c/pay/cs_test_123"
    );
}

#[tokio::test]
async fn pass_checkout_session_without_url() {
    let (client, mock_server) = init_test().await;

    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_test_123",
            "url": null,
        })))
        .mount(&mock_server)
        .await;

    let session = client
        .create_checkout_session(&checkout_request())
        .await
        .unwrap();

    assert!(session.url.is_none());
}

#[tokio::test]
async fn fail_provider_error() {
    let (client, mock_server) = init_test().await;

    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "type": "invalid_request_error",
                "message": "No such price: 'price_yearly'",
            },
        })))
        .mount(&mock_server)
        .await;

    let error = client
        .create_checkout_session(&checkout_request())
        .await
        .unwrap_err();

    let error = assert_matches!(error, BillingError::Provider(error) => error);
    assert_eq!(error.kind(), Some("invalid_request_error"));
    assert_eq!(error.status(), Some(reqwest::StatusCode::BAD_REQUEST));
    assert_eq!(
        error.to_string(),
        "invalid_request_error: No such price: 'price_yearly'"
    );
}
