// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use reqwest::Method;
use serde::Deserialize;
use url::Url;

use crate::{
    BillingError, BillingProvider, CheckoutSession, CheckoutSessionRequest, Customer,
    CustomerRequest, error::StripeResponseExt as _,
};

/// Base URL of the production Stripe API
pub const DEFAULT_API_BASE: &str = "https://api.stripe.com/";

/// A [`BillingProvider`] backed by the Stripe API
#[derive(Clone)]
pub struct StripeClient {
    endpoint: Url,
    secret_key: String,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl StripeClient {
    /// Create a new client talking to the API at `endpoint`, authenticated
    /// with the given secret key
    #[must_use]
    pub fn new(endpoint: Url, secret_key: String, http_client: reqwest::Client) -> Self {
        Self {
            endpoint,
            secret_key,
            http_client,
        }
    }

    fn post(&self, url: &str) -> Result<reqwest::RequestBuilder, BillingError> {
        let url = self.endpoint.join(url)?;
        Ok(self
            .http_client
            .request(Method::POST, url)
            .bearer_auth(&self.secret_key))
    }
}

/// Encode a checkout session request with the bracketed keys the Stripe API
/// expects for nested parameters
fn checkout_session_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_owned(), "subscription".to_owned()),
        ("customer".to_owned(), request.customer_id.clone()),
        ("line_items[0][price]".to_owned(), request.price_id.clone()),
        ("line_items[0][quantity]".to_owned(), "1".to_owned()),
        ("success_url".to_owned(), request.success_url.to_string()),
        ("cancel_url".to_owned(), request.cancel_url.to_string()),
        ("allow_promotion_codes".to_owned(), "true".to_owned()),
        ("automatic_tax[enabled]".to_owned(), "true".to_owned()),
        ("tax_id_collection[enabled]".to_owned(), "true".to_owned()),
        ("billing_address_collection".to_owned(), "auto".to_owned()),
        ("customer_update[name]".to_owned(), "auto".to_owned()),
        ("customer_update[address]".to_owned(), "auto".to_owned()),
        (
            "expires_at".to_owned(),
            request.expires_at.timestamp().to_string(),
        ),
        (
            "after_expiration[recovery][enabled]".to_owned(),
            "true".to_owned(),
        ),
        (
            "after_expiration[recovery][allow_promotion_codes]".to_owned(),
            "true".to_owned(),
        ),
    ];

    for (key, value) in &request.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
        form.push((
            format!("subscription_data[metadata][{key}]"),
            value.clone(),
        ));
    }

    form
}

#[async_trait::async_trait]
impl BillingProvider for StripeClient {
    #[tracing::instrument(
        name = "billing.create_customer",
        skip_all,
        fields(
            user.id = %request.user_id,
            billing.customer.id,
        ),
        err,
    )]
    async fn create_customer(&self, request: &CustomerRequest) -> Result<Customer, BillingError> {
        #[derive(Deserialize)]
        struct Response {
            id: String,
        }

        let mut form = vec![
            ("email", request.email.as_str()),
            ("metadata[userId]", request.user_id.as_str()),
        ];
        if let Some(name) = &request.name {
            form.push(("name", name.as_str()));
        }

        let response = self
            .post("v1/customers")?
            .form(&form)
            .send()
            .await?
            .error_for_stripe_error()
            .await?;

        let body: Response = response.json().await?;
        tracing::Span::current().record("billing.customer.id", body.id.as_str());

        Ok(Customer { id: body.id })
    }

    #[tracing::instrument(
        name = "billing.create_checkout_session",
        skip_all,
        fields(
            billing.customer.id = %request.customer_id,
            billing.price.id = %request.price_id,
            billing.checkout_session.id,
        ),
        err,
    )]
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, BillingError> {
        #[derive(Deserialize)]
        struct Response {
            id: String,
            url: Option<String>,
        }

        let response = self
            .post("v1/checkout/sessions")?
            .form(&checkout_session_form(request))
            .send()
            .await?
            .error_for_stripe_error()
            .await?;

        let body: Response = response.json().await?;
        tracing::Span::current().record("billing.checkout_session.id", body.id.as_str());

        let url = body.url.as_deref().map(Url::parse).transpose()?;

        Ok(CheckoutSession { id: body.id, url })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn test_checkout_session_form() {
        let request = CheckoutSessionRequest {
            customer_id: "cus_123".to_owned(),
            price_id: "price_monthly".to_owned(),
            success_url: Url::parse("https://proize.example.com/billing").unwrap(),
            cancel_url: Url::parse("https://proize.example.com/").unwrap(),
            metadata: BTreeMap::from([
                ("spaceId".to_owned(), "space-1".to_owned()),
                ("userId".to_owned(), "user-1".to_owned()),
            ]),
            expires_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 30, 0).unwrap(),
        };

        let form = checkout_session_form(&request);
        let get = |key: &str| {
            form.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("mode"), Some("subscription"));
        assert_eq!(get("customer"), Some("cus_123"));
        assert_eq!(get("line_items[0][price]"), Some("price_monthly"));
        assert_eq!(get("line_items[0][quantity]"), Some("1"));
        assert_eq!(get("expires_at"), Some("1735691400"));
        assert_eq!(get("metadata[userId]"), Some("user-1"));
        assert_eq!(get("subscription_data[metadata][spaceId]"), Some("space-1"));
        assert_eq!(get("after_expiration[recovery][enabled]"), Some("true"));
    }
}
