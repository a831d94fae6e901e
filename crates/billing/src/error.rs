// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::fmt::Display;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Errors returned by a [`crate::BillingProvider`]
#[derive(Debug, Error)]
pub enum BillingError {
    /// The request could not be sent, or the response could not be decoded
    #[error("failed to talk to the billing provider")]
    Http(#[from] reqwest::Error),

    /// The provider answered with an error
    #[error("the billing provider rejected the request: {0}")]
    Provider(#[from] ProviderError),

    /// The provider returned a URL which could not be parsed
    #[error("the billing provider returned an invalid URL")]
    InvalidUrl(#[from] url::ParseError),

    /// Billing is not configured
    #[error("billing is not configured")]
    Disabled,

    /// An error injected by a mock provider
    #[error("simulated billing provider failure")]
    Simulated,
}

/// The body of an error response from Stripe
/// Ref: <https://docs.stripe.com/api/errors>
#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    kind: String,
    message: Option<String>,
}

/// An error status received from the provider, with the error details from
/// the body when they could be decoded
#[derive(Debug, Error)]
pub struct ProviderError {
    details: Option<StripeErrorDetails>,

    #[source]
    source: reqwest::Error,
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.details {
            Some(StripeErrorDetails {
                kind,
                message: Some(message),
            }) => write!(f, "{kind}: {message}"),
            Some(StripeErrorDetails {
                kind,
                message: None,
            }) => write!(f, "{kind}"),
            None => write!(f, "(no specific error)"),
        }
    }
}

impl ProviderError {
    /// The error type reported by the provider, like `card_error`
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.details.as_ref().map(|d| d.kind.as_str())
    }

    /// The HTTP status the provider answered with
    #[must_use]
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        self.source.status()
    }
}

/// An extension trait for [`reqwest::Response`] to extract the error details
/// of failed Stripe API calls
#[async_trait]
pub(crate) trait StripeResponseExt: Sized {
    async fn error_for_stripe_error(self) -> Result<Self, ProviderError>;
}

#[async_trait]
impl StripeResponseExt for reqwest::Response {
    async fn error_for_stripe_error(self) -> Result<Self, ProviderError> {
        match self.error_for_status_ref() {
            Ok(_response) => Ok(self),
            Err(source) => {
                let details = self
                    .json::<StripeErrorBody>()
                    .await
                    .ok()
                    .map(|body| body.error);
                Err(ProviderError { details, source })
            }
        }
    }
}
