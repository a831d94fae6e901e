// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Integration with the hosted-payments provider.
//!
//! The [`BillingProvider`] trait abstracts the few calls the service makes,
//! with [`StripeClient`] talking to the Stripe API and
//! [`MockBillingProvider`] recording calls for tests.

#![deny(missing_docs)]

mod error;
mod mock;
mod stripe;

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use url::Url;

pub use self::{
    error::BillingError,
    mock::MockBillingProvider,
    stripe::{DEFAULT_API_BASE, StripeClient},
};

/// A customer to create on the provider side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRequest {
    /// Email address of the customer
    pub email: String,

    /// Display name of the customer
    pub name: Option<String>,

    /// ID of the local user this customer belongs to
    pub user_id: String,
}

/// A customer known by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    /// Provider-side ID of the customer
    pub id: String,
}

/// Parameters of a subscription checkout session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    /// Provider-side ID of the paying customer
    pub customer_id: String,

    /// Price of the single line item
    pub price_id: String,

    /// Where the user lands after a successful payment
    pub success_url: Url,

    /// Where the user lands when abandoning the checkout
    pub cancel_url: Url,

    /// Metadata attached to both the session and the resulting subscription
    pub metadata: BTreeMap<String, String>,

    /// When the session stops being usable
    pub expires_at: DateTime<Utc>,
}

/// A checkout session created by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    /// Provider-side ID of the session
    pub id: String,

    /// Hosted page the user should be sent to, if any
    pub url: Option<Url>,
}

/// The operations the service needs from a hosted-payments provider
#[async_trait::async_trait]
pub trait BillingProvider: Send + Sync {
    /// Create a new customer
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is unreachable or rejected the
    /// request
    async fn create_customer(&self, request: &CustomerRequest) -> Result<Customer, BillingError>;

    /// Create a subscription checkout session
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is unreachable or rejected the
    /// request
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, BillingError>;
}

#[async_trait::async_trait]
impl<T: BillingProvider + ?Sized> BillingProvider for Arc<T> {
    async fn create_customer(&self, request: &CustomerRequest) -> Result<Customer, BillingError> {
        (**self).create_customer(request).await
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, BillingError> {
        (**self).create_checkout_session(request).await
    }
}

#[async_trait::async_trait]
impl<T: BillingProvider + ?Sized> BillingProvider for &T {
    async fn create_customer(&self, request: &CustomerRequest) -> Result<Customer, BillingError> {
        (**self).create_customer(request).await
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, BillingError> {
        (**self).create_checkout_session(request).await
    }
}
