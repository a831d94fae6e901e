// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::lock::Mutex;
use url::Url;

use crate::{
    BillingError, BillingProvider, CheckoutSession, CheckoutSessionRequest, Customer,
    CustomerRequest,
};

/// A [`BillingProvider`] which records the requests it receives, for tests
#[derive(Debug, Default)]
pub struct MockBillingProvider {
    customers: Mutex<Vec<CustomerRequest>>,
    sessions: Mutex<Vec<CheckoutSessionRequest>>,
    failing: AtomicBool,
    without_url: AtomicBool,
}

impl MockBillingProvider {
    /// Create a new mock provider
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make the created checkout sessions have no hosted page URL
    pub fn set_without_url(&self, without_url: bool) {
        self.without_url.store(without_url, Ordering::SeqCst);
    }

    /// The customer creations received so far
    pub async fn customers(&self) -> Vec<CustomerRequest> {
        self.customers.lock().await.clone()
    }

    /// The checkout session creations received so far
    pub async fn checkout_sessions(&self) -> Vec<CheckoutSessionRequest> {
        self.sessions.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl BillingProvider for MockBillingProvider {
    async fn create_customer(&self, request: &CustomerRequest) -> Result<Customer, BillingError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BillingError::Simulated);
        }

        let mut customers = self.customers.lock().await;
        customers.push(request.clone());
        Ok(Customer {
            id: format!("cus_mock{}", customers.len()),
        })
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, BillingError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BillingError::Simulated);
        }

        let mut sessions = self.sessions.lock().await;
        sessions.push(request.clone());
        let id = format!("cs_mock{}", sessions.len());

        let url = if self.without_url.load(Ordering::SeqCst) {
            None
        } else {
            Some(Url::parse(&format!("https://checkout.stripe.test/c/pay/{id}"))?)
        };

        Ok(CheckoutSession { id, url })
    }
}
