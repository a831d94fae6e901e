// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Endpoints sending users to the hosted payment pages

use std::sync::Arc;

use chrono::Duration;
use proize_billing::BillingProvider;
use url::Url;

pub mod checkout;

/// Everything the checkout endpoint needs to talk to the billing provider
#[derive(Clone)]
pub struct CheckoutSettings {
    public_base: Url,
    backend: Option<CheckoutBackend>,
}

#[derive(Clone)]
struct CheckoutBackend {
    provider: Arc<dyn BillingProvider>,
    monthly_price_id: String,
    yearly_price_id: String,
    expiry: Duration,
}

impl CheckoutSettings {
    /// Settings for a deployment where billing is enabled
    #[must_use]
    pub fn new(
        public_base: Url,
        provider: Arc<dyn BillingProvider>,
        monthly_price_id: String,
        yearly_price_id: String,
        expiry: Duration,
    ) -> Self {
        Self {
            public_base,
            backend: Some(CheckoutBackend {
                provider,
                monthly_price_id,
                yearly_price_id,
                expiry,
            }),
        }
    }

    /// Settings for a deployment without billing. Signed-in users get an
    /// error when trying to check out.
    #[must_use]
    pub fn disabled(public_base: Url) -> Self {
        Self {
            public_base,
            backend: None,
        }
    }

    /// Resolve a path against the public base, refusing to leave its origin
    fn absolute(&self, path: &str) -> Option<Url> {
        let url = self.public_base.join(path).ok()?;
        (url.origin() == self.public_base.origin()).then_some(url)
    }
}

impl std::fmt::Debug for CheckoutSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutSettings")
            .field("public_base", &self.public_base.as_str())
            .field("enabled", &self.backend.is_some())
            .finish_non_exhaustive()
    }
}
