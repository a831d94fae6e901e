// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::Error as _};
use serde_with::serde_as;
use url::Url;

use super::ConfigurationSection;

fn default_api_base() -> Url {
    Url::parse("https://api.stripe.com/").unwrap()
}

fn default_checkout_expiry() -> Duration {
    Duration::from_secs(30 * 60)
}

fn secret_key_example() -> &'static str {
    "sk_test_..."
}

/// Configuration of the hosted-payments provider
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct BillingConfig {
    /// Secret API key of the Stripe account
    ///
    /// Checkout is disabled when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(example = "secret_key_example")]
    pub stripe_secret_key: Option<String>,

    /// Base URL of the Stripe API
    #[serde(default = "default_api_base")]
    #[schemars(url)]
    pub stripe_api_base: Url,

    /// Price used for the monthly checkout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_price_id: Option<String>,

    /// Price used for the yearly checkout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yearly_price_id: Option<String>,

    /// How long a checkout session stays valid, in seconds
    #[schemars(with = "u64")]
    #[serde(default = "default_checkout_expiry")]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub checkout_expiry: Duration,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            stripe_secret_key: None,
            stripe_api_base: default_api_base(),
            monthly_price_id: None,
            yearly_price_id: None,
            checkout_expiry: default_checkout_expiry(),
        }
    }
}

impl BillingConfig {
    pub(crate) fn is_default(&self) -> bool {
        self.stripe_secret_key.is_none()
            && self.stripe_api_base == default_api_base()
            && self.monthly_price_id.is_none()
            && self.yearly_price_id.is_none()
            && self.checkout_expiry == default_checkout_expiry()
    }

    /// Whether checkout is available
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.stripe_secret_key.is_some()
    }
}

impl ConfigurationSection for BillingConfig {
    const PATH: Option<&'static str> = Some("billing");

    fn validate(
        &self,
        figment: &figment::Figment,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        let metadata = figment.find_metadata(Self::PATH.unwrap());
        let error_on_field = |mut error: figment::error::Error, field: &'static str| {
            error.metadata = metadata.cloned();
            error.profile = Some(figment::Profile::Default);
            error.path = vec![Self::PATH.unwrap().to_owned(), field.to_owned()];
            error
        };
        let missing_field = |field: &'static str| {
            error_on_field(figment::error::Error::missing_field(field), field)
        };

        if self.stripe_secret_key.is_some() {
            if self.monthly_price_id.is_none() {
                return Err(missing_field("monthly_price_id").into());
            }

            if self.yearly_price_id.is_none() {
                return Err(missing_field("yearly_price_id").into());
            }
        }

        if self.checkout_expiry.is_zero() {
            return Err(error_on_field(
                figment::error::Error::custom("checkout expiry must not be zero"),
                "checkout_expiry",
            )
            .into());
        }

        Ok(())
    }
}
