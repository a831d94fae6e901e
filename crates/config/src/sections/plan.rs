// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::Error as _};

use super::ConfigurationSection;

fn default_price_id() -> String {
    "price_lifetime_premium".to_owned()
}

fn default_amount() -> i64 {
    5600
}

fn default_currency() -> String {
    "EUR".to_owned()
}

fn default_quantity() -> i32 {
    999
}

fn default_duration_years() -> u32 {
    99
}

/// Billing interval of a plan
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PlanInterval {
    /// Billed every month
    Month,

    /// Billed every year
    #[default]
    Year,
}

/// The plan granted to every user by the entitlement grant
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct PlanConfig {
    /// Price ID recorded on the created subscriptions
    #[serde(default = "default_price_id")]
    pub price_id: String,

    /// Amount, in the smallest unit of the currency
    #[serde(default = "default_amount")]
    pub amount: i64,

    /// ISO 4217 currency code
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Number of seats
    #[serde(default = "default_quantity")]
    pub quantity: i32,

    /// Billing interval
    #[serde(default)]
    pub interval: PlanInterval,

    /// How long the granted subscription lasts, in years
    #[serde(default = "default_duration_years")]
    pub duration_years: u32,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            price_id: default_price_id(),
            amount: default_amount(),
            currency: default_currency(),
            quantity: default_quantity(),
            interval: PlanInterval::default(),
            duration_years: default_duration_years(),
        }
    }
}

impl PlanConfig {
    pub(crate) fn is_default(&self) -> bool {
        self == &Self::default()
    }
}

impl ConfigurationSection for PlanConfig {
    const PATH: Option<&'static str> = Some("plan");

    fn validate(
        &self,
        _figment: &figment::Figment,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        if self.amount < 0 {
            return Err(figment::error::Error::custom("plan amount must not be negative")
                .with_path("plan.amount")
                .into());
        }

        if self.quantity < 1 {
            return Err(figment::error::Error::custom("plan quantity must be at least 1")
                .with_path("plan.quantity")
                .into());
        }

        if self.duration_years == 0 {
            return Err(
                figment::error::Error::custom("plan duration must be at least one year")
                    .with_path("plan.duration_years")
                    .into(),
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use figment::{
        Figment, Jail,
        providers::{Format, Yaml},
    };

    use super::*;
    use crate::ConfigurationSectionExt;

    #[test]
    fn load_config() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r"
                    plan:
                      price_id: price_team
                      interval: month
                      quantity: 5
                ",
            )?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            let config = PlanConfig::extract_or_default(&figment).map_err(|e| e.to_string())?;

            assert_eq!(config.price_id, "price_team");
            assert_eq!(config.interval, PlanInterval::Month);
            assert_eq!(config.quantity, 5);
            assert_eq!(config.amount, 5600);
            assert_eq!(config.currency, "EUR");
            assert_eq!(config.duration_years, 99);

            Ok(())
        });
    }

    #[test]
    fn reject_zero_quantity() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r"
                    plan:
                      quantity: 0
                ",
            )?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            assert!(PlanConfig::extract_or_default(&figment).is_err());

            Ok(())
        });
    }
}
