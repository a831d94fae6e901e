// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use schemars::{JsonSchema, r#gen::SchemaSettings, schema::RootSchema};
use serde::{Deserialize, Serialize};

mod admin;
mod billing;
mod database;
mod http;
mod plan;
mod session;
mod telemetry;

pub use self::{
    admin::AdminConfig,
    billing::BillingConfig,
    database::DatabaseConfig,
    http::HttpConfig,
    plan::{PlanConfig, PlanInterval},
    session::SessionConfig,
    telemetry::{SentryConfig, TelemetryConfig},
};
use crate::util::ConfigurationSection;

/// Application configuration root
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct RootConfig {
    /// Configuration of the HTTP server
    #[serde(default)]
    pub http: HttpConfig,

    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Configuration of the administrative endpoints
    #[serde(default, skip_serializing_if = "AdminConfig::is_default")]
    pub admin: AdminConfig,

    /// How the signed-in user is identified on incoming requests
    #[serde(default, skip_serializing_if = "SessionConfig::is_default")]
    pub session: SessionConfig,

    /// Configuration of the hosted-payments provider
    #[serde(default, skip_serializing_if = "BillingConfig::is_default")]
    pub billing: BillingConfig,

    /// The plan granted to every user by `proize users grant-pro`
    #[serde(default, skip_serializing_if = "PlanConfig::is_default")]
    pub plan: PlanConfig,

    /// Configuration related to sending monitoring data
    #[serde(default, skip_serializing_if = "TelemetryConfig::is_default")]
    pub telemetry: TelemetryConfig,
}

impl ConfigurationSection for RootConfig {
    fn validate(
        &self,
        figment: &figment::Figment,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        self.http.validate(figment)?;
        self.database.validate(figment)?;
        self.admin.validate(figment)?;
        self.session.validate(figment)?;
        self.billing.validate(figment)?;
        self.plan.validate(figment)?;
        self.telemetry.validate(figment)?;

        Ok(())
    }
}

impl RootConfig {
    /// Generate the JSON schema of the configuration file
    #[must_use]
    pub fn json_schema() -> RootSchema {
        let settings = SchemaSettings::draft07().with(|s| {
            s.option_nullable = false;
            s.option_add_null_type = true;
        });

        settings.into_generator().into_root_schema_for::<Self>()
    }
}

/// Partial configuration actually used by the server
#[allow(missing_docs)]
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub billing: BillingConfig,

    #[serde(default)]
    pub plan: PlanConfig,
}

impl ConfigurationSection for AppConfig {
    fn validate(
        &self,
        figment: &figment::Figment,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        self.http.validate(figment)?;
        self.database.validate(figment)?;
        self.admin.validate(figment)?;
        self.session.validate(figment)?;
        self.billing.validate(figment)?;
        self.plan.validate(figment)?;

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

    #[test]
    fn load_minimal_config() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r"
                    http:
                      listen: '[::]:8080'
                ",
            )?;

            let config = RootConfig::extract(&Figment::new().merge(Yaml::file("config.yaml")))
                .map_err(|e| e.to_string())?;

            assert_eq!(config.http.listen.port(), 8080);
            assert!(config.admin.api_secret.is_none());
            assert_eq!(config.session.user_id_header, "x-proize-user-id");
            assert_eq!(config.plan.price_id, "price_lifetime_premium");

            Ok(())
        });
    }

    #[test]
    fn schema_lists_sections() {
        let schema = serde_json::to_value(RootConfig::json_schema()).unwrap();
        let properties = schema["properties"].as_object().unwrap();
        for section in [
            "http",
            "database",
            "admin",
            "session",
            "billing",
            "plan",
            "telemetry",
        ] {
            assert!(properties.contains_key(section), "missing {section}");
        }
    }
}
