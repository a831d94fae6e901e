// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::Error as _};

use super::ConfigurationSection;

/// Configuration of the administrative endpoints
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct AdminConfig {
    /// Shared secret expected as a bearer token on the administrative
    /// endpoints.
    ///
    /// When unset, every call to those endpoints is rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,
}

impl AdminConfig {
    pub(crate) fn is_default(&self) -> bool {
        self.api_secret.is_none()
    }
}

impl ConfigurationSection for AdminConfig {
    const PATH: Option<&'static str> = Some("admin");

    fn validate(
        &self,
        figment: &figment::Figment,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        if self.api_secret.as_deref().is_some_and(str::is_empty) {
            let mut error = figment::Error::custom("the admin API secret must not be empty");
            error.metadata = figment.find_metadata(Self::PATH.unwrap()).cloned();
            error.profile = Some(figment::Profile::Default);
            error.path = vec![Self::PATH.unwrap().to_owned(), "api_secret".to_owned()];
            return Err(error.into());
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

    #[test]
    fn reject_empty_secret() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
                    admin:
                      api_secret: ""
                "#,
            )?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            assert!(AdminConfig::extract(&figment).is_err());

            jail.create_file(
                "config.yaml",
                r"
                    admin:
                      api_secret: hunter2
                ",
            )?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            let config = AdminConfig::extract(&figment).map_err(|e| e.to_string())?;
            assert_eq!(config.api_secret.as_deref(), Some("hunter2"));

            Ok(())
        });
    }
}
