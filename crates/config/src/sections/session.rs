// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::Error as _};

use super::ConfigurationSection;

const DEFAULT_USER_ID_HEADER: &str = "x-proize-user-id";

fn default_user_id_header() -> String {
    DEFAULT_USER_ID_HEADER.to_owned()
}

/// How the signed-in user is identified on incoming requests.
///
/// Authentication itself happens in front of this service, which trusts the
/// header set by the authenticating proxy.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct SessionConfig {
    /// Name of the header carrying the ID of the signed-in user
    #[serde(default = "default_user_id_header")]
    pub user_id_header: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_id_header: default_user_id_header(),
        }
    }
}

impl SessionConfig {
    pub(crate) fn is_default(&self) -> bool {
        self.user_id_header == DEFAULT_USER_ID_HEADER
    }

    /// Parse the configured header name
    ///
    /// # Errors
    ///
    /// Returns an error if the header name is invalid
    pub fn header_name(&self) -> Result<http::HeaderName, http::header::InvalidHeaderName> {
        http::HeaderName::try_from(self.user_id_header.as_str())
    }
}

impl ConfigurationSection for SessionConfig {
    const PATH: Option<&'static str> = Some("session");

    fn validate(
        &self,
        figment: &figment::Figment,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        if let Err(e) = self.header_name() {
            let mut error = figment::Error::custom(format!("invalid header name: {e}"));
            error.metadata = figment.find_metadata(Self::PATH.unwrap()).cloned();
            error.profile = Some(figment::Profile::Default);
            error.path = vec![Self::PATH.unwrap().to_owned(), "user_id_header".to_owned()];
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
    use crate::ConfigurationSectionExt;

    #[test]
    fn load_config() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r"
                    session:
                      user_id_header: X-Authenticated-User
                ",
            )?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            let config = SessionConfig::extract_or_default(&figment).map_err(|e| e.to_string())?;
            assert_eq!(
                config.header_name().unwrap().as_str(),
                "x-authenticated-user"
            );

            jail.create_file(
                "config.yaml",
                r"
                    session:
                      user_id_header: 'not a header'
                ",
            )?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            assert!(SessionConfig::extract_or_default(&figment).is_err());

            Ok(())
        });
    }
}
