// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::net::{Ipv6Addr, SocketAddr};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::Error as _};
use url::Url;

use super::ConfigurationSection;

fn default_listen() -> SocketAddr {
    SocketAddr::from((Ipv6Addr::UNSPECIFIED, 8080))
}

fn default_public_base() -> Url {
    "http://[::]:8080/".parse().unwrap()
}

/// Configuration of the HTTP server
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HttpConfig {
    /// Address and port the server listens on
    #[serde(default = "default_listen")]
    #[schemars(with = "String", example = "default_listen")]
    pub listen: SocketAddr,

    /// Public URL base from where the service is reachable, used to build
    /// absolute redirect URLs
    #[serde(default = "default_public_base")]
    #[schemars(url)]
    pub public_base: Url,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            public_base: default_public_base(),
        }
    }
}

impl ConfigurationSection for HttpConfig {
    const PATH: Option<&'static str> = Some("http");

    fn validate(
        &self,
        figment: &figment::Figment,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        let metadata = figment.find_metadata(Self::PATH.unwrap());
        let annotate = |mut error: figment::Error| {
            error.metadata = metadata.cloned();
            error.profile = Some(figment::Profile::Default);
            error.path = vec![Self::PATH.unwrap().to_owned(), "public_base".to_owned()];
            error
        };

        if !matches!(self.public_base.scheme(), "http" | "https") {
            return Err(annotate(figment::Error::custom(
                "the public base must be an http or https URL",
            ))
            .into());
        }

        if !self.public_base.path().ends_with('/') {
            return Err(annotate(figment::Error::custom(
                "the public base must end with a slash",
            ))
            .into());
        }

        Ok(())
    }
}
