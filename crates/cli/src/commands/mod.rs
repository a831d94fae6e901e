// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};

mod config;
mod database;
mod server;
mod users;
mod verifications;

#[derive(Parser, Debug)]
enum Subcommand {
    /// Configuration-related commands
    Config(self::config::Options),

    /// Manage the database
    Database(self::database::Options),

    /// Runs the web server
    Server(self::server::Options),

    /// Maintenance of the verification tokens
    Verifications(self::verifications::Options),

    /// Manage the entitlements of the users
    Users(self::users::Options),
}

#[derive(Parser, Debug)]
#[command(version = crate::VERSION)]
pub struct Options {
    /// Path to the configuration file
    #[arg(short, long, global = true, action = clap::ArgAction::Append)]
    config: Vec<Utf8PathBuf>,

    #[command(subcommand)]
    subcommand: Option<Subcommand>,
}

impl Options {
    pub async fn run(self, figment: &Figment) -> anyhow::Result<ExitCode> {
        use Subcommand as S;
        match self.subcommand {
            Some(S::Config(c)) => c.run(figment).await,
            Some(S::Database(c)) => c.run(figment).await,
            Some(S::Server(c)) => c.run(figment).await,
            Some(S::Verifications(c)) => c.run(figment).await,
            Some(S::Users(c)) => c.run(figment).await,
            None => self::server::Options::default().run(figment).await,
        }
    }

    /// Get a [`Figment`] instance with the configuration loaded
    pub fn figment(&self) -> Figment {
        let configs = if self.config.is_empty() {
            // Read the PROIZE_CONFIG environment variable
            std::env::var("PROIZE_CONFIG")
                // Default to "config.yaml"
                .unwrap_or_else(|_| "config.yaml".to_owned())
                // Split the file list on `:`
                .split(':')
                .map(Utf8PathBuf::from)
                .collect()
        } else {
            self.config.clone()
        };

        // Nested keys are separated by a double underscore, like in
        // `PROIZE_ADMIN__API_SECRET`
        let base = Figment::new().merge(Env::prefixed("PROIZE_").split("__"));

        configs
            .into_iter()
            .fold(base, |f, path| f.admerge(Yaml::file(path)))
            // The usual libpq-style variable wins over everything else
            .merge(Env::raw().only(&["DATABASE_URL"]).map(|_| "database.uri".into()))
    }
}

#[cfg(test)]
mod tests {
    use figment::Jail;
    use proize_config::{ConfigurationSection, RootConfig};

    use super::*;

    #[test]
    fn test_figment() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file(
                "config.yaml",
                r"
                    http:
                      listen: '127.0.0.1:8080'
                    database:
                      uri: postgresql://from-the-file/proize
                ",
            )?;
            jail.create_file(
                "override.yaml",
                r"
                    http:
                      listen: '127.0.0.1:9090'
                ",
            )?;

            let opts = Options::parse_from(["proize", "config", "check"]);
            let config = RootConfig::extract(&opts.figment()).map_err(|e| e.to_string())?;
            assert_eq!(config.http.listen.port(), 8080);
            assert_eq!(
                config.database.uri.as_deref(),
                Some("postgresql://from-the-file/proize")
            );

            let opts = Options::parse_from([
                "proize",
                "-c",
                "config.yaml",
                "-c",
                "override.yaml",
                "config",
                "check",
            ]);
            let config = RootConfig::extract(&opts.figment()).map_err(|e| e.to_string())?;
            assert_eq!(config.http.listen.port(), 9090);

            jail.set_env("DATABASE_URL", "postgresql://from-the-env/proize");
            jail.set_env("PROIZE_ADMIN__API_SECRET", "hunter2");
            let config = RootConfig::extract(&opts.figment()).map_err(|e| e.to_string())?;
            assert_eq!(
                config.database.uri.as_deref(),
                Some("postgresql://from-the-env/proize")
            );
            assert_eq!(config.admin.api_secret.as_deref(), Some("hunter2"));

            Ok(())
        });
    }
}
