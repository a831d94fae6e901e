// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use figment::Figment;
use proize_config::{ConfigurationSectionExt, DatabaseConfig};
use proize_storage::RepositoryFactory;
use proize_storage_pg::PgRepositoryFactory;
use proize_tasks::{ReconcileError, ReconcileOptions};
use tracing::{error, info};

use crate::util::database_pool_from_config;

#[derive(Parser, Debug)]
pub(super) struct Options {
    #[command(subcommand)]
    subcommand: Subcommand,
}

#[derive(Parser, Debug)]
enum Subcommand {
    /// Remove duplicate and orphaned verification tokens
    ///
    /// The report is printed as JSON on the standard output.
    Clean {
        /// Only report what would be deleted
        #[arg(long)]
        dry_run: bool,

        /// Actually delete the rows
        #[arg(long)]
        confirm: bool,
    },
}

impl Options {
    pub async fn run(self, figment: &Figment) -> anyhow::Result<ExitCode> {
        let Subcommand::Clean { dry_run, confirm } = self.subcommand;

        let config =
            DatabaseConfig::extract_or_default(figment).map_err(anyhow::Error::from_boxed)?;
        let pool = database_pool_from_config(&config).await?;
        let repo = PgRepositoryFactory::new(pool).create().await?;

        let options = ReconcileOptions { dry_run, confirm };
        let report = match proize_tasks::reconcile(repo, options).await {
            Ok(report) => report,
            Err(e @ ReconcileError::ConfirmationRequired) => {
                error!("Refusing to delete anything, {e}: pass --confirm or --dry-run");
                return Ok(ExitCode::FAILURE);
            }
            Err(ReconcileError::Storage(e)) => {
                return Err(e).context("could not reconcile the verification tokens");
            }
        };

        info!(
            dry_run = report.dry_run,
            duplicates = report.duplicates_count,
            orphans = report.orphaned_count,
            "Verification tokens reconciled"
        );

        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(ExitCode::SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let opts = Options::parse_from(["verifications", "clean", "--dry-run"]);
        let Subcommand::Clean { dry_run, confirm } = opts.subcommand;
        assert!(dry_run);
        assert!(!confirm);

        let opts = Options::parse_from(["verifications", "clean", "--confirm"]);
        let Subcommand::Clean { dry_run, confirm } = opts.subcommand;
        assert!(!dry_run);
        assert!(confirm);
    }
}
