// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use figment::Figment;
use proize_config::{ConfigurationSectionExt, DatabaseConfig, PlanConfig};
use proize_storage::SystemClock;
use proize_storage_pg::PgRepositoryFactory;
use rand::SeedableRng;
use tracing::info;

use crate::util::{database_pool_from_config, subscription_plan_from_config};

#[derive(Parser, Debug)]
pub(super) struct Options {
    #[command(subcommand)]
    subcommand: Subcommand,
}

#[derive(Parser, Debug)]
enum Subcommand {
    /// Give the pro tier and a lifetime subscription to every user
    ///
    /// Users which already have an active subscription are left untouched.
    GrantPro,
}

impl Options {
    pub async fn run(self, figment: &Figment) -> anyhow::Result<ExitCode> {
        let Subcommand::GrantPro = self.subcommand;

        let database =
            DatabaseConfig::extract_or_default(figment).map_err(anyhow::Error::from_boxed)?;
        let plan = PlanConfig::extract_or_default(figment).map_err(anyhow::Error::from_boxed)?;
        let plan = subscription_plan_from_config(&plan);

        let pool = database_pool_from_config(&database).await?;
        let factory = PgRepositoryFactory::new(pool);
        let clock = SystemClock::default();
        let mut rng = rand_chacha::ChaChaRng::from_entropy();

        let summary = proize_tasks::grant_pro_to_all_users(&factory, &clock, &mut rng, &plan)
            .await
            .context("could not grant the entitlement")?;

        info!(
            users = summary.users_processed,
            created = summary.subscriptions_created,
            skipped = summary.subscriptions_skipped,
            "Entitlement granted"
        );

        println!("{}", serde_json::to_string_pretty(&summary)?);
        Ok(ExitCode::SUCCESS)
    }
}
