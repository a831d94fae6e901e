// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::process::ExitCode;

use anyhow::Context;
use axum::http::HeaderName;
use clap::Parser;
use figment::Figment;
use proize_axum_utils::UserIdHeader;
use proize_config::{AppConfig, ConfigurationSection};
use proize_handlers::AdminSecret;
use proize_storage_pg::{MIGRATOR, PgRepositoryFactory};
use tower_http::trace::TraceLayer;
use tracing::{Instrument, info, info_span, warn};

use crate::{
    app_state::AppState,
    shutdown::ShutdownManager,
    util::{
        checkout_settings_from_config, database_pool_from_config, http_client,
        subscription_plan_from_config,
    },
};

#[derive(Parser, Debug, Default)]
pub(super) struct Options {
    /// Apply pending database migrations before starting
    #[arg(long)]
    migrate: bool,
}

impl Options {
    pub async fn run(self, figment: &Figment) -> anyhow::Result<ExitCode> {
        let span = info_span!("cli.run.init").entered();
        let config = AppConfig::extract(figment).map_err(anyhow::Error::from_boxed)?;

        info!(version = crate::VERSION, "Starting up");

        // Connect to the database
        info!("Connecting to the database");
        let pool = database_pool_from_config(&config.database).await?;

        if self.migrate {
            info!("Running pending database migrations");
            MIGRATOR
                .run(&pool)
                .instrument(info_span!("db.migrate"))
                .await
                .context("could not run database migrations")?;
        }

        if config.admin.api_secret.is_none() {
            warn!("No admin API secret configured, the admin endpoints will reject every request");
        }

        let user_id_header: HeaderName = config
            .session
            .header_name()
            .context("invalid session user ID header")?;

        let checkout =
            checkout_settings_from_config(&config.http, &config.billing, http_client())?;

        let state = AppState {
            repository_factory: PgRepositoryFactory::new(pool),
            admin_secret: AdminSecret::new(config.admin.api_secret.as_deref()),
            checkout,
            plan: subscription_plan_from_config(&config.plan),
            user_id_header: UserIdHeader::new(user_id_header),
        };

        let router = proize_handlers::healthcheck_router()
            .merge(proize_handlers::admin_router())
            .merge(proize_handlers::billing_router())
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        let shutdown = ShutdownManager::new().context("could not install signal handlers")?;
        let soft_shutdown_token = shutdown.soft_shutdown_token();
        tokio::spawn(shutdown.run());

        let listener = tokio::net::TcpListener::bind(config.http.listen)
            .await
            .with_context(|| format!("could not bind to {}", config.http.listen))?;

        info!(
            listen = %config.http.listen,
            public_base = %config.http.public_base,
            "Listening for HTTP requests"
        );
        span.exit();

        axum::serve(listener, router)
            .with_graceful_shutdown(soft_shutdown_token.cancelled_owned())
            .await
            .context("HTTP server error")?;

        info!("Server stopped");
        Ok(ExitCode::SUCCESS)
    }
}
