// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use tokio::signal::unix::{Signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// A helper to trigger a graceful shutdown of the server.
///
/// It listens for SIGTERM and SIGINT signals. The first one cancels the
/// `soft_shutdown_token`, on which the server stops accepting connections and
/// finishes in-flight requests. A second signal exits the process right away.
pub struct ShutdownManager {
    soft_shutdown_token: CancellationToken,
    sigterm: Signal,
    sigint: Signal,
}

impl ShutdownManager {
    /// Create a new shutdown manager, installing the signal handlers
    ///
    /// # Errors
    ///
    /// Returns an error if the signal handler could not be installed
    pub fn new() -> Result<Self, std::io::Error> {
        let sigterm = tokio::signal::unix::signal(SignalKind::terminate())?;
        let sigint = tokio::signal::unix::signal(SignalKind::interrupt())?;

        Ok(Self {
            soft_shutdown_token: CancellationToken::new(),
            sigterm,
            sigint,
        })
    }

    /// Get a cancellation token that can be used to react to a soft shutdown
    #[must_use]
    pub fn soft_shutdown_token(&self) -> CancellationToken {
        self.soft_shutdown_token.clone()
    }

    /// Wait for the shutdown signals. Meant to be spawned in the background.
    pub async fn run(mut self) {
        tokio::select! {
            _ = self.sigterm.recv() => {
                tracing::info!("Shutdown signal received (SIGTERM), shutting down");
            },
            _ = self.sigint.recv() => {
                tracing::info!("Shutdown signal received (SIGINT), shutting down");
            },
        }

        self.soft_shutdown_token.cancel();

        tokio::select! {
            _ = self.sigterm.recv() => {
                tracing::warn!("Second shutdown signal received (SIGTERM), abort");
            },
            _ = self.sigint.recv() => {
                tracing::warn!("Second shutdown signal received (SIGINT), abort");
            },
        }

        std::process::exit(1);
    }
}
