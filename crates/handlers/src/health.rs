// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use axum::{extract::State, response::IntoResponse};
use proize_axum_utils::InternalError;
use sqlx::PgPool;
use tracing::{Instrument, info_span};

/// Check that the database answers, through a connection of the pool
#[tracing::instrument(name = "handler.health.get", skip_all)]
pub async fn get(State(pool): State<PgPool>) -> Result<impl IntoResponse, InternalError> {
    let mut conn = pool.acquire().await?;

    sqlx::query("SELECT 1")
        .execute(&mut *conn)
        .instrument(info_span!("db.health"))
        .await?;

    Ok("ok")
}

#[cfg(test)]
mod tests {
    use axum::http::{Request, StatusCode};

    use super::*;
    use crate::test_utils::{RequestBuilderExt, ResponseExt, send, setup};

    #[sqlx::test(migrations = false)]
    #[ignore = "requires a PostgreSQL database"]
    async fn test_get_health(pool: PgPool) {
        setup();
        let router = crate::healthcheck_router().with_state(pool);
        let request = Request::get("/health").empty();

        let response = send(router, request).await;
        response.assert_status(StatusCode::OK);
        assert_eq!(response.body(), "ok");
    }
}
