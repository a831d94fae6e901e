// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use proize_axum_utils::record_error;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// The secret callers of the admin API must present as a bearer token.
///
/// Only a digest of the secret is kept around, and tokens are compared
/// through their digest.
#[derive(Clone, Default)]
pub struct AdminSecret {
    digest: Option<Arc<[u8]>>,
}

impl std::fmt::Debug for AdminSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSecret")
            .field("configured", &self.digest.is_some())
            .finish()
    }
}

impl AdminSecret {
    /// Build the gate from the configured secret. Without a secret, every
    /// request is rejected.
    #[must_use]
    pub fn new(secret: Option<&str>) -> Self {
        let digest = secret.map(|secret| Sha256::digest(secret.as_bytes()).as_slice().into());
        Self { digest }
    }

    fn is_configured(&self) -> bool {
        self.digest.is_some()
    }

    fn verify(&self, token: &str) -> bool {
        self.digest
            .as_deref()
            .is_some_and(|digest| Sha256::digest(token.as_bytes()).as_slice() == digest)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Rejection {
    #[error("Admin API is not enabled")]
    NotConfigured,

    #[error("Missing authorization header")]
    MissingAuthorizationHeader,

    #[error("Invalid authorization header")]
    InvalidAuthorizationHeader,

    #[error("Unauthorized")]
    WrongToken,
}

#[derive(Serialize)]
struct RejectionResponse {
    ok: bool,
    error: String,
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let sentry_event_id = record_error!(self, !);
        let response = RejectionResponse {
            ok: false,
            error: self.to_string(),
        };

        (StatusCode::UNAUTHORIZED, sentry_event_id, Json(response)).into_response()
    }
}

/// An extractor which checks the bearer token against the [`AdminSecret`].
///
/// It does not touch the storage, so handlers must place it before anything
/// acquiring a repository.
#[derive(Debug)]
pub struct AdminAuthorization;

impl<S> FromRequestParts<S> for AdminAuthorization
where
    S: Send + Sync,
    AdminSecret: FromRef<S>,
{
    type Rejection = Rejection;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let secret = AdminSecret::from_ref(state);
        if !secret.is_configured() {
            return Err(Rejection::NotConfigured);
        }

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|e| {
                    if e.is_missing() {
                        Rejection::MissingAuthorizationHeader
                    } else {
                        Rejection::InvalidAuthorizationHeader
                    }
                })?;

        if !secret.verify(bearer.token()) {
            return Err(Rejection::WrongToken);
        }

        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify() {
        let secret = AdminSecret::new(Some("hunter2"));
        assert!(secret.is_configured());
        assert!(secret.verify("hunter2"));
        assert!(!secret.verify("hunter3"));
        assert!(!secret.verify(""));

        let secret = AdminSecret::new(None);
        assert!(!secret.is_configured());
        assert!(!secret.verify("hunter2"));
        assert!(!secret.verify(""));
    }
}
