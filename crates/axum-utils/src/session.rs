// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Identification of the signed-in user
//!
//! Authentication happens in a reverse proxy in front of the service, which
//! forwards the ID of the signed-in user in a trusted header.

use std::convert::Infallible;

use axum::extract::{FromRef, FromRequestParts};
use http::{HeaderName, request::Parts};

/// Name of the header carrying the ID of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdHeader(HeaderName);

impl UserIdHeader {
    #[must_use]
    pub fn new(name: HeaderName) -> Self {
        Self(name)
    }

    #[must_use]
    pub fn name(&self) -> &HeaderName {
        &self.0
    }
}

/// The ID of the signed-in user, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUserId(pub Option<String>);

impl SessionUserId {
    #[must_use]
    pub fn into_inner(self) -> Option<String> {
        self.0
    }
}

impl<S> FromRequestParts<S> for SessionUserId
where
    S: Send + Sync,
    UserIdHeader: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = UserIdHeader::from_ref(state);
        let user_id = parts
            .headers
            .get(header.name())
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned);

        Ok(Self(user_id))
    }
}

#[cfg(test)]
mod tests {
    use http::Request;

    use super::*;

    #[derive(Clone)]
    struct State(UserIdHeader);

    impl FromRef<State> for UserIdHeader {
        fn from_ref(input: &State) -> Self {
            input.0.clone()
        }
    }

    async fn extract(request: Request<()>) -> SessionUserId {
        let state = State(UserIdHeader::new(HeaderName::from_static("x-user")));
        let (mut parts, ()) = request.into_parts();
        let Ok(user_id) = SessionUserId::from_request_parts(&mut parts, &state).await;
        user_id
    }

    #[tokio::test]
    async fn test_extract_user_id() {
        let request = Request::builder()
            .header("x-user", "user-alice-0001")
            .body(())
            .unwrap();
        assert_eq!(
            extract(request).await.into_inner().as_deref(),
            Some("user-alice-0001")
        );

        let request = Request::builder().header("x-user", "  ").body(()).unwrap();
        assert_eq!(extract(request).await, SessionUserId(None));

        let request = Request::builder()
            .header("x-other", "user-alice-0001")
            .body(())
            .unwrap();
        assert_eq!(extract(request).await, SessionUserId(None));
    }
}
