// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeader;
use headers::ContentType;

use crate::record_error;

/// An unexpected error, rendered as a plain text internal server error
#[derive(Debug)]
pub struct InternalError {
    error: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl<E> From<E> for InternalError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self {
            error: Box::new(error),
        }
    }
}

impl IntoResponse for InternalError {
    fn into_response(self) -> Response {
        let event_id = record_error!(*self.error);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            TypedHeader(ContentType::text()),
            event_id,
            self.error.to_string(),
        )
            .into_response()
    }
}
