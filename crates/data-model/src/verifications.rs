// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

/// Pattern matched by the identifiers of email verification tokens.
///
/// The first capture group is the target email address. The same pattern is
/// used by the database backends, so it must stay compatible with POSIX
/// regular expressions as understood by PostgreSQL.
pub const EMAIL_VERIFICATION_IDENTIFIER_PATTERN: &str =
    r"^email-verification(?:-otp)?-([^@\s]+@[^@\s]+)$";

static EMAIL_VERIFICATION_IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(EMAIL_VERIFICATION_IDENTIFIER_PATTERN).unwrap()
});

/// Extract the target email address out of an email verification identifier.
///
/// Returns `None` if the identifier is not one of an email verification
/// token.
#[must_use]
pub fn email_verification_target(identifier: &str) -> Option<&str> {
    EMAIL_VERIFICATION_IDENTIFIER
        .captures(identifier)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

/// A pending proof-of-possession token, like an email verification code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub id: String,

    /// Composite key encoding the purpose and the target of the token. It is
    /// not unique in the storage schema.
    pub identifier: String,

    #[serde(skip)]
    pub value: String,

    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Verification {
    /// The email this token verifies, if it is an email verification token
    #[must_use]
    pub fn email_target(&self) -> Option<&str> {
        email_verification_target(&self.identifier)
    }
}

/// A set of [`Verification`] sharing the same identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateVerifications {
    identifier: String,

    /// IDs of the verifications, newest first
    ids: Vec<String>,
}

impl DuplicateVerifications {
    /// Build a group out of the IDs of verifications sharing the given
    /// identifier, ordered from the newest to the oldest.
    ///
    /// Returns `None` if there are less than two IDs, as this would not be a
    /// duplicate.
    #[must_use]
    pub fn new(identifier: String, ids: Vec<String>) -> Option<Self> {
        if ids.len() < 2 {
            return None;
        }

        Some(Self { identifier, ids })
    }

    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The ID of the newest verification, which should be kept
    #[must_use]
    pub fn keep(&self) -> &str {
        &self.ids[0]
    }

    /// The IDs of the older verifications, which are redundant
    #[must_use]
    pub fn redundant(&self) -> &[String] {
        &self.ids[1..]
    }
}

/// An email verification token whose target email has no matching user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanedVerification {
    pub id: String,
    pub identifier: String,
    pub email: String,
}
