// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// An account of the scheduling application.
///
/// Users are owned by the authentication subsystem. The maintenance routines
/// only read them, apart from recording the payment provider customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Returns `true` if the user email matches the given address, ignoring
    /// case.
    #[must_use]
    pub fn has_email(&self, email: &str) -> bool {
        self.email.to_lowercase() == email.to_lowercase()
    }

    /// The first eight characters of the user ID, used to suffix the IDs of
    /// billing records created on behalf of the user.
    #[must_use]
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(8) {
            Some((index, _)) => &self.id[..index],
            None => &self.id,
        }
    }
}

impl User {
    #[doc(hidden)]
    #[must_use]
    pub fn samples(now: DateTime<Utc>) -> Vec<Self> {
        vec![
            User {
                id: "user-alice-0001".to_owned(),
                name: Some("Alice".to_owned()),
                email: "alice@example.com".to_owned(),
                customer_id: None,
                created_at: now,
            },
            User {
                id: "user-bob-0002".to_owned(),
                name: None,
                email: "Bob@Example.com".to_owned(),
                customer_id: Some("cus_bob".to_owned()),
                created_at: now,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::User;

    #[test]
    fn test_email_comparison_ignores_case() {
        let users = User::samples(Utc::now());
        assert!(users[0].has_email("ALICE@example.com"));
        assert!(users[1].has_email("bob@example.com"));
        assert!(!users[1].has_email("bobby@example.com"));
    }

    #[test]
    fn test_short_id() {
        let users = User::samples(Utc::now());
        assert_eq!(users[0].short_id(), "user-ali");

        let user = User {
            id: "abc".to_owned(),
            ..users[0].clone()
        };
        assert_eq!(user.short_id(), "abc");
    }
}
