// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::UnknownVariantError;

/// The subscription tier attached to a [`Space`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpaceTier {
    #[default]
    Hobby,
    Pro,
}

impl SpaceTier {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hobby => "hobby",
            Self::Pro => "pro",
        }
    }

    #[must_use]
    pub const fn is_pro(self) -> bool {
        matches!(self, Self::Pro)
    }
}

impl Display for SpaceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpaceTier {
    type Err = UnknownVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hobby" => Ok(Self::Hobby),
            "pro" => Ok(Self::Pro),
            other => Err(UnknownVariantError::new("space tier", other)),
        }
    }
}

/// A space is the unit the application attaches a subscription tier to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Space {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub tier: SpaceTier,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpaceMemberRole {
    Admin,
    Member,
}

impl SpaceMemberRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Member => "MEMBER",
        }
    }
}

impl Display for SpaceMemberRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpaceMemberRole {
    type Err = UnknownVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Self::Admin),
            "MEMBER" => Ok(Self::Member),
            other => Err(UnknownVariantError::new("space member role", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpaceMember {
    pub id: String,
    pub space_id: String,
    pub user_id: String,
    pub role: SpaceMemberRole,
    pub last_selected_at: Option<DateTime<Utc>>,
}
