// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Maintenance routines operating on the storage layer
//!
//! Each routine takes its repositories as arguments, so that it can be run
//! from an HTTP handler as well as from the command line.

mod entitlements;
mod verifications;

pub use self::{
    entitlements::{GrantError, GrantSummary, grant_pro_to_all_users},
    verifications::{
        DeletedCounts, DuplicateGroup, ReconcileError, ReconcileOptions, ReconciliationReport,
        reconcile,
    },
};
