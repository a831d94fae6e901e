// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Reconciliation of the verification tokens table
//!
//! Two kinds of rows are removed: older tokens sharing their identifier with
//! a newer one, and email verification tokens whose target email belongs to
//! no user.

use proize_data_model::{DuplicateVerifications, OrphanedVerification};
use proize_storage::{BoxRepository, RepositoryAccess, RepositoryError, RepositoryTransaction};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

/// How a reconciliation run should behave
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Only report, never delete
    pub dry_run: bool,

    /// Required to actually delete when not in dry-run mode
    pub confirm: bool,
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("deletion requires confirmation")]
    ConfirmationRequired,

    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

/// Tokens sharing the same identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub identifier: String,

    /// The newest token, which survives
    pub keep: String,

    /// The older tokens, newest first
    pub delete: Vec<String>,
}

impl From<DuplicateVerifications> for DuplicateGroup {
    fn from(value: DuplicateVerifications) -> Self {
        Self {
            identifier: value.identifier().to_owned(),
            keep: value.keep().to_owned(),
            delete: value.redundant().to_vec(),
        }
    }
}

/// Number of rows actually removed by a confirmed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedCounts {
    pub deleted_dupes_count: usize,
    pub deleted_orphans_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub dry_run: bool,
    pub duplicates_count: usize,
    pub duplicates: Vec<DuplicateGroup>,
    pub orphaned_count: usize,
    pub orphaned_rows: Vec<OrphanedVerification>,

    /// Only set when rows were deleted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<DeletedCounts>,
}

impl ReconciliationReport {
    fn new(
        dry_run: bool,
        duplicates: Vec<DuplicateVerifications>,
        orphaned_rows: Vec<OrphanedVerification>,
    ) -> Self {
        let duplicates: Vec<DuplicateGroup> = duplicates.into_iter().map(Into::into).collect();
        Self {
            dry_run,
            duplicates_count: duplicates.len(),
            duplicates,
            orphaned_count: orphaned_rows.len(),
            orphaned_rows,
            deleted: None,
        }
    }
}

/// Detect duplicate and orphaned verification tokens, and delete them unless
/// running in dry-run mode.
///
/// The repository is consumed: it is saved after a confirmed deletion,
/// cancelled when nothing was deleted, and rolled back when dropped on a
/// storage error, so that either both sets of rows are deleted or none.
///
/// # Errors
///
/// Returns [`ReconcileError::ConfirmationRequired`] if not in dry-run mode
/// and `confirm` is not set. Nothing is touched in that case.
///
/// Returns [`ReconcileError::Storage`] if the underlying repository fails
#[tracing::instrument(
    name = "task.reconcile_verifications",
    skip_all,
    fields(
        reconcile.dry_run = options.dry_run,
        reconcile.confirm = options.confirm,
    ),
    err,
)]
pub async fn reconcile(
    mut repo: BoxRepository,
    options: ReconcileOptions,
) -> Result<ReconciliationReport, ReconcileError> {
    if !options.dry_run && !options.confirm {
        repo.cancel().await?;
        return Err(ReconcileError::ConfirmationRequired);
    }

    let duplicates = repo.verification().find_duplicates().await?;
    let orphans = repo
        .verification()
        .find_orphaned_email_verifications()
        .await?;

    let mut report = ReconciliationReport::new(options.dry_run, duplicates, orphans);

    if options.dry_run {
        repo.cancel().await?;
        info!(
            duplicates = report.duplicates_count,
            orphans = report.orphaned_count,
            "dry run, nothing deleted"
        );
        return Ok(report);
    }

    let duplicate_ids: Vec<String> = report
        .duplicates
        .iter()
        .flat_map(|group| group.delete.iter().cloned())
        .collect();
    let orphan_ids: Vec<String> = report
        .orphaned_rows
        .iter()
        .map(|row| row.id.clone())
        .collect();

    let deleted_dupes_count = repo.verification().delete_by_ids(&duplicate_ids).await?;
    // Ids already removed as duplicates are skipped by the storage, not counted
    let deleted_orphans_count = repo.verification().delete_by_ids(&orphan_ids).await?;

    repo.save().await?;

    if deleted_dupes_count == 0 && deleted_orphans_count == 0 {
        debug!("no verification tokens to clean up");
    } else {
        info!(
            deleted_dupes_count,
            deleted_orphans_count, "cleaned up verification tokens"
        );
    }

    report.deleted = Some(DeletedCounts {
        deleted_dupes_count,
        deleted_orphans_count,
    });

    Ok(report)
}
