// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use proize_data_model::{
    DuplicateVerifications, OrphanedVerification, Verification, generate_id,
};
use rand::RngCore;

use super::{Faults, MemoryData, MemoryError};
use crate::{Clock, verification::VerificationRepository};

pub(super) struct MemoryVerificationRepository<'c> {
    data: &'c mut MemoryData,
    faults: &'c Faults,
}

impl<'c> MemoryVerificationRepository<'c> {
    pub(super) fn new(data: &'c mut MemoryData, faults: &'c Faults) -> Self {
        Self { data, faults }
    }
}

#[async_trait]
impl VerificationRepository for MemoryVerificationRepository<'_> {
    type Error = MemoryError;

    async fn lookup(&mut self, id: &str) -> Result<Option<Verification>, Self::Error> {
        Ok(self
            .data
            .verifications
            .iter()
            .find(|verification| verification.id == id)
            .cloned())
    }

    async fn add(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        identifier: String,
        value: String,
        expires_at: DateTime<Utc>,
    ) -> Result<Verification, Self::Error> {
        let created_at = clock.now();
        let verification = Verification {
            id: generate_id(clock, rng),
            identifier,
            value,
            expires_at,
            created_at,
            updated_at: created_at,
        };

        self.data.verifications.push(verification.clone());
        Ok(verification)
    }

    async fn count(&mut self) -> Result<usize, Self::Error> {
        Ok(self.data.verifications.len())
    }

    async fn find_duplicates(&mut self) -> Result<Vec<DuplicateVerifications>, Self::Error> {
        let mut groups: BTreeMap<&str, Vec<&Verification>> = BTreeMap::new();
        for verification in &self.data.verifications {
            groups
                .entry(verification.identifier.as_str())
                .or_default()
                .push(verification);
        }

        let duplicates = groups
            .into_iter()
            .filter_map(|(identifier, mut members)| {
                members.sort_by(|a, b| {
                    b.created_at
                        .cmp(&a.created_at)
                        .then_with(|| b.id.cmp(&a.id))
                });
                let ids = members.into_iter().map(|v| v.id.clone()).collect();
                DuplicateVerifications::new(identifier.to_owned(), ids)
            })
            .collect();

        Ok(duplicates)
    }

    async fn find_orphaned_email_verifications(
        &mut self,
    ) -> Result<Vec<OrphanedVerification>, Self::Error> {
        let emails: HashSet<String> = self
            .data
            .users
            .iter()
            .map(|user| user.email.to_lowercase())
            .collect();

        let mut orphans: Vec<OrphanedVerification> = self
            .data
            .verifications
            .iter()
            .filter_map(|verification| {
                let email = verification.email_target()?;
                if emails.contains(&email.to_lowercase()) {
                    return None;
                }

                Some(OrphanedVerification {
                    id: verification.id.clone(),
                    identifier: verification.identifier.clone(),
                    email: email.to_owned(),
                })
            })
            .collect();

        orphans.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(orphans)
    }

    async fn delete_by_ids(&mut self, ids: &[String]) -> Result<usize, Self::Error> {
        self.faults.check_verification_delete()?;

        let ids: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let before = self.data.verifications.len();
        self.data
            .verifications
            .retain(|verification| !ids.contains(verification.id.as_str()));

        Ok(before - self.data.verifications.len())
    }
}
