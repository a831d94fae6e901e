// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use async_trait::async_trait;
use proize_data_model::{User, generate_id};
use rand::RngCore;

use super::{MemoryData, MemoryError};
use crate::{Clock, user::UserRepository};

pub(super) struct MemoryUserRepository<'c> {
    data: &'c mut MemoryData,
}

impl<'c> MemoryUserRepository<'c> {
    pub(super) fn new(data: &'c mut MemoryData) -> Self {
        Self { data }
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository<'_> {
    type Error = MemoryError;

    async fn lookup(&mut self, id: &str) -> Result<Option<User>, Self::Error> {
        Ok(self.data.users.iter().find(|user| user.id == id).cloned())
    }

    async fn all(&mut self) -> Result<Vec<User>, Self::Error> {
        let mut users = self.data.users.clone();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }

    async fn add(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        name: Option<String>,
        email: String,
    ) -> Result<User, Self::Error> {
        let user = User {
            id: generate_id(clock, rng),
            name,
            email,
            customer_id: None,
            created_at: clock.now(),
        };

        self.data.users.push(user.clone());
        Ok(user)
    }

    async fn set_customer_id(
        &mut self,
        mut user: User,
        customer_id: String,
    ) -> Result<User, Self::Error> {
        let row = self
            .data
            .users
            .iter_mut()
            .find(|row| row.id == user.id)
            .ok_or_else(|| MemoryError::RowNotFound {
                table: "users",
                id: user.id.clone(),
            })?;

        row.customer_id = Some(customer_id.clone());
        user.customer_id = Some(customer_id);
        Ok(user)
    }
}
