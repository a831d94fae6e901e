// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Grant of the pro entitlement to every user of a self-hosted deployment

use chrono::Datelike;
use proize_data_model::{CardDetails, SpaceMemberRole, SpaceTier, User};
use proize_storage::{
    BoxRepository, Clock, RepositoryAccess, RepositoryError, RepositoryFactory,
    RepositoryTransaction, billing::SubscriptionPlan,
};
use rand::RngCore;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

const PERSONAL_SPACE_NAME: &str = "Personal";
const DEFAULT_CARD_NAME: &str = "Default Card";

#[derive(Debug, Error)]
pub enum GrantError {
    #[error("failed to list users")]
    ListUsers(#[source] RepositoryError),

    #[error("failed to grant the entitlement to user {user_id}")]
    User {
        user_id: String,
        #[source]
        source: RepositoryError,
    },
}

/// Counters of what a grant run did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantSummary {
    pub users_processed: usize,
    pub subscriptions_created: usize,
    pub subscriptions_skipped: usize,
    pub payment_methods_created: usize,
    pub payment_methods_skipped: usize,
}

enum Outcome {
    AlreadyEntitled,
    Granted { payment_method_created: bool },
}

/// Give the pro tier, a subscription to the given plan and a payment method
/// to every user which doesn't have an active entitlement yet.
///
/// Every user is processed in a transaction of its own. Users processed
/// before a failure stay committed, and are skipped when running again.
///
/// # Errors
///
/// Returns an error if the underlying repository fails
#[tracing::instrument(name = "task.grant_pro_to_all_users", skip_all, err)]
pub async fn grant_pro_to_all_users<F>(
    factory: &F,
    clock: &dyn Clock,
    rng: &mut (dyn RngCore + Send),
    plan: &SubscriptionPlan,
) -> Result<GrantSummary, GrantError>
where
    F: RepositoryFactory + Sync + ?Sized,
{
    let users = list_users(factory).await.map_err(GrantError::ListUsers)?;

    let mut summary = GrantSummary {
        users_processed: users.len(),
        ..GrantSummary::default()
    };

    for user in users {
        let outcome = async {
            let mut repo = factory.create().await?;
            let outcome = grant_to_user(&mut repo, clock, &mut *rng, plan, &user).await?;
            repo.save().await?;
            Ok::<_, RepositoryError>(outcome)
        }
        .await
        .map_err(|source| GrantError::User {
            user_id: user.id.clone(),
            source,
        })?;

        match outcome {
            Outcome::AlreadyEntitled => summary.subscriptions_skipped += 1,
            Outcome::Granted {
                payment_method_created,
            } => {
                summary.subscriptions_created += 1;
                if payment_method_created {
                    summary.payment_methods_created += 1;
                } else {
                    summary.payment_methods_skipped += 1;
                }
            }
        }
    }

    info!(
        users_processed = summary.users_processed,
        subscriptions_created = summary.subscriptions_created,
        subscriptions_skipped = summary.subscriptions_skipped,
        payment_methods_created = summary.payment_methods_created,
        payment_methods_skipped = summary.payment_methods_skipped,
        "granted the pro entitlement"
    );

    Ok(summary)
}

async fn list_users<F>(factory: &F) -> Result<Vec<User>, RepositoryError>
where
    F: RepositoryFactory + Sync + ?Sized,
{
    let mut repo = factory.create().await?;
    let users = repo.user().all().await?;
    repo.cancel().await?;
    Ok(users)
}

#[tracing::instrument(
    name = "task.grant_pro_to_user",
    skip_all,
    fields(user.id = %user.id),
)]
async fn grant_to_user(
    repo: &mut BoxRepository,
    clock: &dyn Clock,
    rng: &mut (dyn RngCore + Send),
    plan: &SubscriptionPlan,
    user: &User,
) -> Result<Outcome, RepositoryError> {
    let space = if let Some(space) = repo.space().find_first_owned_by(user).await? {
        space
    } else {
        let space = repo
            .space()
            .add(rng, clock, user, PERSONAL_SPACE_NAME.to_owned())
            .await?;
        repo.space()
            .add_member(rng, clock, &space, user, SpaceMemberRole::Admin)
            .await?;
        debug!(space.id = %space.id, "created a personal space");
        space
    };

    if space.tier.is_pro() {
        debug!(space.id = %space.id, "space is already pro");
        return Ok(Outcome::AlreadyEntitled);
    }

    let existing = repo.subscription().find_for_space(&space).await?;
    if existing.is_some_and(|subscription| subscription.is_active()) {
        debug!(space.id = %space.id, "space already has an active subscription");
        return Ok(Outcome::AlreadyEntitled);
    }

    let space = repo.space().set_tier(space, SpaceTier::Pro).await?;
    let subscription = repo
        .subscription()
        .add(rng, clock, user, &space, plan)
        .await?;
    info!(
        user.email = %user.email,
        space.id = %space.id,
        subscription.id = %subscription.id,
        "created subscription"
    );

    let payment_methods = repo.payment_method().list_for_user(user).await?;
    if !payment_methods.is_empty() {
        return Ok(Outcome::Granted {
            payment_method_created: false,
        });
    }

    let card = CardDetails {
        brand: "visa".to_owned(),
        last4: format!("{:04}", rng.next_u32() % 10_000),
        exp_month: 12,
        exp_year: clock.now().year() + 5,
        name: user
            .name
            .clone()
            .unwrap_or_else(|| DEFAULT_CARD_NAME.to_owned()),
    };
    repo.payment_method()
        .add_card(rng, clock, user, card)
        .await?;

    Ok(Outcome::Granted {
        payment_method_created: true,
    })
}
