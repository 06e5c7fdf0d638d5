use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::domain::{
    entities::{
        plan_subscription_usages::{PlanSubscriptionUsageEntity, UpsertPlanSubscriptionUsageEntity},
        plan_subscriptions::PlanSubscriptionEntity,
    },
    errors::{SubscriptionError, UseCaseResult},
    repositories::plan_subscription_usages::PlanSubscriptionUsageRepository,
    value_objects::{clock::Clock, features::FeatureCatalog},
};

/// Records, reduces and clears feature usage for one subscription.
pub struct SubscriptionUsageManager<U>
where
    U: PlanSubscriptionUsageRepository + 'static,
{
    subscription: PlanSubscriptionEntity,
    usage_repo: Arc<U>,
    catalog: Arc<FeatureCatalog>,
    clock: Arc<dyn Clock>,
}

impl<U> SubscriptionUsageManager<U>
where
    U: PlanSubscriptionUsageRepository + 'static,
{
    pub fn new(
        subscription: PlanSubscriptionEntity,
        usage_repo: Arc<U>,
        catalog: Arc<FeatureCatalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            subscription,
            usage_repo,
            catalog,
            clock,
        }
    }

    pub fn subscription(&self) -> &PlanSubscriptionEntity {
        &self.subscription
    }

    /// Adds `uses` to the counter (or overwrites it when `incremental` is false).
    ///
    /// Resettable features get their first `valid_until` anchored to the subscription's
    /// creation date; an expired row rolls forward one reset window from its previous
    /// `valid_until` and starts again from zero.
    pub async fn record(
        &self,
        code: &str,
        uses: i32,
        incremental: bool,
    ) -> UseCaseResult<PlanSubscriptionUsageEntity> {
        let subscription_id = self.subscription.id;
        let feature = self.catalog.feature(code).inspect_err(|_| {
            warn!(subscription_id, code, "subscription_usage: unknown feature code");
        })?;
        let now = self.clock.now();

        let existing = self
            .usage_repo
            .find_by_code(subscription_id, feature.code())
            .await
            .map_err(|err| {
                error!(
                    subscription_id,
                    code,
                    db_error = ?err,
                    "subscription_usage: failed to load usage"
                );
                SubscriptionError::Internal(err)
            })?;

        let mut usage = match existing.as_ref() {
            Some(existing) => UpsertPlanSubscriptionUsageEntity::from_existing(existing, now),
            None => UpsertPlanSubscriptionUsageEntity::fresh(subscription_id, feature.code(), now),
        };

        if feature.is_resettable() {
            match usage.valid_until {
                None => {
                    usage.valid_until = feature.reset_date(self.subscription.created_at)?;
                }
                Some(valid_until) if usage.is_expired(now) => {
                    usage.valid_until = feature.reset_date(valid_until)?;
                    usage.used = 0;
                    debug!(
                        subscription_id,
                        code,
                        valid_until = ?usage.valid_until,
                        "subscription_usage: usage window rolled over"
                    );
                }
                Some(_) => {}
            }
        }

        usage.used = if incremental {
            usage.used.saturating_add(uses)
        } else {
            uses
        }
        .max(0);

        let saved = self.usage_repo.save(usage).await.map_err(|err| {
            error!(
                subscription_id,
                code,
                db_error = ?err,
                "subscription_usage: failed to save usage"
            );
            SubscriptionError::Internal(err)
        })?;

        info!(
            subscription_id,
            code,
            used = saved.used,
            "subscription_usage: usage recorded"
        );
        Ok(saved)
    }

    /// Subtracts `uses`, flooring at zero. `Ok(None)` when nothing was recorded yet.
    pub async fn reduce(
        &self,
        code: &str,
        uses: i32,
    ) -> UseCaseResult<Option<PlanSubscriptionUsageEntity>> {
        let subscription_id = self.subscription.id;
        let feature = self.catalog.feature(code)?;
        let now = self.clock.now();

        let Some(existing) = self
            .usage_repo
            .find_by_code(subscription_id, feature.code())
            .await
            .map_err(|err| {
                error!(
                    subscription_id,
                    code,
                    db_error = ?err,
                    "subscription_usage: failed to load usage"
                );
                SubscriptionError::Internal(err)
            })?
        else {
            warn!(subscription_id, code, "subscription_usage: nothing to reduce");
            return Ok(None);
        };

        let mut usage = UpsertPlanSubscriptionUsageEntity::from_existing(&existing, now);
        usage.used = usage.used.saturating_sub(uses).max(0);

        let saved = self.usage_repo.save(usage).await.map_err(|err| {
            error!(
                subscription_id,
                code,
                db_error = ?err,
                "subscription_usage: failed to save usage"
            );
            SubscriptionError::Internal(err)
        })?;

        Ok(Some(saved))
    }

    pub async fn clear(&self) -> UseCaseResult<usize> {
        let subscription_id = self.subscription.id;
        let deleted = self
            .usage_repo
            .clear(subscription_id)
            .await
            .map_err(|err| {
                error!(
                    subscription_id,
                    db_error = ?err,
                    "subscription_usage: failed to clear usage"
                );
                SubscriptionError::Internal(err)
            })?;

        info!(subscription_id, deleted, "subscription_usage: usage cleared");
        Ok(deleted)
    }
}
