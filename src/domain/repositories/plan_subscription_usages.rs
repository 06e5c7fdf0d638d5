use anyhow::Result;
use async_trait::async_trait;

use crate::domain::entities::plan_subscription_usages::{
    PlanSubscriptionUsageEntity, UpsertPlanSubscriptionUsageEntity,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlanSubscriptionUsageRepository: Send + Sync {
    async fn find_by_code(
        &self,
        subscription_id: i64,
        code: &str,
    ) -> Result<Option<PlanSubscriptionUsageEntity>>;
    async fn list_by_subscription(
        &self,
        subscription_id: i64,
    ) -> Result<Vec<PlanSubscriptionUsageEntity>>;
    /// Inserts or updates the row keyed by `(subscription_id, code)`.
    async fn save(
        &self,
        usage: UpsertPlanSubscriptionUsageEntity,
    ) -> Result<PlanSubscriptionUsageEntity>;
    /// Returns the number of deleted rows.
    async fn clear(&self, subscription_id: i64) -> Result<usize>;
}
