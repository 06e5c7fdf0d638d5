use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    entities::plan_subscriptions::{
        InsertPlanSubscriptionEntity, PlanSubscriptionEntity, UpdatePlanSubscriptionEntity,
    },
    value_objects::{subscribables::SubscribableRef, subscription_queries::PlanSubscriptionQuery},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlanSubscriptionRepository: Send + Sync {
    async fn insert(
        &self,
        subscription: InsertPlanSubscriptionEntity,
    ) -> Result<PlanSubscriptionEntity>;
    async fn find_by_id(&self, subscription_id: i64) -> Result<Option<PlanSubscriptionEntity>>;
    async fn update(
        &self,
        subscription_id: i64,
        changes: UpdatePlanSubscriptionEntity,
    ) -> Result<PlanSubscriptionEntity>;
    /// Deletes every usage row of the subscription and applies `changes` in one transaction.
    async fn renew(
        &self,
        subscription_id: i64,
        changes: UpdatePlanSubscriptionEntity,
    ) -> Result<PlanSubscriptionEntity>;
    /// Newest first.
    async fn list_by_subscribable(
        &self,
        owner: SubscribableRef,
    ) -> Result<Vec<PlanSubscriptionEntity>>;
    async fn find(
        &self,
        query: PlanSubscriptionQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<PlanSubscriptionEntity>>;
}
