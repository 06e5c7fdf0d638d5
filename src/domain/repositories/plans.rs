use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{
    entities::{plan_features::PlanFeatureEntity, plans::PlanEntity},
    value_objects::plans::{NewPlan, NewPlanFeature},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Inserts the plan and its features in one transaction.
    async fn create_plan(&self, plan: NewPlan, features: Vec<NewPlanFeature>) -> Result<PlanEntity>;
    async fn find_by_id(&self, plan_id: i64) -> Result<Option<PlanEntity>>;
    async fn list_plans(&self) -> Result<Vec<PlanEntity>>;
    /// Features of a plan ordered by `sort_order`.
    async fn list_features(&self, plan_id: i64) -> Result<Vec<PlanFeatureEntity>>;
}
