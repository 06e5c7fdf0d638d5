use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::{
    domain::{errors::SubscriptionError, value_objects::plans::NewPlanFeature},
    infrastructure::postgres::schema::plan_features,
};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = plan_features)]
pub struct PlanFeatureEntity {
    pub id: i64,
    pub plan_id: i64,
    pub code: String,
    pub value: String,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = plan_features)]
pub struct InsertPlanFeatureEntity {
    pub plan_id: i64,
    pub code: String,
    pub value: String,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InsertPlanFeatureEntity {
    pub fn new(plan_id: i64, feature: NewPlanFeature, now: DateTime<Utc>) -> Self {
        Self {
            plan_id,
            code: feature.code,
            value: feature.value,
            sort_order: feature.sort_order,
            created_at: now,
            updated_at: now,
        }
    }
}

/// First feature of a plan carrying `code`.
pub fn feature_by_code<'a>(
    features: &'a [PlanFeatureEntity],
    code: &str,
) -> Result<&'a PlanFeatureEntity, SubscriptionError> {
    features
        .iter()
        .find(|feature| feature.code == code)
        .ok_or_else(|| SubscriptionError::InvalidPlanFeature(code.to_string()))
}
