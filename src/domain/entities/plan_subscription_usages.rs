use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::infrastructure::postgres::schema::plan_subscription_usages;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = plan_subscription_usages)]
pub struct PlanSubscriptionUsageEntity {
    pub id: i64,
    pub subscription_id: i64,
    pub code: String,
    pub used: i32,
    pub valid_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlanSubscriptionUsageEntity {
    /// Rows without `valid_until` never expire.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.is_some_and(|valid_until| now >= valid_until)
    }
}

/// Insert-or-update payload keyed by `(subscription_id, code)`.
#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = plan_subscription_usages)]
pub struct UpsertPlanSubscriptionUsageEntity {
    pub subscription_id: i64,
    pub code: String,
    pub used: i32,
    pub valid_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UpsertPlanSubscriptionUsageEntity {
    pub fn fresh(subscription_id: i64, code: &str, now: DateTime<Utc>) -> Self {
        Self {
            subscription_id,
            code: code.to_string(),
            used: 0,
            valid_until: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn from_existing(usage: &PlanSubscriptionUsageEntity, now: DateTime<Utc>) -> Self {
        Self {
            subscription_id: usage.subscription_id,
            code: usage.code.clone(),
            used: usage.used,
            valid_until: usage.valid_until,
            created_at: usage.created_at,
            updated_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.is_some_and(|valid_until| now >= valid_until)
    }
}
