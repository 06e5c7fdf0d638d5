use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::{
    domain::{
        errors::SubscriptionError,
        value_objects::{enums::intervals::Interval, plans::NewPlan},
    },
    infrastructure::postgres::schema::plans,
};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = plans)]
pub struct PlanEntity {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price_minor: i32,
    pub interval: String,
    pub interval_count: i32,
    pub trial_period_days: Option<i32>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlanEntity {
    pub fn interval(&self) -> Result<Interval, SubscriptionError> {
        Interval::from_str(&self.interval)
    }

    pub fn is_free(&self) -> bool {
        self.price_minor <= 0
    }

    pub fn has_trial(&self) -> bool {
        self.trial_period_days.is_some_and(|days| days > 0)
    }

    pub fn interval_description(&self) -> Result<String, SubscriptionError> {
        Ok(self.interval()?.description(self.interval_count))
    }

    /// Two plans bill on the same cadence when interval and count both match.
    pub fn same_billing_cycle(&self, other: &PlanEntity) -> bool {
        self.interval == other.interval && self.interval_count == other.interval_count
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = plans)]
pub struct InsertPlanEntity {
    pub name: String,
    pub description: Option<String>,
    pub price_minor: i32,
    pub interval: String,
    pub interval_count: i32,
    pub trial_period_days: Option<i32>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InsertPlanEntity {
    pub fn new(plan: NewPlan, now: DateTime<Utc>) -> Self {
        Self {
            name: plan.name,
            description: plan.description,
            price_minor: plan.price_minor.max(0),
            interval: plan.interval.as_str().to_string(),
            interval_count: plan.interval_count.max(1),
            trial_period_days: plan.trial_period_days,
            sort_order: plan.sort_order,
            created_at: now,
            updated_at: now,
        }
    }
}
