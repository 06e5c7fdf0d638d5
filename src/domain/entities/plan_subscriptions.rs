use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::{
    domain::{
        entities::plans::PlanEntity,
        errors::SubscriptionError,
        value_objects::{
            enums::subscription_statuses::SubscriptionStatus, period::Period,
            subscribables::SubscribableRef,
        },
    },
    infrastructure::postgres::schema::plan_subscriptions,
};

/// Builds a period from `plan`, letting an explicit interval or count override the plan's.
pub fn plan_period(
    plan: &PlanEntity,
    interval: Option<&str>,
    interval_count: Option<i32>,
    start: DateTime<Utc>,
) -> Result<Period, SubscriptionError> {
    let interval = interval
        .filter(|value| !value.is_empty())
        .unwrap_or(plan.interval.as_str());
    let interval_count = interval_count
        .filter(|count| *count > 0)
        .unwrap_or(plan.interval_count);

    Period::new(interval, interval_count, start)
}

/// A subscriber bound to a plan. Lifecycle state is derived from the timestamps.
#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = plan_subscriptions)]
pub struct PlanSubscriptionEntity {
    pub id: i64,
    pub subscribable_id: i64,
    pub subscribable_type: String,
    pub plan_id: i64,
    pub name: String,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub canceled_immediately: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlanSubscriptionEntity {
    pub fn subscribable(&self) -> SubscribableRef {
        SubscribableRef::new(self.subscribable_type.clone(), self.subscribable_id)
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        (!self.is_ended(now) || self.on_trial(now)) && !self.is_canceled_immediately()
    }

    pub fn on_trial(&self, now: DateTime<Utc>) -> bool {
        self.trial_ends_at.is_some_and(|trial_ends_at| now < trial_ends_at)
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled_at.is_some()
    }

    pub fn is_canceled_immediately(&self) -> bool {
        self.canceled_at.is_some() && self.canceled_immediately == Some(true)
    }

    /// A subscription without an end date has not been given a period yet and counts as ended.
    pub fn is_ended(&self, now: DateTime<Utc>) -> bool {
        self.ends_at.is_none_or(|ends_at| now >= ends_at)
    }

    /// Active, then canceled, then ended. `None` when none of them hold.
    pub fn status(&self, now: DateTime<Utc>) -> Option<SubscriptionStatus> {
        if self.is_active(now) {
            Some(SubscriptionStatus::Active)
        } else if self.is_canceled() {
            Some(SubscriptionStatus::Canceled)
        } else if self.is_ended(now) {
            Some(SubscriptionStatus::Ended)
        } else {
            None
        }
    }

    pub fn mark_canceled(&mut self, now: DateTime<Utc>, immediately: bool) {
        self.canceled_at = Some(now);
        if immediately {
            self.canceled_immediately = Some(true);
        }
    }

    pub fn apply_period(&mut self, period: &Period) {
        self.starts_at = Some(period.start_date());
        self.ends_at = Some(period.end_date());
    }

    pub fn set_new_period(
        &mut self,
        plan: &PlanEntity,
        interval: Option<&str>,
        interval_count: Option<i32>,
        start: DateTime<Utc>,
    ) -> Result<Period, SubscriptionError> {
        let period = plan_period(plan, interval, interval_count, start)?;
        self.apply_period(&period);
        Ok(period)
    }
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = plan_subscriptions)]
pub struct InsertPlanSubscriptionEntity {
    pub subscribable_id: i64,
    pub subscribable_type: String,
    pub plan_id: i64,
    pub name: String,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub canceled_immediately: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, AsChangeset)]
#[diesel(table_name = plan_subscriptions, treat_none_as_null = true)]
pub struct UpdatePlanSubscriptionEntity {
    pub plan_id: i64,
    pub name: String,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub canceled_immediately: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

impl UpdatePlanSubscriptionEntity {
    pub fn from_entity(entity: &PlanSubscriptionEntity, now: DateTime<Utc>) -> Self {
        Self {
            plan_id: entity.plan_id,
            name: entity.name.clone(),
            trial_ends_at: entity.trial_ends_at,
            starts_at: entity.starts_at,
            ends_at: entity.ends_at,
            canceled_at: entity.canceled_at,
            canceled_immediately: entity.canceled_immediately,
            updated_at: now,
        }
    }
}
