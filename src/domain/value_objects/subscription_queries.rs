use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    entities::plan_subscriptions::PlanSubscriptionEntity,
    value_objects::subscribables::SubscribableRef,
};

/// Look-ahead used by the "ending" scopes when the caller has no preference.
pub const DEFAULT_DAY_RANGE: i64 = 3;

/// One read-side filter over subscription timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SubscriptionScope {
    BySubscribable(SubscribableRef),
    Named(String),
    /// Trial ends within `[now, now + days]`.
    EndingTrial { days: i64 },
    EndedTrial,
    /// Period ends within `[now, now + days]`.
    EndingPeriod { days: i64 },
    EndedPeriod,
    ExcludeCanceled,
    ExcludeImmediatelyCanceled,
}

impl SubscriptionScope {
    pub fn matches(&self, subscription: &PlanSubscriptionEntity, now: DateTime<Utc>) -> bool {
        match self {
            SubscriptionScope::BySubscribable(owner) => {
                subscription.subscribable_type == owner.subscribable_type
                    && subscription.subscribable_id == owner.subscribable_id
            }
            SubscriptionScope::Named(name) => subscription.name == *name,
            SubscriptionScope::EndingTrial { days } => {
                within(subscription.trial_ends_at, now, day_range_end(now, *days))
            }
            SubscriptionScope::EndedTrial => subscription.trial_ends_at.is_some_and(|at| at <= now),
            SubscriptionScope::EndingPeriod { days } => {
                within(subscription.ends_at, now, day_range_end(now, *days))
            }
            SubscriptionScope::EndedPeriod => subscription.ends_at.is_some_and(|at| at <= now),
            SubscriptionScope::ExcludeCanceled => subscription.canceled_at.is_none(),
            SubscriptionScope::ExcludeImmediatelyCanceled => {
                subscription.canceled_immediately != Some(true)
            }
        }
    }
}

/// `now` shifted by `days`, pinned to the representable range instead of overflowing.
pub fn day_range_end(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    TimeDelta::try_days(days)
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(if days < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
}

fn within(value: Option<DateTime<Utc>>, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
    value.is_some_and(|at| at >= from && at <= to)
}

/// Conjunction of scopes, built fluently and evaluated against a caller-supplied "now".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanSubscriptionQuery {
    scopes: Vec<SubscriptionScope>,
}

impl PlanSubscriptionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope(mut self, scope: SubscriptionScope) -> Self {
        self.scopes.push(scope);
        self
    }

    pub fn by_subscribable(self, owner: SubscribableRef) -> Self {
        self.scope(SubscriptionScope::BySubscribable(owner))
    }

    pub fn named(self, name: impl Into<String>) -> Self {
        self.scope(SubscriptionScope::Named(name.into()))
    }

    pub fn ending_trial(self, days: i64) -> Self {
        self.scope(SubscriptionScope::EndingTrial { days })
    }

    pub fn ended_trial(self) -> Self {
        self.scope(SubscriptionScope::EndedTrial)
    }

    pub fn ending_period(self, days: i64) -> Self {
        self.scope(SubscriptionScope::EndingPeriod { days })
    }

    pub fn ended_period(self) -> Self {
        self.scope(SubscriptionScope::EndedPeriod)
    }

    pub fn exclude_canceled(self) -> Self {
        self.scope(SubscriptionScope::ExcludeCanceled)
    }

    pub fn exclude_immediately_canceled(self) -> Self {
        self.scope(SubscriptionScope::ExcludeImmediatelyCanceled)
    }

    pub fn scopes(&self) -> &[SubscriptionScope] {
        &self.scopes
    }

    pub fn matches(&self, subscription: &PlanSubscriptionEntity, now: DateTime<Utc>) -> bool {
        self.scopes.iter().all(|scope| scope.matches(subscription, now))
    }
}
