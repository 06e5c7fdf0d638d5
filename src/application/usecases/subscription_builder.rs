use anyhow::Context;
use chrono::{DateTime, Days, Utc};
use tracing::debug;

use crate::{
    application::usecases::plan_subscriptions::PlanSubscriptionUseCase,
    domain::{
        entities::{
            plan_subscriptions::{InsertPlanSubscriptionEntity, PlanSubscriptionEntity},
            plans::PlanEntity,
        },
        errors::UseCaseResult,
        repositories::{
            plan_subscription_usages::PlanSubscriptionUsageRepository,
            plan_subscriptions::PlanSubscriptionRepository, plans::PlanRepository,
            subscription_events::SubscriptionEventSink,
        },
        value_objects::subscribables::SubscribableRef,
    },
};

/// Collects trial and start options for a new subscription before it is persisted.
pub struct SubscriptionBuilder<'a, P, S, U, E>
where
    P: PlanRepository + 'static,
    S: PlanSubscriptionRepository + 'static,
    U: PlanSubscriptionUsageRepository + 'static,
    E: SubscriptionEventSink + 'static,
{
    use_case: &'a PlanSubscriptionUseCase<P, S, U, E>,
    owner: SubscribableRef,
    name: String,
    plan: PlanEntity,
    trial_days: Option<i32>,
    trial_ends_at: Option<DateTime<Utc>>,
    skip_trial: bool,
    starting_at: Option<DateTime<Utc>>,
}

impl<'a, P, S, U, E> SubscriptionBuilder<'a, P, S, U, E>
where
    P: PlanRepository + 'static,
    S: PlanSubscriptionRepository + 'static,
    U: PlanSubscriptionUsageRepository + 'static,
    E: SubscriptionEventSink + 'static,
{
    pub(crate) fn new(
        use_case: &'a PlanSubscriptionUseCase<P, S, U, E>,
        owner: SubscribableRef,
        name: String,
        plan: PlanEntity,
    ) -> Self {
        Self {
            use_case,
            owner,
            name,
            plan,
            trial_days: None,
            trial_ends_at: None,
            skip_trial: false,
            starting_at: None,
        }
    }

    /// Overrides the plan's trial length. Zero or less falls back to the plan.
    pub fn trial_days(mut self, days: i32) -> Self {
        self.trial_days = Some(days);
        self
    }

    /// Sets the trial end outright. Wins over `trial_days`, `skip_trial` and the plan.
    pub fn trial_ends_at(mut self, trial_ends_at: DateTime<Utc>) -> Self {
        self.trial_ends_at = Some(trial_ends_at);
        self
    }

    pub fn skip_trial(mut self) -> Self {
        self.skip_trial = true;
        self
    }

    pub fn starting_at(mut self, start: DateTime<Utc>) -> Self {
        self.starting_at = Some(start);
        self
    }

    pub fn resolve_trial_ends_at(
        &self,
        now: DateTime<Utc>,
    ) -> UseCaseResult<Option<DateTime<Utc>>> {
        if self.trial_ends_at.is_some() {
            return Ok(self.trial_ends_at);
        }
        if self.skip_trial {
            return Ok(None);
        }

        let Some(days) = self
            .trial_days
            .filter(|days| *days > 0)
            .or(self.plan.trial_period_days.filter(|days| *days > 0))
        else {
            return Ok(None);
        };

        let trial_ends_at = now
            .checked_add_days(Days::new(u64::from(days.unsigned_abs())))
            .context("failed to compute trial end date")?;
        Ok(Some(trial_ends_at))
    }

    /// The row that `create` would insert, before the period is filled in.
    pub fn build(&self, now: DateTime<Utc>) -> UseCaseResult<InsertPlanSubscriptionEntity> {
        Ok(InsertPlanSubscriptionEntity {
            subscribable_id: self.owner.subscribable_id,
            subscribable_type: self.owner.subscribable_type.clone(),
            plan_id: self.plan.id,
            name: self.name.clone(),
            trial_ends_at: self.resolve_trial_ends_at(now)?,
            starts_at: self.starting_at,
            ends_at: None,
            canceled_at: None,
            canceled_immediately: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn create(self) -> UseCaseResult<PlanSubscriptionEntity> {
        let now = self.use_case.clock().now();
        let subscription = self.build(now)?;

        debug!(
            owner = %self.owner,
            plan_id = self.plan.id,
            trial_ends_at = ?subscription.trial_ends_at,
            "plan_subscriptions: building subscription"
        );

        self.use_case.create(subscription, &self.plan).await
    }
}
