use std::sync::Arc;

use tracing::debug;

use crate::{
    application::usecases::{
        plan_subscriptions::PlanSubscriptionUseCase, subscription_ability::SubscriptionAbility,
        subscription_builder::SubscriptionBuilder, subscription_usage::SubscriptionUsageManager,
    },
    domain::{
        entities::{plan_subscriptions::PlanSubscriptionEntity, plans::PlanEntity},
        errors::UseCaseResult,
        repositories::{
            plan_subscription_usages::PlanSubscriptionUsageRepository,
            plan_subscriptions::PlanSubscriptionRepository, plans::PlanRepository,
            subscription_events::SubscriptionEventSink,
        },
        value_objects::subscribables::SubscribableRef,
    },
};

/// Subscription lookups from the point of view of the owning entity.
pub struct SubscriberUseCase<P, S, U, E>
where
    P: PlanRepository + 'static,
    S: PlanSubscriptionRepository + 'static,
    U: PlanSubscriptionUsageRepository + 'static,
    E: SubscriptionEventSink + 'static,
{
    subscriptions: Arc<PlanSubscriptionUseCase<P, S, U, E>>,
}

impl<P, S, U, E> SubscriberUseCase<P, S, U, E>
where
    P: PlanRepository + 'static,
    S: PlanSubscriptionRepository + 'static,
    U: PlanSubscriptionUsageRepository + 'static,
    E: SubscriptionEventSink + 'static,
{
    pub fn new(subscriptions: Arc<PlanSubscriptionUseCase<P, S, U, E>>) -> Self {
        Self { subscriptions }
    }

    /// The most recently created subscription of `owner` with that name.
    pub async fn subscription(
        &self,
        owner: &SubscribableRef,
        name: &str,
    ) -> UseCaseResult<Option<PlanSubscriptionEntity>> {
        let found = self
            .subscriptions
            .list_for(owner.clone())
            .await?
            .into_iter()
            .filter(|subscription| subscription.name == name)
            .max_by_key(|subscription| (subscription.created_at, subscription.id));

        debug!(
            %owner,
            name,
            subscription_id = ?found.as_ref().map(|subscription| subscription.id),
            "subscribers: resolved subscription"
        );

        Ok(found)
    }

    /// Same as `subscription` using the configured default name.
    pub async fn default_subscription(
        &self,
        owner: &SubscribableRef,
    ) -> UseCaseResult<Option<PlanSubscriptionEntity>> {
        let name = self.subscriptions.settings().default_subscription_name.clone();
        self.subscription(owner, &name).await
    }

    /// True when the named subscription exists and is active. A given `plan_id` must also match.
    pub async fn subscribed(
        &self,
        owner: &SubscribableRef,
        name: &str,
        plan_id: Option<i64>,
    ) -> UseCaseResult<bool> {
        let now = self.subscriptions.clock().now();

        Ok(self
            .subscription(owner, name)
            .await?
            .is_some_and(|subscription| {
                subscription.is_active(now) && plan_id.is_none_or(|id| subscription.plan_id == id)
            }))
    }

    pub fn new_subscription(
        &self,
        owner: SubscribableRef,
        name: impl Into<String>,
        plan: &PlanEntity,
    ) -> SubscriptionBuilder<'_, P, S, U, E> {
        self.subscriptions.new_subscription(owner, name, plan)
    }

    pub async fn subscription_usage(
        &self,
        owner: &SubscribableRef,
        name: &str,
    ) -> UseCaseResult<Option<SubscriptionUsageManager<U>>> {
        Ok(self
            .subscription(owner, name)
            .await?
            .map(|subscription| self.subscriptions.usage_manager(&subscription)))
    }

    pub async fn subscription_ability(
        &self,
        owner: &SubscribableRef,
        name: &str,
    ) -> UseCaseResult<Option<SubscriptionAbility>> {
        match self.subscription(owner, name).await? {
            Some(subscription) => Ok(Some(self.subscriptions.ability(&subscription).await?)),
            None => Ok(None),
        }
    }
}
