use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::{
    application::usecases::{
        subscription_ability::SubscriptionAbility, subscription_builder::SubscriptionBuilder,
        subscription_usage::SubscriptionUsageManager,
    },
    config::config_model::PlansConfig,
    domain::{
        entities::{
            plan_subscriptions::{
                InsertPlanSubscriptionEntity, PlanSubscriptionEntity, UpdatePlanSubscriptionEntity,
                plan_period,
            },
            plans::PlanEntity,
        },
        errors::{SubscriptionError, UseCaseResult},
        repositories::{
            plan_subscription_usages::PlanSubscriptionUsageRepository,
            plan_subscriptions::PlanSubscriptionRepository, plans::PlanRepository,
            subscription_events::SubscriptionEventSink,
        },
        value_objects::{
            clock::Clock, features::FeatureCatalog, subscribables::SubscribableRef,
            subscription_events::SubscriptionEvent, subscription_queries::PlanSubscriptionQuery,
        },
    },
};

/// Drives the subscription lifecycle: create, save, change plan, cancel and renew.
pub struct PlanSubscriptionUseCase<P, S, U, E>
where
    P: PlanRepository + 'static,
    S: PlanSubscriptionRepository + 'static,
    U: PlanSubscriptionUsageRepository + 'static,
    E: SubscriptionEventSink + 'static,
{
    plan_repo: Arc<P>,
    subscription_repo: Arc<S>,
    usage_repo: Arc<U>,
    events: Arc<E>,
    clock: Arc<dyn Clock>,
    settings: Arc<PlansConfig>,
    catalog: Arc<FeatureCatalog>,
}

impl<P, S, U, E> PlanSubscriptionUseCase<P, S, U, E>
where
    P: PlanRepository + 'static,
    S: PlanSubscriptionRepository + 'static,
    U: PlanSubscriptionUsageRepository + 'static,
    E: SubscriptionEventSink + 'static,
{
    pub fn new(
        plan_repo: Arc<P>,
        subscription_repo: Arc<S>,
        usage_repo: Arc<U>,
        events: Arc<E>,
        clock: Arc<dyn Clock>,
        settings: Arc<PlansConfig>,
    ) -> Self {
        let catalog = Arc::new(settings.features.clone());
        Self {
            plan_repo,
            subscription_repo,
            usage_repo,
            events,
            clock,
            settings,
            catalog,
        }
    }

    pub fn settings(&self) -> &PlansConfig {
        &self.settings
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn new_subscription(
        &self,
        owner: SubscribableRef,
        name: impl Into<String>,
        plan: &PlanEntity,
    ) -> SubscriptionBuilder<'_, P, S, U, E> {
        SubscriptionBuilder::new(self, owner, name.into(), plan.clone())
    }

    /// Persists a new subscription, filling in the first period from `plan` when none is set.
    pub async fn create(
        &self,
        mut subscription: InsertPlanSubscriptionEntity,
        plan: &PlanEntity,
    ) -> UseCaseResult<PlanSubscriptionEntity> {
        if subscription.ends_at.is_none() {
            let start = subscription.starts_at.unwrap_or_else(|| self.clock.now());
            let period = plan_period(plan, None, None, start)?;
            subscription.starts_at = Some(period.start_date());
            subscription.ends_at = Some(period.end_date());
        }

        let owner = SubscribableRef::new(
            subscription.subscribable_type.clone(),
            subscription.subscribable_id,
        );
        let created = self
            .subscription_repo
            .insert(subscription)
            .await
            .map_err(|err| {
                error!(
                    %owner,
                    plan_id = plan.id,
                    db_error = ?err,
                    "plan_subscriptions: failed to insert subscription"
                );
                SubscriptionError::Internal(err)
            })?;

        info!(
            subscription_id = created.id,
            %owner,
            plan_id = created.plan_id,
            name = %created.name,
            "plan_subscriptions: subscription created"
        );
        self.events.publish(SubscriptionEvent::Created {
            subscription_id: created.id,
        });
        self.events.publish(SubscriptionEvent::Saved {
            subscription_id: created.id,
        });

        Ok(created)
    }

    /// Writes `subscription` back, giving it a period first if it has none.
    pub async fn save(&self, subscription: &mut PlanSubscriptionEntity) -> UseCaseResult<()> {
        let now = self.clock.now();
        let mut pending = subscription.clone();

        if pending.ends_at.is_none() {
            let plan = self.load_plan(pending.plan_id).await?;
            pending.set_new_period(&plan, None, None, now)?;
        }

        let from_plan_id = self
            .subscription_repo
            .find_by_id(pending.id)
            .await
            .map_err(|err| {
                error!(
                    subscription_id = pending.id,
                    db_error = ?err,
                    "plan_subscriptions: failed to load stored subscription"
                );
                SubscriptionError::Internal(err)
            })?
            .ok_or(SubscriptionError::SubscriptionNotFound(pending.id))?
            .plan_id;

        let saved = self.persist(&pending, now).await?;

        if from_plan_id != saved.plan_id {
            info!(
                subscription_id = saved.id,
                from_plan_id,
                to_plan_id = saved.plan_id,
                "plan_subscriptions: plan changed"
            );
            self.events.publish(SubscriptionEvent::PlanChanged {
                subscription_id: saved.id,
                from_plan_id,
                to_plan_id: saved.plan_id,
            });
        }
        self.events.publish(SubscriptionEvent::Saved {
            subscription_id: saved.id,
        });

        *subscription = saved;
        Ok(())
    }

    /// Moves the subscription to `new_plan` without saving it.
    ///
    /// A different billing cycle starts a fresh period from now and discards usage.
    pub async fn change_plan(
        &self,
        subscription: &mut PlanSubscriptionEntity,
        new_plan: &PlanEntity,
    ) -> UseCaseResult<()> {
        let current_plan = self
            .plan_repo
            .find_by_id(subscription.plan_id)
            .await
            .map_err(|err| {
                error!(
                    subscription_id = subscription.id,
                    plan_id = subscription.plan_id,
                    db_error = ?err,
                    "plan_subscriptions: failed to load current plan"
                );
                SubscriptionError::Internal(err)
            })?;

        let cycle_changed = current_plan
            .as_ref()
            .is_none_or(|current| !current.same_billing_cycle(new_plan));

        if cycle_changed {
            let now = self.clock.now();
            let period = subscription.set_new_period(
                new_plan,
                Some(new_plan.interval.as_str()),
                Some(new_plan.interval_count),
                now,
            )?;
            debug!(
                subscription_id = subscription.id,
                starts_at = %period.start_date(),
                ends_at = %period.end_date(),
                "plan_subscriptions: billing cycle reset"
            );

            self.usage_manager(subscription).clear().await?;
        }

        subscription.plan_id = new_plan.id;
        Ok(())
    }

    /// Returns `false` when the store rejects the write.
    pub async fn cancel(
        &self,
        subscription: &mut PlanSubscriptionEntity,
        immediately: bool,
    ) -> bool {
        let now = self.clock.now();
        let mut pending = subscription.clone();
        pending.mark_canceled(now, immediately);

        match self.persist(&pending, now).await {
            Ok(saved) => {
                info!(
                    subscription_id = saved.id,
                    immediately,
                    "plan_subscriptions: subscription canceled"
                );
                self.events.publish(SubscriptionEvent::Saved {
                    subscription_id: saved.id,
                });
                self.events.publish(SubscriptionEvent::Canceled {
                    subscription_id: saved.id,
                    immediately,
                });
                *subscription = saved;
                true
            }
            Err(_) => false,
        }
    }

    /// Starts a new period from now on the current plan, clearing usage and cancellation.
    pub async fn renew(&self, subscription: &mut PlanSubscriptionEntity) -> UseCaseResult<()> {
        let now = self.clock.now();

        if subscription.is_ended(now) && subscription.is_canceled() {
            warn!(
                subscription_id = subscription.id,
                "plan_subscriptions: refused to renew canceled ended subscription"
            );
            return Err(SubscriptionError::CannotRenewCanceledEnded);
        }

        let plan = self.load_plan(subscription.plan_id).await?;
        let mut pending = subscription.clone();
        pending.set_new_period(&plan, None, None, now)?;
        pending.canceled_at = None;

        let renewed = self
            .subscription_repo
            .renew(pending.id, UpdatePlanSubscriptionEntity::from_entity(&pending, now))
            .await
            .map_err(|err| {
                error!(
                    subscription_id = pending.id,
                    db_error = ?err,
                    "plan_subscriptions: renewal transaction failed"
                );
                SubscriptionError::Internal(err)
            })?;

        info!(
            subscription_id = renewed.id,
            ends_at = ?renewed.ends_at,
            "plan_subscriptions: subscription renewed"
        );
        self.events.publish(SubscriptionEvent::Saved {
            subscription_id: renewed.id,
        });
        self.events.publish(SubscriptionEvent::Renewed {
            subscription_id: renewed.id,
        });

        *subscription = renewed;
        Ok(())
    }

    pub async fn find(
        &self,
        query: PlanSubscriptionQuery,
    ) -> UseCaseResult<Vec<PlanSubscriptionEntity>> {
        let now = self.clock.now();
        self.subscription_repo
            .find(query, now)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "plan_subscriptions: failed to query subscriptions");
                SubscriptionError::Internal(err)
            })
    }

    pub async fn list_for(
        &self,
        owner: SubscribableRef,
    ) -> UseCaseResult<Vec<PlanSubscriptionEntity>> {
        self.subscription_repo
            .list_by_subscribable(owner.clone())
            .await
            .map_err(|err| {
                error!(
                    %owner,
                    db_error = ?err,
                    "plan_subscriptions: failed to list subscriptions"
                );
                SubscriptionError::Internal(err)
            })
    }

    pub fn usage_manager(
        &self,
        subscription: &PlanSubscriptionEntity,
    ) -> SubscriptionUsageManager<U> {
        SubscriptionUsageManager::new(
            subscription.clone(),
            Arc::clone(&self.usage_repo),
            Arc::clone(&self.catalog),
            Arc::clone(&self.clock),
        )
    }

    /// Snapshot of the plan features and usage of `subscription`, evaluated at now.
    pub async fn ability(
        &self,
        subscription: &PlanSubscriptionEntity,
    ) -> UseCaseResult<SubscriptionAbility> {
        let features = self
            .plan_repo
            .list_features(subscription.plan_id)
            .await
            .map_err(|err| {
                error!(
                    subscription_id = subscription.id,
                    plan_id = subscription.plan_id,
                    db_error = ?err,
                    "plan_subscriptions: failed to load plan features"
                );
                SubscriptionError::Internal(err)
            })?;

        let usages = self
            .usage_repo
            .list_by_subscription(subscription.id)
            .await
            .map_err(|err| {
                error!(
                    subscription_id = subscription.id,
                    db_error = ?err,
                    "plan_subscriptions: failed to load usage"
                );
                SubscriptionError::Internal(err)
            })?;

        Ok(SubscriptionAbility::new(
            features,
            usages,
            self.settings.positive_words.clone(),
            self.clock.now(),
        ))
    }

    async fn load_plan(&self, plan_id: i64) -> UseCaseResult<PlanEntity> {
        self.plan_repo
            .find_by_id(plan_id)
            .await
            .map_err(|err| {
                error!(plan_id, db_error = ?err, "plan_subscriptions: failed to load plan");
                SubscriptionError::Internal(err)
            })?
            .ok_or(SubscriptionError::PlanNotFound(plan_id))
    }

    async fn persist(
        &self,
        subscription: &PlanSubscriptionEntity,
        now: chrono::DateTime<chrono::Utc>,
    ) -> UseCaseResult<PlanSubscriptionEntity> {
        self.subscription_repo
            .update(
                subscription.id,
                UpdatePlanSubscriptionEntity::from_entity(subscription, now),
            )
            .await
            .map_err(|err| {
                error!(
                    subscription_id = subscription.id,
                    db_error = ?err,
                    "plan_subscriptions: failed to save subscription"
                );
                SubscriptionError::Internal(err)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        entities::{
            plan_features::fixtures::feature, plan_subscription_usages::fixtures::usage,
            plan_subscriptions::fixtures::subscription, plans::fixtures::plan,
        },
        repositories::{
            plan_subscription_usages::MockPlanSubscriptionUsageRepository,
            plan_subscriptions::MockPlanSubscriptionRepository, plans::MockPlanRepository,
            subscription_events::MockSubscriptionEventSink,
        },
        value_objects::{clock::FixedClock, enums::subscription_statuses::SubscriptionStatus},
    };
    use anyhow::anyhow;
    use chrono::{DateTime, Duration, Months, TimeZone, Utc};
    use mockall::{Sequence, predicate::eq};

    type TestUseCase = PlanSubscriptionUseCase<
        MockPlanRepository,
        MockPlanSubscriptionRepository,
        MockPlanSubscriptionUsageRepository,
        MockSubscriptionEventSink,
    >;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    fn one_month_from_now() -> DateTime<Utc> {
        now().checked_add_months(Months::new(1)).unwrap()
    }

    fn use_case(
        plan_repo: MockPlanRepository,
        subscription_repo: MockPlanSubscriptionRepository,
        usage_repo: MockPlanSubscriptionUsageRepository,
        events: MockSubscriptionEventSink,
    ) -> TestUseCase {
        PlanSubscriptionUseCase::new(
            Arc::new(plan_repo),
            Arc::new(subscription_repo),
            Arc::new(usage_repo),
            Arc::new(events),
            Arc::new(FixedClock(now())),
            Arc::new(PlansConfig::default()),
        )
    }

    fn stored(id: i64, changes: UpdatePlanSubscriptionEntity) -> PlanSubscriptionEntity {
        let base = subscription(id, now());
        PlanSubscriptionEntity {
            plan_id: changes.plan_id,
            name: changes.name,
            trial_ends_at: changes.trial_ends_at,
            starts_at: changes.starts_at,
            ends_at: changes.ends_at,
            canceled_at: changes.canceled_at,
            canceled_immediately: changes.canceled_immediately,
            updated_at: changes.updated_at,
            ..base
        }
    }

    fn inserted(insert: InsertPlanSubscriptionEntity) -> PlanSubscriptionEntity {
        PlanSubscriptionEntity {
            id: 9,
            subscribable_id: insert.subscribable_id,
            subscribable_type: insert.subscribable_type,
            plan_id: insert.plan_id,
            name: insert.name,
            trial_ends_at: insert.trial_ends_at,
            starts_at: insert.starts_at,
            ends_at: insert.ends_at,
            canceled_at: insert.canceled_at,
            canceled_immediately: insert.canceled_immediately,
            created_at: insert.created_at,
            updated_at: insert.updated_at,
        }
    }

    fn expect_events(events: &mut MockSubscriptionEventSink, expected: Vec<SubscriptionEvent>) {
        let mut seq = Sequence::new();
        for event in expected {
            events
                .expect_publish()
                .with(eq(event))
                .times(1)
                .in_sequence(&mut seq)
                .return_const(());
        }
    }

    #[tokio::test]
    async fn create_fills_period_and_announces_subscription() {
        let mut subscription_repo = MockPlanSubscriptionRepository::new();
        subscription_repo
            .expect_insert()
            .withf(|insert| {
                insert.starts_at == Some(now()) && insert.ends_at == Some(one_month_from_now())
            })
            .times(1)
            .returning(|insert| Ok(inserted(insert)));

        let mut events = MockSubscriptionEventSink::new();
        expect_events(
            &mut events,
            vec![
                SubscriptionEvent::Created { subscription_id: 9 },
                SubscriptionEvent::Saved { subscription_id: 9 },
            ],
        );

        let use_case = use_case(
            MockPlanRepository::new(),
            subscription_repo,
            MockPlanSubscriptionUsageRepository::new(),
            events,
        );
        let monthly = plan(1, "month", 1);

        let created = use_case
            .new_subscription(SubscribableRef::new("user", 7), "main", &monthly)
            .create()
            .await
            .unwrap();

        assert_eq!(created.id, 9);
        assert_eq!(created.name, "main");
        assert_eq!(created.trial_ends_at, None);
        assert_eq!(created.status(now()), Some(SubscriptionStatus::Active));
    }

    #[tokio::test]
    async fn create_keeps_explicit_start() {
        let start = now() - Duration::days(5);
        let mut subscription_repo = MockPlanSubscriptionRepository::new();
        subscription_repo
            .expect_insert()
            .withf(move |insert| {
                insert.starts_at == Some(start)
                    && insert.ends_at == Some(start + Duration::weeks(2))
            })
            .times(1)
            .returning(|insert| Ok(inserted(insert)));

        let mut events = MockSubscriptionEventSink::new();
        events.expect_publish().times(2).return_const(());

        let use_case = use_case(
            MockPlanRepository::new(),
            subscription_repo,
            MockPlanSubscriptionUsageRepository::new(),
            events,
        );
        let biweekly = plan(1, "week", 2);

        use_case
            .new_subscription(SubscribableRef::new("user", 7), "main", &biweekly)
            .starting_at(start)
            .create()
            .await
            .unwrap();
    }

    #[test]
    fn builder_applies_trial_rules() {
        let use_case = use_case(
            MockPlanRepository::new(),
            MockPlanSubscriptionRepository::new(),
            MockPlanSubscriptionUsageRepository::new(),
            MockSubscriptionEventSink::new(),
        );
        let owner = SubscribableRef::new("user", 7);
        let mut trial_plan = plan(1, "month", 1);
        trial_plan.trial_period_days = Some(14);

        let from_plan = use_case.new_subscription(owner.clone(), "main", &trial_plan);
        assert_eq!(
            from_plan.resolve_trial_ends_at(now()).unwrap(),
            Some(now() + Duration::days(14))
        );

        let overridden = use_case
            .new_subscription(owner.clone(), "main", &trial_plan)
            .trial_days(3);
        assert_eq!(
            overridden.resolve_trial_ends_at(now()).unwrap(),
            Some(now() + Duration::days(3))
        );

        let skipped = use_case
            .new_subscription(owner.clone(), "main", &trial_plan)
            .trial_days(3)
            .skip_trial();
        assert_eq!(skipped.resolve_trial_ends_at(now()).unwrap(), None);

        let no_trial = use_case.new_subscription(owner, "main", &plan(2, "month", 1));
        let row = no_trial.build(now()).unwrap();
        assert_eq!(row.trial_ends_at, None);
        assert_eq!(row.plan_id, 2);
        assert_eq!(row.ends_at, None);
    }

    #[test]
    fn explicit_trial_end_wins_over_every_other_rule() {
        let use_case = use_case(
            MockPlanRepository::new(),
            MockPlanSubscriptionRepository::new(),
            MockPlanSubscriptionUsageRepository::new(),
            MockSubscriptionEventSink::new(),
        );
        let mut trial_plan = plan(1, "month", 1);
        trial_plan.trial_period_days = Some(14);
        let trial_end = now() + Duration::hours(6);

        let builder = use_case
            .new_subscription(SubscribableRef::new("user", 7), "main", &trial_plan)
            .trial_days(3)
            .skip_trial()
            .trial_ends_at(trial_end);

        assert_eq!(builder.resolve_trial_ends_at(now()).unwrap(), Some(trial_end));
        assert_eq!(builder.build(now()).unwrap().trial_ends_at, Some(trial_end));
    }

    #[tokio::test]
    async fn oversized_trial_fails_without_inserting() {
        let mut subscription_repo = MockPlanSubscriptionRepository::new();
        subscription_repo.expect_insert().never();

        let use_case = use_case(
            MockPlanRepository::new(),
            subscription_repo,
            MockPlanSubscriptionUsageRepository::new(),
            MockSubscriptionEventSink::new(),
        );
        let mut trial_plan = plan(1, "month", 1);
        trial_plan.trial_period_days = Some(i32::MAX);

        let builder =
            use_case.new_subscription(SubscribableRef::new("user", 7), "main", &trial_plan);
        assert!(matches!(
            builder.resolve_trial_ends_at(now()),
            Err(SubscriptionError::Internal(_))
        ));

        let result = builder.create().await;
        assert!(matches!(result, Err(SubscriptionError::Internal(_))));
    }

    #[tokio::test]
    async fn immediate_cancel_after_trial_deactivates() {
        let mut subscription_repo = MockPlanSubscriptionRepository::new();
        subscription_repo
            .expect_update()
            .withf(|id, changes| {
                *id == 3
                    && changes.canceled_at == Some(now())
                    && changes.canceled_immediately == Some(true)
            })
            .times(1)
            .returning(|id, changes| Ok(stored(id, changes)));

        let mut events = MockSubscriptionEventSink::new();
        expect_events(
            &mut events,
            vec![
                SubscriptionEvent::Saved { subscription_id: 3 },
                SubscriptionEvent::Canceled {
                    subscription_id: 3,
                    immediately: true,
                },
            ],
        );

        let use_case = use_case(
            MockPlanRepository::new(),
            subscription_repo,
            MockPlanSubscriptionUsageRepository::new(),
            events,
        );
        let mut sub = subscription(3, now());
        sub.trial_ends_at = Some(now() - Duration::days(2));

        assert!(use_case.cancel(&mut sub, true).await);
        assert!(!sub.is_active(now()));
        assert!(sub.is_canceled_immediately());
        assert_eq!(sub.status(now()), Some(SubscriptionStatus::Canceled));
    }

    #[tokio::test]
    async fn failed_cancel_reports_false_and_leaves_subscription_untouched() {
        let mut subscription_repo = MockPlanSubscriptionRepository::new();
        subscription_repo
            .expect_update()
            .returning(|_, _| Err(anyhow!("connection reset")));

        let mut events = MockSubscriptionEventSink::new();
        events.expect_publish().never();

        let use_case = use_case(
            MockPlanRepository::new(),
            subscription_repo,
            MockPlanSubscriptionUsageRepository::new(),
            events,
        );
        let mut sub = subscription(3, now());
        let before = sub.clone();

        assert!(!use_case.cancel(&mut sub, false).await);
        assert_eq!(sub, before);
    }

    #[tokio::test]
    async fn renew_refuses_canceled_ended_subscription() {
        let mut subscription_repo = MockPlanSubscriptionRepository::new();
        subscription_repo.expect_renew().never();
        let mut plan_repo = MockPlanRepository::new();
        plan_repo.expect_find_by_id().never();

        let use_case = use_case(
            plan_repo,
            subscription_repo,
            MockPlanSubscriptionUsageRepository::new(),
            MockSubscriptionEventSink::new(),
        );
        let mut sub = subscription(3, now());
        sub.ends_at = Some(now() - Duration::days(1));
        sub.canceled_at = Some(now() - Duration::days(3));

        let result = use_case.renew(&mut sub).await;

        assert!(matches!(result, Err(SubscriptionError::CannotRenewCanceledEnded)));
    }

    #[tokio::test]
    async fn renew_ended_subscription_starts_fresh_period() {
        let mut plan_repo = MockPlanRepository::new();
        plan_repo
            .expect_find_by_id()
            .with(eq(1))
            .returning(|id| Ok(Some(plan(id, "month", 1))));

        let mut subscription_repo = MockPlanSubscriptionRepository::new();
        subscription_repo
            .expect_renew()
            .withf(|id, changes| {
                *id == 3
                    && changes.canceled_at.is_none()
                    && changes.starts_at == Some(now())
                    && changes.ends_at == Some(one_month_from_now())
            })
            .times(1)
            .returning(|id, changes| Ok(stored(id, changes)));
        subscription_repo.expect_update().never();

        let mut events = MockSubscriptionEventSink::new();
        expect_events(
            &mut events,
            vec![
                SubscriptionEvent::Saved { subscription_id: 3 },
                SubscriptionEvent::Renewed { subscription_id: 3 },
            ],
        );

        let use_case = use_case(
            plan_repo,
            subscription_repo,
            MockPlanSubscriptionUsageRepository::new(),
            events,
        );
        let mut sub = subscription(3, now());
        sub.starts_at = Some(now() - Duration::days(40));
        sub.ends_at = Some(now() - Duration::days(10));
        assert!(sub.is_ended(now()));

        use_case.renew(&mut sub).await.unwrap();

        assert!(!sub.is_ended(now()));
        assert!(sub.is_active(now()));
        assert_eq!(sub.ends_at, Some(one_month_from_now()));
    }

    #[tokio::test]
    async fn renew_clears_pending_cancellation() {
        let mut plan_repo = MockPlanRepository::new();
        plan_repo
            .expect_find_by_id()
            .returning(|id| Ok(Some(plan(id, "year", 1))));

        let mut subscription_repo = MockPlanSubscriptionRepository::new();
        subscription_repo
            .expect_renew()
            .returning(|id, changes| Ok(stored(id, changes)));

        let mut events = MockSubscriptionEventSink::new();
        events.expect_publish().times(2).return_const(());

        let use_case = use_case(
            plan_repo,
            subscription_repo,
            MockPlanSubscriptionUsageRepository::new(),
            events,
        );
        let mut sub = subscription(3, now());
        sub.canceled_at = Some(now() - Duration::hours(1));

        use_case.renew(&mut sub).await.unwrap();

        assert!(!sub.is_canceled());
        assert_eq!(sub.ends_at, now().checked_add_months(Months::new(12)));
    }

    #[tokio::test]
    async fn renew_without_plan_fails() {
        let mut plan_repo = MockPlanRepository::new();
        plan_repo.expect_find_by_id().returning(|_| Ok(None));
        let mut subscription_repo = MockPlanSubscriptionRepository::new();
        subscription_repo.expect_renew().never();

        let use_case = use_case(
            plan_repo,
            subscription_repo,
            MockPlanSubscriptionUsageRepository::new(),
            MockSubscriptionEventSink::new(),
        );
        let mut sub = subscription(3, now());

        let result = use_case.renew(&mut sub).await;

        assert!(matches!(result, Err(SubscriptionError::PlanNotFound(1))));
    }

    #[tokio::test]
    async fn renew_surfaces_aborted_transaction() {
        let mut plan_repo = MockPlanRepository::new();
        plan_repo
            .expect_find_by_id()
            .returning(|id| Ok(Some(plan(id, "month", 1))));
        let mut subscription_repo = MockPlanSubscriptionRepository::new();
        subscription_repo
            .expect_renew()
            .returning(|_, _| Err(anyhow!("transaction aborted")));
        let mut events = MockSubscriptionEventSink::new();
        events.expect_publish().never();

        let use_case = use_case(
            plan_repo,
            subscription_repo,
            MockPlanSubscriptionUsageRepository::new(),
            events,
        );
        let mut sub = subscription(3, now());
        let before = sub.clone();

        let result = use_case.renew(&mut sub).await;

        assert!(matches!(result, Err(SubscriptionError::Internal(_))));
        assert_eq!(sub, before);
    }

    #[tokio::test]
    async fn change_to_other_billing_cycle_resets_period_and_usage() {
        let mut plan_repo = MockPlanRepository::new();
        plan_repo
            .expect_find_by_id()
            .with(eq(1))
            .returning(|id| Ok(Some(plan(id, "month", 1))));

        let mut usage_repo = MockPlanSubscriptionUsageRepository::new();
        usage_repo.expect_clear().with(eq(3)).times(1).returning(|_| Ok(2));

        let mut subscription_repo = MockPlanSubscriptionRepository::new();
        subscription_repo.expect_update().never();

        let use_case = use_case(
            plan_repo,
            subscription_repo,
            usage_repo,
            MockSubscriptionEventSink::new(),
        );
        let mut sub = subscription(3, now());
        let yearly = plan(2, "year", 1);

        use_case.change_plan(&mut sub, &yearly).await.unwrap();

        assert_eq!(sub.plan_id, 2);
        assert_eq!(sub.starts_at, Some(now()));
        assert_eq!(sub.ends_at, now().checked_add_months(Months::new(12)));
    }

    #[tokio::test]
    async fn change_within_billing_cycle_keeps_period_and_usage() {
        let mut plan_repo = MockPlanRepository::new();
        plan_repo
            .expect_find_by_id()
            .returning(|id| Ok(Some(plan(id, "month", 1))));

        let mut usage_repo = MockPlanSubscriptionUsageRepository::new();
        usage_repo.expect_clear().never();

        let use_case = use_case(
            plan_repo,
            MockPlanSubscriptionRepository::new(),
            usage_repo,
            MockSubscriptionEventSink::new(),
        );
        let mut sub = subscription(3, now());
        let before = sub.clone();

        use_case.change_plan(&mut sub, &plan(2, "month", 1)).await.unwrap();

        assert_eq!(sub.plan_id, 2);
        assert_eq!(sub.starts_at, before.starts_at);
        assert_eq!(sub.ends_at, before.ends_at);
    }

    #[tokio::test]
    async fn change_from_missing_plan_resets_period() {
        let mut plan_repo = MockPlanRepository::new();
        plan_repo.expect_find_by_id().returning(|_| Ok(None));

        let mut usage_repo = MockPlanSubscriptionUsageRepository::new();
        usage_repo.expect_clear().times(1).returning(|_| Ok(0));

        let use_case = use_case(
            plan_repo,
            MockPlanSubscriptionRepository::new(),
            usage_repo,
            MockSubscriptionEventSink::new(),
        );
        let mut sub = subscription(3, now());

        use_case.change_plan(&mut sub, &plan(2, "month", 1)).await.unwrap();

        assert_eq!(sub.starts_at, Some(now()));
        assert_eq!(sub.ends_at, Some(one_month_from_now()));
    }

    #[tokio::test]
    async fn save_announces_plan_change() {
        let mut subscription_repo = MockPlanSubscriptionRepository::new();
        subscription_repo
            .expect_find_by_id()
            .with(eq(3))
            .returning(|id| Ok(Some(subscription(id, now()))));
        subscription_repo
            .expect_update()
            .withf(|_, changes| changes.plan_id == 2)
            .times(1)
            .returning(|id, changes| Ok(stored(id, changes)));

        let mut events = MockSubscriptionEventSink::new();
        expect_events(
            &mut events,
            vec![
                SubscriptionEvent::PlanChanged {
                    subscription_id: 3,
                    from_plan_id: 1,
                    to_plan_id: 2,
                },
                SubscriptionEvent::Saved { subscription_id: 3 },
            ],
        );

        let use_case = use_case(
            MockPlanRepository::new(),
            subscription_repo,
            MockPlanSubscriptionUsageRepository::new(),
            events,
        );
        let mut sub = subscription(3, now());
        sub.plan_id = 2;

        use_case.save(&mut sub).await.unwrap();

        assert_eq!(sub.plan_id, 2);
    }

    #[tokio::test]
    async fn save_without_plan_change_only_announces_save() {
        let mut subscription_repo = MockPlanSubscriptionRepository::new();
        subscription_repo
            .expect_find_by_id()
            .returning(|id| Ok(Some(subscription(id, now()))));
        subscription_repo
            .expect_update()
            .returning(|id, changes| Ok(stored(id, changes)));

        let mut events = MockSubscriptionEventSink::new();
        expect_events(&mut events, vec![SubscriptionEvent::Saved { subscription_id: 3 }]);

        let use_case = use_case(
            MockPlanRepository::new(),
            subscription_repo,
            MockPlanSubscriptionUsageRepository::new(),
            events,
        );
        let mut sub = subscription(3, now());
        sub.name = "secondary".to_string();

        use_case.save(&mut sub).await.unwrap();

        assert_eq!(sub.name, "secondary");
    }

    #[tokio::test]
    async fn save_of_unknown_subscription_fails() {
        let mut subscription_repo = MockPlanSubscriptionRepository::new();
        subscription_repo.expect_find_by_id().returning(|_| Ok(None));
        subscription_repo.expect_update().never();

        let use_case = use_case(
            MockPlanRepository::new(),
            subscription_repo,
            MockPlanSubscriptionUsageRepository::new(),
            MockSubscriptionEventSink::new(),
        );
        let mut sub = subscription(42, now());

        let result = use_case.save(&mut sub).await;

        assert!(matches!(result, Err(SubscriptionError::SubscriptionNotFound(42))));
    }

    #[tokio::test]
    async fn save_fills_missing_period_from_plan() {
        let mut plan_repo = MockPlanRepository::new();
        plan_repo
            .expect_find_by_id()
            .returning(|id| Ok(Some(plan(id, "day", 10))));

        let mut subscription_repo = MockPlanSubscriptionRepository::new();
        subscription_repo
            .expect_find_by_id()
            .returning(|id| Ok(Some(subscription(id, now()))));
        subscription_repo
            .expect_update()
            .withf(|_, changes| changes.ends_at == Some(now() + Duration::days(10)))
            .times(1)
            .returning(|id, changes| Ok(stored(id, changes)));

        let mut events = MockSubscriptionEventSink::new();
        events.expect_publish().times(1).return_const(());

        let use_case = use_case(
            plan_repo,
            subscription_repo,
            MockPlanSubscriptionUsageRepository::new(),
            events,
        );
        let mut sub = subscription(3, now());
        sub.starts_at = None;
        sub.ends_at = None;

        use_case.save(&mut sub).await.unwrap();

        assert_eq!(sub.starts_at, Some(now()));
        assert!(!sub.is_ended(now()));
    }

    #[tokio::test]
    async fn ability_reads_plan_features_and_usage() {
        let mut plan_repo = MockPlanRepository::new();
        plan_repo.expect_list_features().with(eq(1)).returning(|plan_id| {
            Ok(vec![
                feature(plan_id, "LISTINGS", "50"),
                feature(plan_id, "PICTURES_PER_LISTING", "10"),
                feature(plan_id, "SUPPORT", "Y"),
            ])
        });

        let mut usage_repo = MockPlanSubscriptionUsageRepository::new();
        usage_repo
            .expect_list_by_subscription()
            .with(eq(3))
            .returning(|subscription_id| Ok(vec![usage(subscription_id, "LISTINGS", 45, None)]));

        let use_case = use_case(
            plan_repo,
            MockPlanSubscriptionRepository::new(),
            usage_repo,
            MockSubscriptionEventSink::new(),
        );

        let ability = use_case.ability(&subscription(3, now())).await.unwrap();

        assert_eq!(ability.consumed("LISTINGS"), 45);
        assert_eq!(ability.remainings("LISTINGS"), 5);
        assert!(ability.can_use("LISTINGS"));
        assert!(ability.enabled("SUPPORT"));
        assert_eq!(ability.value("PICTURES_PER_LISTING"), Some("10"));
    }

    #[tokio::test]
    async fn find_passes_query_and_clock() {
        let mut subscription_repo = MockPlanSubscriptionRepository::new();
        subscription_repo
            .expect_find()
            .withf(|query, at| query.scopes().len() == 2 && *at == now())
            .times(1)
            .returning(|_, _| Ok(vec![subscription(3, now())]));

        let use_case = use_case(
            MockPlanRepository::new(),
            subscription_repo,
            MockPlanSubscriptionUsageRepository::new(),
            MockSubscriptionEventSink::new(),
        );

        let found = use_case
            .find(PlanSubscriptionQuery::new().ending_period(3).exclude_canceled())
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
    }
}
