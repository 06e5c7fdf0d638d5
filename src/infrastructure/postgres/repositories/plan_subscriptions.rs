use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, delete, insert_into, prelude::*, update};
use std::sync::Arc;
use tokio::task;

use crate::{
    domain::{
        entities::plan_subscriptions::{
            InsertPlanSubscriptionEntity, PlanSubscriptionEntity, UpdatePlanSubscriptionEntity,
        },
        repositories::plan_subscriptions::PlanSubscriptionRepository,
        value_objects::{
            subscribables::SubscribableRef,
            subscription_queries::{PlanSubscriptionQuery, SubscriptionScope, day_range_end},
        },
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{plan_subscription_usages, plan_subscriptions},
    },
};

pub struct PlanSubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PlanSubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PlanSubscriptionRepository for PlanSubscriptionPostgres {
    async fn insert(
        &self,
        subscription: InsertPlanSubscriptionEntity,
    ) -> Result<PlanSubscriptionEntity> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<PlanSubscriptionEntity> {
            let mut conn = db_pool.get()?;

            let created = insert_into(plan_subscriptions::table)
                .values(&subscription)
                .returning(PlanSubscriptionEntity::as_returning())
                .get_result::<PlanSubscriptionEntity>(&mut conn)?;

            Ok(created)
        })
        .await??)
    }

    async fn find_by_id(&self, subscription_id: i64) -> Result<Option<PlanSubscriptionEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<PlanSubscriptionEntity>> {
            let mut conn = db_pool.get()?;

            let subscription = plan_subscriptions::table
                .find(subscription_id)
                .select(PlanSubscriptionEntity::as_select())
                .first::<PlanSubscriptionEntity>(&mut conn)
                .optional()?;

            Ok(subscription)
        })
        .await??)
    }

    async fn update(
        &self,
        subscription_id: i64,
        changes: UpdatePlanSubscriptionEntity,
    ) -> Result<PlanSubscriptionEntity> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<PlanSubscriptionEntity> {
            let mut conn = db_pool.get()?;

            let updated = update(plan_subscriptions::table.find(subscription_id))
                .set(&changes)
                .returning(PlanSubscriptionEntity::as_returning())
                .get_result::<PlanSubscriptionEntity>(&mut conn)?;

            Ok(updated)
        })
        .await??)
    }

    async fn renew(
        &self,
        subscription_id: i64,
        changes: UpdatePlanSubscriptionEntity,
    ) -> Result<PlanSubscriptionEntity> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<PlanSubscriptionEntity> {
            let mut conn = db_pool.get()?;

            let renewed = conn
                .transaction::<PlanSubscriptionEntity, diesel::result::Error, _>(|tx| {
                    delete(
                        plan_subscription_usages::table
                            .filter(plan_subscription_usages::subscription_id.eq(subscription_id)),
                    )
                    .execute(tx)?;

                    update(plan_subscriptions::table.find(subscription_id))
                        .set(&changes)
                        .returning(PlanSubscriptionEntity::as_returning())
                        .get_result::<PlanSubscriptionEntity>(tx)
                })?;

            Ok(renewed)
        })
        .await??)
    }

    async fn list_by_subscribable(
        &self,
        owner: SubscribableRef,
    ) -> Result<Vec<PlanSubscriptionEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Vec<PlanSubscriptionEntity>> {
            let mut conn = db_pool.get()?;

            let rows = plan_subscriptions::table
                .filter(plan_subscriptions::subscribable_type.eq(owner.subscribable_type))
                .filter(plan_subscriptions::subscribable_id.eq(owner.subscribable_id))
                .select(PlanSubscriptionEntity::as_select())
                .order((plan_subscriptions::created_at.desc(), plan_subscriptions::id.desc()))
                .load::<PlanSubscriptionEntity>(&mut conn)?;

            Ok(rows)
        })
        .await??)
    }

    async fn find(
        &self,
        query: PlanSubscriptionQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<PlanSubscriptionEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Vec<PlanSubscriptionEntity>> {
            let mut conn = db_pool.get()?;

            let mut sql = plan_subscriptions::table
                .select(PlanSubscriptionEntity::as_select())
                .order(plan_subscriptions::id.asc())
                .into_boxed();

            for scope in query.scopes() {
                sql = match scope {
                    SubscriptionScope::BySubscribable(owner) => sql
                        .filter(
                            plan_subscriptions::subscribable_type
                                .eq(owner.subscribable_type.clone()),
                        )
                        .filter(plan_subscriptions::subscribable_id.eq(owner.subscribable_id)),
                    SubscriptionScope::Named(name) => {
                        sql.filter(plan_subscriptions::name.eq(name.clone()))
                    }
                    SubscriptionScope::EndingTrial { days } => sql.filter(
                        plan_subscriptions::trial_ends_at.between(now, day_range_end(now, *days)),
                    ),
                    SubscriptionScope::EndedTrial => {
                        sql.filter(plan_subscriptions::trial_ends_at.le(now))
                    }
                    SubscriptionScope::EndingPeriod { days } => sql.filter(
                        plan_subscriptions::ends_at.between(now, day_range_end(now, *days)),
                    ),
                    SubscriptionScope::EndedPeriod => {
                        sql.filter(plan_subscriptions::ends_at.le(now))
                    }
                    SubscriptionScope::ExcludeCanceled => {
                        sql.filter(plan_subscriptions::canceled_at.is_null())
                    }
                    SubscriptionScope::ExcludeImmediatelyCanceled => {
                        sql.filter(plan_subscriptions::canceled_immediately.is_distinct_from(true))
                    }
                };
            }

            let rows = sql.load::<PlanSubscriptionEntity>(&mut conn)?;
            Ok(rows)
        })
        .await??)
    }
}
