use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, delete, insert_into, prelude::*, upsert::excluded};
use std::sync::Arc;
use tokio::task;

use crate::{
    domain::{
        entities::plan_subscription_usages::{
            PlanSubscriptionUsageEntity, UpsertPlanSubscriptionUsageEntity,
        },
        repositories::plan_subscription_usages::PlanSubscriptionUsageRepository,
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad, schema::plan_subscription_usages,
    },
};

pub struct PlanSubscriptionUsagePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PlanSubscriptionUsagePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PlanSubscriptionUsageRepository for PlanSubscriptionUsagePostgres {
    async fn find_by_code(
        &self,
        subscription_id: i64,
        code: &str,
    ) -> Result<Option<PlanSubscriptionUsageEntity>> {
        let db_pool = Arc::clone(&self.db_pool);
        let code = code.to_string();

        Ok(task::spawn_blocking(move || -> Result<Option<PlanSubscriptionUsageEntity>> {
            let mut conn = db_pool.get()?;

            let usage = plan_subscription_usages::table
                .filter(plan_subscription_usages::subscription_id.eq(subscription_id))
                .filter(plan_subscription_usages::code.eq(code))
                .select(PlanSubscriptionUsageEntity::as_select())
                .first::<PlanSubscriptionUsageEntity>(&mut conn)
                .optional()?;

            Ok(usage)
        })
        .await??)
    }

    async fn list_by_subscription(
        &self,
        subscription_id: i64,
    ) -> Result<Vec<PlanSubscriptionUsageEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Vec<PlanSubscriptionUsageEntity>> {
            let mut conn = db_pool.get()?;

            let rows = plan_subscription_usages::table
                .filter(plan_subscription_usages::subscription_id.eq(subscription_id))
                .select(PlanSubscriptionUsageEntity::as_select())
                .order(plan_subscription_usages::id.asc())
                .load::<PlanSubscriptionUsageEntity>(&mut conn)?;

            Ok(rows)
        })
        .await??)
    }

    async fn save(
        &self,
        usage: UpsertPlanSubscriptionUsageEntity,
    ) -> Result<PlanSubscriptionUsageEntity> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<PlanSubscriptionUsageEntity> {
            let mut conn = db_pool.get()?;

            let saved = insert_into(plan_subscription_usages::table)
                .values(&usage)
                .on_conflict((
                    plan_subscription_usages::subscription_id,
                    plan_subscription_usages::code,
                ))
                .do_update()
                .set((
                    plan_subscription_usages::used.eq(excluded(plan_subscription_usages::used)),
                    plan_subscription_usages::valid_until
                        .eq(excluded(plan_subscription_usages::valid_until)),
                    plan_subscription_usages::updated_at
                        .eq(excluded(plan_subscription_usages::updated_at)),
                ))
                .returning(PlanSubscriptionUsageEntity::as_returning())
                .get_result::<PlanSubscriptionUsageEntity>(&mut conn)?;

            Ok(saved)
        })
        .await??)
    }

    async fn clear(&self, subscription_id: i64) -> Result<usize> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<usize> {
            let mut conn = db_pool.get()?;

            let deleted = delete(
                plan_subscription_usages::table
                    .filter(plan_subscription_usages::subscription_id.eq(subscription_id)),
            )
            .execute(&mut conn)?;

            Ok(deleted)
        })
        .await??)
    }
}
