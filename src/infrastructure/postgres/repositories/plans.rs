use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{RunQueryDsl, insert_into, prelude::*};
use std::sync::Arc;
use tokio::task;

use crate::{
    domain::{
        entities::{
            plan_features::{InsertPlanFeatureEntity, PlanFeatureEntity},
            plans::{InsertPlanEntity, PlanEntity},
        },
        repositories::plans::PlanRepository,
        value_objects::plans::{NewPlan, NewPlanFeature},
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{plan_features, plans},
    },
};

pub struct PlanPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PlanPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PlanRepository for PlanPostgres {
    async fn create_plan(
        &self,
        plan: NewPlan,
        features: Vec<NewPlanFeature>,
    ) -> Result<PlanEntity> {
        let db_pool = Arc::clone(&self.db_pool);
        let now = Utc::now();

        Ok(task::spawn_blocking(move || -> Result<PlanEntity> {
            let mut conn = db_pool.get()?;

            let created = conn.transaction::<PlanEntity, diesel::result::Error, _>(|tx| {
                let created = insert_into(plans::table)
                    .values(&InsertPlanEntity::new(plan, now))
                    .returning(PlanEntity::as_returning())
                    .get_result::<PlanEntity>(tx)?;

                let rows: Vec<InsertPlanFeatureEntity> = features
                    .into_iter()
                    .map(|feature| InsertPlanFeatureEntity::new(created.id, feature, now))
                    .collect();
                if !rows.is_empty() {
                    insert_into(plan_features::table).values(&rows).execute(tx)?;
                }

                Ok(created)
            })?;

            Ok(created)
        })
        .await??)
    }

    async fn find_by_id(&self, plan_id: i64) -> Result<Option<PlanEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<PlanEntity>> {
            let mut conn = db_pool.get()?;

            let plan = plans::table
                .find(plan_id)
                .select(PlanEntity::as_select())
                .first::<PlanEntity>(&mut conn)
                .optional()?;

            Ok(plan)
        })
        .await??)
    }

    async fn list_plans(&self) -> Result<Vec<PlanEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Vec<PlanEntity>> {
            let mut conn = db_pool.get()?;

            let rows = plans::table
                .select(PlanEntity::as_select())
                .order((plans::sort_order.asc(), plans::id.asc()))
                .load::<PlanEntity>(&mut conn)?;

            Ok(rows)
        })
        .await??)
    }

    async fn list_features(&self, plan_id: i64) -> Result<Vec<PlanFeatureEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Vec<PlanFeatureEntity>> {
            let mut conn = db_pool.get()?;

            let rows = plan_features::table
                .filter(plan_features::plan_id.eq(plan_id))
                .select(PlanFeatureEntity::as_select())
                .order((plan_features::sort_order.asc(), plan_features::id.asc()))
                .load::<PlanFeatureEntity>(&mut conn)?;

            Ok(rows)
        })
        .await??)
    }
}
