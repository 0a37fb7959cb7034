//! Insert-if-absent provisioning of progress rows.
//!
//! Callers build a [`ProvisioningPlan`] from rows read under the course lock
//! and run [`provision`] inside the same transaction.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::domain::{CourseId, ModuleId, ProvisioningPlan, UserId};

use super::models::NewModuleProgressRow;
use super::schema::{module_progress, modules, purchases};

/// Insert every missing row named by `plan` and return how many were created.
pub(crate) async fn provision(
    conn: &mut AsyncPgConnection,
    plan: &ProvisioningPlan,
    provisioned_at: DateTime<Utc>,
) -> QueryResult<usize> {
    let mut inserted = 0;
    for batch in plan.seed_batches() {
        let rows: Vec<NewModuleProgressRow> = batch
            .iter()
            .map(|seed| NewModuleProgressRow {
                user_id: *seed.user_id.as_uuid(),
                module_id: seed.module_id.get(),
                is_completed: false,
                updated_at: provisioned_at,
            })
            .collect();
        inserted += diesel::insert_into(module_progress::table)
            .values(&rows)
            .on_conflict((module_progress::user_id, module_progress::module_id))
            .do_nothing()
            .execute(conn)
            .await?;
    }
    Ok(inserted)
}

/// Module ids of a course in position order.
pub(crate) async fn course_module_ids(
    conn: &mut AsyncPgConnection,
    course_id: CourseId,
) -> QueryResult<Vec<ModuleId>> {
    let ids: Vec<i64> = modules::table
        .filter(modules::course_id.eq(course_id.get()))
        .order(modules::position.asc())
        .select(modules::id)
        .load(conn)
        .await?;
    Ok(ids.into_iter().map(ModuleId::new).collect())
}

/// Users holding a purchase of the course.
pub(crate) async fn course_purchasers(
    conn: &mut AsyncPgConnection,
    course_id: CourseId,
) -> QueryResult<Vec<UserId>> {
    let ids: Vec<uuid::Uuid> = purchases::table
        .filter(purchases::course_id.eq(course_id.get()))
        .order(purchases::user_id.asc())
        .select(purchases::user_id)
        .load(conn)
        .await?;
    Ok(ids.into_iter().map(UserId::from_uuid).collect())
}
