//! PostgreSQL-backed progress adapter.
//!
//! Completion writes lock the owning purchase row `FOR UPDATE`, so toggles by
//! one user in one course are serialised and the count read after each write
//! already includes every earlier toggle.
//!
//! The enrolled-course listing runs in a read-only repeatable-read
//! transaction so each course's total and completed counts come from one
//! snapshot.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::ports::{ProgressRepository, ProgressRepositoryError};
use crate::domain::{
    CompletionChange, Course, CourseId, CourseProgress, EnrolledCourse, Module, ModuleId,
    ModuleProgress, ProgressCounts, ProvisioningPlan, UserId,
};

use super::diesel_helpers::{DieselFailure, TxError, classify_diesel_error, map_pool_error_message};
use super::models::{CourseRow, ModuleRow, stored_money};
use super::pool::{DbPool, PoolError};
use super::provisioning::{course_module_ids, course_purchasers, provision};
use super::schema::{courses, module_progress, modules, purchases, users};

type ProgressTxError = TxError<ProgressRepositoryError>;

/// Diesel-backed implementation of [`ProgressRepository`].
#[derive(Clone)]
pub struct DieselProgressRepository {
    pool: DbPool,
}

impl DieselProgressRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> ProgressRepositoryError {
    ProgressRepositoryError::connection(map_pool_error_message(error))
}

fn map_diesel_error(error: DieselError, operation: &str) -> ProgressRepositoryError {
    match classify_diesel_error(error, operation) {
        DieselFailure::Connection(message) => ProgressRepositoryError::connection(message),
        DieselFailure::UniqueViolation { message, .. } | DieselFailure::Query(message) => {
            ProgressRepositoryError::query(message)
        }
    }
}

fn to_count(column: &str, raw: i64) -> Result<u32, ProgressRepositoryError> {
    u32::try_from(raw)
        .map_err(|_| ProgressRepositoryError::query(format!("{column} count {raw} out of range")))
}

async fn course_exists(conn: &mut AsyncPgConnection, course_id: CourseId) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(
        courses::table.filter(courses::id.eq(course_id.get())),
    ))
    .get_result(conn)
    .await
}

async fn user_exists(conn: &mut AsyncPgConnection, user_id: UserId) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(
        users::table.filter(users::id.eq(*user_id.as_uuid())),
    ))
    .get_result(conn)
    .await
}

fn learner_view(
    row: ModuleRow,
    is_completed: Option<bool>,
) -> Result<ModuleProgress, ProgressRepositoryError> {
    let module = Module::try_from(row).map_err(ProgressRepositoryError::query)?;
    Ok(ModuleProgress {
        module,
        is_completed: is_completed.unwrap_or(false),
    })
}

/// One purchased course as read from the store: course row, amount paid and
/// purchase time.
type PurchasedCourseRow = (CourseRow, i64, DateTime<Utc>);

/// Join purchased courses with per-course module totals and completed counts.
/// Courses missing from either map have zero of that count.
fn assemble_enrolled(
    rows: Vec<PurchasedCourseRow>,
    totals: &BTreeMap<i64, i64>,
    completed: &BTreeMap<i64, i64>,
) -> Result<Vec<EnrolledCourse>, ProgressRepositoryError> {
    rows.into_iter()
        .map(|(row, amount, purchased_at)| {
            let counts = ProgressCounts {
                total: to_count("module", totals.get(&row.id).copied().unwrap_or(0))?,
                completed: to_count("completed", completed.get(&row.id).copied().unwrap_or(0))?,
            };
            let amount_paid =
                stored_money("purchases.amount", amount).map_err(ProgressRepositoryError::query)?;
            let course = Course::try_from(row).map_err(ProgressRepositoryError::query)?;
            Ok(EnrolledCourse {
                progress: CourseProgress::from_counts(course.id, counts),
                course,
                amount_paid,
                purchased_at,
            })
        })
        .collect()
}

/// Current module total and the user's completed count for the course.
async fn count_progress(
    conn: &mut AsyncPgConnection,
    user_id: UserId,
    course_id: CourseId,
) -> Result<ProgressCounts, ProgressTxError> {
    let total: i64 = modules::table
        .filter(modules::course_id.eq(course_id.get()))
        .count()
        .get_result(conn)
        .await?;
    let completed: i64 = module_progress::table
        .inner_join(modules::table)
        .filter(modules::course_id.eq(course_id.get()))
        .filter(module_progress::user_id.eq(*user_id.as_uuid()))
        .filter(module_progress::is_completed.eq(true))
        .count()
        .get_result(conn)
        .await?;
    Ok(ProgressCounts {
        total: to_count("module", total).map_err(TxError::Port)?,
        completed: to_count("completed", completed).map_err(TxError::Port)?,
    })
}

#[async_trait]
impl ProgressRepository for DieselProgressRepository {
    async fn set_completion(
        &self,
        user_id: UserId,
        module_id: ModuleId,
        completed: bool,
        updated_at: DateTime<Utc>,
    ) -> Result<CompletionChange, ProgressRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let result: Result<CompletionChange, ProgressTxError> = conn
            .transaction(|conn| {
                async move {
                    let owner: Option<i64> = modules::table
                        .find(module_id.get())
                        .select(modules::course_id)
                        .first(conn)
                        .await
                        .optional()?;
                    let course_id = owner.map(CourseId::new).ok_or_else(|| {
                        TxError::Port(ProgressRepositoryError::module_not_found(module_id))
                    })?;
                    let no_record = || {
                        TxError::Port(ProgressRepositoryError::no_progress_record(
                            user_id, module_id,
                        ))
                    };

                    let purchase: Option<i64> = purchases::table
                        .filter(purchases::user_id.eq(*user_id.as_uuid()))
                        .filter(purchases::course_id.eq(course_id.get()))
                        .select(purchases::id)
                        .for_update()
                        .first(conn)
                        .await
                        .optional()?;
                    if purchase.is_none() {
                        return Err(no_record());
                    }

                    let updated = diesel::update(
                        module_progress::table
                            .filter(module_progress::user_id.eq(*user_id.as_uuid()))
                            .filter(module_progress::module_id.eq(module_id.get())),
                    )
                    .set((
                        module_progress::is_completed.eq(completed),
                        module_progress::updated_at.eq(updated_at),
                    ))
                    .execute(conn)
                    .await?;
                    if updated == 0 {
                        return Err(no_record());
                    }

                    let counts = count_progress(conn, user_id, course_id).await?;
                    Ok(CompletionChange {
                        course_id,
                        module_id,
                        is_completed: completed,
                        progress: CourseProgress::from_counts(course_id, counts),
                    })
                }
                .scope_boxed()
            })
            .await;

        result.map_err(|err| err.into_port(|error| map_diesel_error(error, "set completion")))
    }

    async fn progress_counts(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<ProgressCounts, ProgressRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let exists = course_exists(&mut conn, course_id)
            .await
            .map_err(|error| map_diesel_error(error, "check course"))?;
        if !exists {
            return Err(ProgressRepositoryError::course_not_found(course_id));
        }

        count_progress(&mut conn, user_id, course_id)
            .await
            .map_err(|err| err.into_port(|error| map_diesel_error(error, "count progress")))
    }

    async fn reprovision_course(
        &self,
        course_id: CourseId,
        provisioned_at: DateTime<Utc>,
    ) -> Result<usize, ProgressRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let result: Result<usize, ProgressTxError> = conn
            .transaction(|conn| {
                async move {
                    let locked: Option<i64> = courses::table
                        .find(course_id.get())
                        .select(courses::id)
                        .for_share()
                        .first(conn)
                        .await
                        .optional()?;
                    if locked.is_none() {
                        return Err(TxError::Port(ProgressRepositoryError::course_not_found(
                            course_id,
                        )));
                    }

                    let plan = ProvisioningPlan::ForCourse {
                        purchasers: course_purchasers(conn, course_id).await?,
                        modules: course_module_ids(conn, course_id).await?,
                    };
                    Ok(provision(conn, &plan, provisioned_at).await?)
                }
                .scope_boxed()
            })
            .await;

        let created =
            result.map_err(|err| err.into_port(|error| map_diesel_error(error, "reprovision")))?;
        debug!(%course_id, created, "reprovision pass finished");
        Ok(created)
    }

    async fn learner_modules(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<ModuleProgress>, ProgressRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let exists = course_exists(&mut conn, course_id)
            .await
            .map_err(|error| map_diesel_error(error, "check course"))?;
        if !exists {
            return Err(ProgressRepositoryError::course_not_found(course_id));
        }

        let rows: Vec<(ModuleRow, Option<bool>)> = modules::table
            .left_join(
                module_progress::table.on(module_progress::module_id
                    .eq(modules::id)
                    .and(module_progress::user_id.eq(*user_id.as_uuid()))),
            )
            .filter(modules::course_id.eq(course_id.get()))
            .order(modules::position.asc())
            .select((
                ModuleRow::as_select(),
                module_progress::is_completed.nullable(),
            ))
            .load(&mut conn)
            .await
            .map_err(|error| map_diesel_error(error, "list learner modules"))?;

        rows.into_iter()
            .map(|(row, is_completed)| learner_view(row, is_completed))
            .collect()
    }

    async fn learner_module(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<ModuleProgress, ProgressRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<(ModuleRow, Option<bool>)> = modules::table
            .left_join(
                module_progress::table.on(module_progress::module_id
                    .eq(modules::id)
                    .and(module_progress::user_id.eq(*user_id.as_uuid()))),
            )
            .filter(modules::id.eq(module_id.get()))
            .select((
                ModuleRow::as_select(),
                module_progress::is_completed.nullable(),
            ))
            .first(&mut conn)
            .await
            .optional()
            .map_err(|error| map_diesel_error(error, "find learner module"))?;

        let (row, is_completed) =
            row.ok_or_else(|| ProgressRepositoryError::module_not_found(module_id))?;
        learner_view(row, is_completed)
    }

    async fn enrolled_courses(
        &self,
        user_id: UserId,
    ) -> Result<Vec<EnrolledCourse>, ProgressRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let result: Result<Vec<EnrolledCourse>, ProgressTxError> = conn
            .build_transaction()
            .read_only()
            .repeatable_read()
            .run(|conn| {
                async move {
                    if !user_exists(conn, user_id).await? {
                        return Err(TxError::Port(ProgressRepositoryError::user_not_found(
                            user_id,
                        )));
                    }

                    let rows: Vec<PurchasedCourseRow> = purchases::table
                        .inner_join(courses::table)
                        .filter(purchases::user_id.eq(*user_id.as_uuid()))
                        .order((purchases::created_at.desc(), purchases::id.desc()))
                        .select((
                            CourseRow::as_select(),
                            purchases::amount,
                            purchases::created_at,
                        ))
                        .load(conn)
                        .await?;
                    let course_ids: Vec<i64> = rows.iter().map(|(row, _, _)| row.id).collect();

                    let totals: Vec<(i64, i64)> = modules::table
                        .filter(modules::course_id.eq_any(course_ids.clone()))
                        .group_by(modules::course_id)
                        .select((modules::course_id, diesel::dsl::count_star()))
                        .load(conn)
                        .await?;
                    let completed: Vec<(i64, i64)> = module_progress::table
                        .inner_join(modules::table)
                        .filter(module_progress::user_id.eq(*user_id.as_uuid()))
                        .filter(module_progress::is_completed.eq(true))
                        .filter(modules::course_id.eq_any(course_ids))
                        .group_by(modules::course_id)
                        .select((modules::course_id, diesel::dsl::count_star()))
                        .load(conn)
                        .await?;

                    let totals: BTreeMap<i64, i64> = totals.into_iter().collect();
                    let completed: BTreeMap<i64, i64> = completed.into_iter().collect();
                    assemble_enrolled(rows, &totals, &completed).map_err(TxError::Port)
                }
                .scope_boxed()
            })
            .await;

        result.map_err(|err| err.into_port(|error| map_diesel_error(error, "list enrolled courses")))
    }
}
