//! PostgreSQL-backed module sequencing adapter.
//!
//! Every mutation takes the course row `FOR UPDATE` before reading modules,
//! so appends, deletes and reorders on one course are serialised and a
//! concurrent purchase (holding the row `FOR SHARE`) sees the module set
//! either before or after the change.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::ports::{ModuleAppended, ModuleRemoved, ModuleRepository, ModuleRepositoryError};
use crate::domain::{
    CourseId, Module, ModuleId, ModulePosition, NewModule, ProvisioningPlan, RenumberPlan,
    ReorderPlan, next_position,
};

use super::diesel_helpers::{DieselFailure, TxError, classify_diesel_error, map_pool_error_message};
use super::models::{ModuleRow, NewModuleRow, modules_from_rows};
use super::pool::{DbPool, PoolError};
use super::provisioning::{course_purchasers, provision};
use super::renumbering::apply_renumber;
use super::schema::{courses, modules};

type ModuleTxError = TxError<ModuleRepositoryError>;

/// Diesel-backed implementation of [`ModuleRepository`].
#[derive(Clone)]
pub struct DieselModuleRepository {
    pool: DbPool,
}

impl DieselModuleRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> ModuleRepositoryError {
    ModuleRepositoryError::connection(map_pool_error_message(error))
}

/// `UNIQUE (course_id, position)` on modules.
const POSITION_KEY: &str = "modules_course_position_key";

fn map_diesel_error(error: DieselError, operation: &str) -> ModuleRepositoryError {
    map_failure(classify_diesel_error(error, operation))
}

fn map_failure(failure: DieselFailure) -> ModuleRepositoryError {
    let position_clash = failure.violates(POSITION_KEY);
    match failure {
        DieselFailure::Connection(message) => ModuleRepositoryError::connection(message),
        DieselFailure::UniqueViolation { message, .. } if position_clash => {
            ModuleRepositoryError::position_conflict(message)
        }
        DieselFailure::UniqueViolation { message, .. } | DieselFailure::Query(message) => {
            ModuleRepositoryError::query(message)
        }
    }
}

fn invalid_row(message: String) -> ModuleTxError {
    TxError::Port(ModuleRepositoryError::query(message))
}

async fn lock_course(
    conn: &mut AsyncPgConnection,
    course_id: CourseId,
) -> Result<(), ModuleTxError> {
    let locked: Option<i64> = courses::table
        .find(course_id.get())
        .select(courses::id)
        .for_update()
        .first(conn)
        .await
        .optional()?;
    locked
        .map(|_| ())
        .ok_or_else(|| TxError::Port(ModuleRepositoryError::course_not_found(course_id)))
}

async fn load_modules(
    conn: &mut AsyncPgConnection,
    course_id: CourseId,
) -> Result<Vec<Module>, ModuleTxError> {
    let rows: Vec<ModuleRow> = modules::table
        .filter(modules::course_id.eq(course_id.get()))
        .order(modules::position.asc())
        .select(ModuleRow::as_select())
        .load(conn)
        .await?;
    modules_from_rows(rows).map_err(invalid_row)
}

#[async_trait]
impl ModuleRepository for DieselModuleRepository {
    async fn list_modules(&self, course_id: CourseId) -> Result<Vec<Module>, ModuleRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let course_exists: bool = diesel::select(diesel::dsl::exists(
            courses::table.filter(courses::id.eq(course_id.get())),
        ))
        .get_result(&mut conn)
        .await
        .map_err(|error| map_diesel_error(error, "check course"))?;
        if !course_exists {
            return Err(ModuleRepositoryError::course_not_found(course_id));
        }

        let rows: Vec<ModuleRow> = modules::table
            .filter(modules::course_id.eq(course_id.get()))
            .order(modules::position.asc())
            .select(ModuleRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|error| map_diesel_error(error, "list modules"))?;
        modules_from_rows(rows).map_err(ModuleRepositoryError::query)
    }

    async fn append_module(
        &self,
        module: &NewModule,
        provisioned_at: DateTime<Utc>,
    ) -> Result<ModuleAppended, ModuleRepositoryError> {
        let course_id = module.course_id();
        let title = module.title().to_owned();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let result: Result<ModuleAppended, ModuleTxError> = conn
            .transaction(|conn| {
                async move {
                    lock_course(conn, course_id).await?;

                    let stored_max: Option<i32> = modules::table
                        .filter(modules::course_id.eq(course_id.get()))
                        .select(diesel::dsl::max(modules::position))
                        .first(conn)
                        .await?;
                    let current_max = stored_max
                        .map(ModulePosition::new)
                        .transpose()
                        .map_err(|err| invalid_row(err.to_string()))?;
                    let position = next_position(current_max).ok_or_else(|| {
                        TxError::Port(ModuleRepositoryError::position_conflict(
                            "course has no free position",
                        ))
                    })?;

                    let row: ModuleRow = diesel::insert_into(modules::table)
                        .values(&NewModuleRow {
                            course_id: course_id.get(),
                            title: &title,
                            position: position.get(),
                        })
                        .returning(ModuleRow::as_returning())
                        .get_result(conn)
                        .await?;
                    let stored = Module::try_from(row).map_err(invalid_row)?;

                    let plan = ProvisioningPlan::ForModule {
                        module_id: stored.id,
                        purchasers: course_purchasers(conn, course_id).await?,
                    };
                    let provisioned = provision(conn, &plan, provisioned_at).await?;

                    Ok(ModuleAppended {
                        module: stored,
                        provisioned,
                    })
                }
                .scope_boxed()
            })
            .await;

        result.map_err(|err| err.into_port(|error| map_diesel_error(error, "append module")))
    }

    async fn delete_module(
        &self,
        module_id: ModuleId,
    ) -> Result<ModuleRemoved, ModuleRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let result: Result<ModuleRemoved, ModuleTxError> = conn
            .transaction(|conn| {
                async move {
                    let owner: Option<i64> = modules::table
                        .find(module_id.get())
                        .select(modules::course_id)
                        .first(conn)
                        .await
                        .optional()?;
                    let course_id = owner.map(CourseId::new).ok_or_else(|| {
                        TxError::Port(ModuleRepositoryError::module_not_found(module_id))
                    })?;
                    lock_course(conn, course_id).await?;

                    // A concurrent delete may have won the course lock first.
                    let deleted = diesel::delete(
                        modules::table
                            .filter(modules::id.eq(module_id.get()))
                            .filter(modules::course_id.eq(course_id.get())),
                    )
                    .execute(conn)
                    .await?;
                    if deleted == 0 {
                        return Err(TxError::Port(ModuleRepositoryError::module_not_found(
                            module_id,
                        )));
                    }

                    let remaining = load_modules(conn, course_id).await?;
                    let plan = RenumberPlan::after_removal(&remaining);
                    apply_renumber(conn, course_id, &plan).await?;

                    Ok(ModuleRemoved {
                        module_id,
                        course_id,
                        shifted: plan.moves().len(),
                    })
                }
                .scope_boxed()
            })
            .await;

        let removed =
            result.map_err(|err| err.into_port(|error| map_diesel_error(error, "delete module")))?;
        debug!(
            %module_id,
            course_id = %removed.course_id,
            shifted = removed.shifted,
            "module deleted"
        );
        Ok(removed)
    }

    async fn reorder_modules(
        &self,
        course_id: CourseId,
        plan: &ReorderPlan,
    ) -> Result<Vec<Module>, ModuleRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let result: Result<Vec<Module>, ModuleTxError> = conn
            .transaction(|conn| {
                async move {
                    lock_course(conn, course_id).await?;
                    let current = load_modules(conn, course_id).await?;
                    let renumber = plan.validate(&current).map_err(|rejection| {
                        TxError::Port(ModuleRepositoryError::rejected(rejection))
                    })?;
                    apply_renumber(conn, course_id, &renumber).await?;
                    Ok(renumber.apply(current))
                }
                .scope_boxed()
            })
            .await;

        result.map_err(|err| err.into_port(|error| map_diesel_error(error, "reorder modules")))
    }
}
