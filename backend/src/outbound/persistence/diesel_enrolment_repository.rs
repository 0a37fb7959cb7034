//! PostgreSQL-backed enrolment adapter.
//!
//! A purchase runs in one transaction: the buyer's row is locked
//! `FOR UPDATE`, the course row `FOR SHARE`, and the [`EnrolmentSnapshot`]
//! policy decides against the values read under those locks. The debit,
//! purchase row and progress rows commit together or not at all.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::ports::{EnrolmentRepository, EnrolmentRepositoryError};
use crate::domain::{
    CourseId, EnrolmentDenial, EnrolmentSnapshot, Money, ProvisioningPlan, PurchaseId,
    PurchaseReceipt, UserId,
};

use super::diesel_helpers::{DieselFailure, TxError, classify_diesel_error, map_pool_error_message};
use super::models::{NewPurchaseRow, stored_money};
use super::pool::{DbPool, PoolError};
use super::provisioning::{course_module_ids, provision};
use super::schema::{courses, purchases, users};

type EnrolmentTxError = TxError<EnrolmentRepositoryError>;

/// Diesel-backed implementation of [`EnrolmentRepository`].
#[derive(Clone)]
pub struct DieselEnrolmentRepository {
    pool: DbPool,
}

impl DieselEnrolmentRepository {
    /// Create a new repository with the given connection pool.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use academy::outbound::persistence::{DbPool, DieselEnrolmentRepository, PoolConfig};
    ///
    /// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
    /// let pool = DbPool::new(PoolConfig::new("postgres://localhost/academy")).await?;
    /// let repository = DieselEnrolmentRepository::new(pool);
    /// # let _ = repository;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> EnrolmentRepositoryError {
    EnrolmentRepositoryError::connection(map_pool_error_message(error))
}

fn map_diesel_error(error: DieselError, operation: &str) -> EnrolmentRepositoryError {
    match classify_diesel_error(error, operation) {
        DieselFailure::Connection(message) => EnrolmentRepositoryError::connection(message),
        DieselFailure::UniqueViolation { message, .. } | DieselFailure::Query(message) => {
            EnrolmentRepositoryError::query(message)
        }
    }
}

/// `UNIQUE (user_id, course_id)` on purchases.
const PURCHASE_KEY: &str = "purchases_user_course_key";

fn map_purchase_error(error: DieselError, course_id: CourseId) -> EnrolmentRepositoryError {
    map_purchase_failure(classify_diesel_error(error, "purchase course"), course_id)
}

fn map_purchase_failure(failure: DieselFailure, course_id: CourseId) -> EnrolmentRepositoryError {
    if failure.violates(PURCHASE_KEY) {
        return EnrolmentRepositoryError::already_purchased(course_id);
    }
    match failure {
        DieselFailure::Connection(message) => EnrolmentRepositoryError::connection(message),
        DieselFailure::UniqueViolation { message, .. } | DieselFailure::Query(message) => {
            EnrolmentRepositoryError::query(message)
        }
    }
}

fn map_denial(denial: EnrolmentDenial, course_id: CourseId) -> EnrolmentRepositoryError {
    match denial {
        EnrolmentDenial::AlreadyPurchased => EnrolmentRepositoryError::already_purchased(course_id),
        EnrolmentDenial::InsufficientBalance { balance, price } => {
            EnrolmentRepositoryError::insufficient_balance(balance, price)
        }
    }
}

fn stored(column: &str, minor_units: i64) -> Result<Money, EnrolmentTxError> {
    stored_money(column, minor_units)
        .map_err(|message| TxError::Port(EnrolmentRepositoryError::query(message)))
}

async fn lock_balance(
    conn: &mut AsyncPgConnection,
    user_id: UserId,
) -> Result<Money, EnrolmentTxError> {
    let stored_balance: Option<i64> = users::table
        .find(*user_id.as_uuid())
        .select(users::balance)
        .for_update()
        .first(conn)
        .await
        .optional()?;
    let raw = stored_balance
        .ok_or_else(|| TxError::Port(EnrolmentRepositoryError::user_not_found(user_id)))?;
    stored("users.balance", raw)
}

async fn purchase_exists(
    conn: &mut AsyncPgConnection,
    user_id: UserId,
    course_id: CourseId,
) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(
        purchases::table
            .filter(purchases::user_id.eq(*user_id.as_uuid()))
            .filter(purchases::course_id.eq(course_id.get())),
    ))
    .get_result(conn)
    .await
}

#[async_trait]
impl EnrolmentRepository for DieselEnrolmentRepository {
    async fn purchase_course(
        &self,
        user_id: UserId,
        course_id: CourseId,
        purchased_at: DateTime<Utc>,
    ) -> Result<PurchaseReceipt, EnrolmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let result: Result<PurchaseReceipt, EnrolmentTxError> = conn
            .transaction(|conn| {
                async move {
                    let balance = lock_balance(conn, user_id).await?;

                    let stored_price: Option<i64> = courses::table
                        .find(course_id.get())
                        .select(courses::price)
                        .for_share()
                        .first(conn)
                        .await
                        .optional()?;
                    let price = stored_price.ok_or_else(|| {
                        TxError::Port(EnrolmentRepositoryError::course_not_found(course_id))
                    })?;

                    let snapshot = EnrolmentSnapshot {
                        balance,
                        price: stored("courses.price", price)?,
                        already_purchased: purchase_exists(conn, user_id, course_id).await?,
                    };
                    let debit = snapshot
                        .authorise()
                        .map_err(|denial| TxError::Port(map_denial(denial, course_id)))?;

                    diesel::update(users::table.find(*user_id.as_uuid()))
                        .set(users::balance.eq(debit.remaining.minor_units()))
                        .execute(conn)
                        .await?;

                    let purchase_id: i64 = diesel::insert_into(purchases::table)
                        .values(&NewPurchaseRow {
                            user_id: *user_id.as_uuid(),
                            course_id: course_id.get(),
                            amount: debit.amount.minor_units(),
                            created_at: purchased_at,
                        })
                        .returning(purchases::id)
                        .get_result(conn)
                        .await?;

                    let plan = ProvisioningPlan::ForPurchaser {
                        user_id,
                        modules: course_module_ids(conn, course_id).await?,
                    };
                    let provisioned_modules = provision(conn, &plan, purchased_at).await?;

                    Ok(PurchaseReceipt {
                        purchase_id: PurchaseId::new(purchase_id),
                        course_id,
                        amount_paid: debit.amount,
                        balance: debit.remaining,
                        provisioned_modules,
                    })
                }
                .scope_boxed()
            })
            .await;

        let receipt = result
            .map_err(|err| err.into_port(|error| map_purchase_error(error, course_id)))?;
        debug!(
            %user_id,
            %course_id,
            purchase_id = %receipt.purchase_id,
            provisioned = receipt.provisioned_modules,
            "purchase committed"
        );
        Ok(receipt)
    }

    async fn has_purchased(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<bool, EnrolmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        purchase_exists(&mut conn, user_id, course_id)
            .await
            .map_err(|error| map_diesel_error(error, "check purchase"))
    }

    async fn credit_balance(
        &self,
        user_id: UserId,
        amount: Money,
    ) -> Result<Money, EnrolmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let result: Result<Money, EnrolmentTxError> = conn
            .transaction(|conn| {
                async move {
                    let balance = lock_balance(conn, user_id).await?;
                    let credited = balance.checked_add(amount).ok_or_else(|| {
                        TxError::Port(EnrolmentRepositoryError::balance_overflow(user_id))
                    })?;
                    diesel::update(users::table.find(*user_id.as_uuid()))
                        .set(users::balance.eq(credited.minor_units()))
                        .execute(conn)
                        .await?;
                    Ok(credited)
                }
                .scope_boxed()
            })
            .await;

        result.map_err(|err| err.into_port(|error| map_diesel_error(error, "credit balance")))
    }
}
