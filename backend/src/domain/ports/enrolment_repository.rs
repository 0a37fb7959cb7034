//! Driven port for balances and purchases.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::define_port_error;
use crate::domain::{CourseId, Money, PurchaseReceipt, UserId};

define_port_error! {
    /// Errors raised by enrolment persistence adapters.
    pub enum EnrolmentRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "enrolment repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "enrolment repository query failed: {message}",
        /// The buyer has no account row.
        UserNotFound { user_id: UserId } => "user {user_id} not found",
        /// The course does not exist.
        CourseNotFound { course_id: CourseId } => "course {course_id} not found",
        /// A purchase already exists for the pair.
        AlreadyPurchased { course_id: CourseId } => "course {course_id} already purchased",
        /// The stored balance does not cover the stored price.
        InsufficientBalance { balance: Money, price: Money } =>
            "balance {balance} does not cover price {price}",
        /// Crediting would exceed the representable balance.
        BalanceOverflow { user_id: UserId } => "balance of user {user_id} would overflow",
    }
}

/// Port for the atomic purchase transaction and balance maintenance.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrolmentRepository: Send + Sync {
    /// Buy a course in one transaction.
    ///
    /// Implementations must lock the buyer's row exclusively and the course
    /// row in shared mode, re-read balance, price and purchase status under
    /// those locks, then debit, insert the purchase and provision progress
    /// rows for every current module. Any failure rolls everything back.
    async fn purchase_course(
        &self,
        user_id: UserId,
        course_id: CourseId,
        purchased_at: DateTime<Utc>,
    ) -> Result<PurchaseReceipt, EnrolmentRepositoryError>;

    /// Whether the pair has a purchase row.
    async fn has_purchased(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<bool, EnrolmentRepositoryError>;

    /// Add `amount` to the user's balance and return the new balance.
    async fn credit_balance(
        &self,
        user_id: UserId,
        amount: Money,
    ) -> Result<Money, EnrolmentRepositoryError>;
}
