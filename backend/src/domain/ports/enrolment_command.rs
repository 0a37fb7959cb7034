//! Driving port for purchases and balance top-ups.

use async_trait::async_trait;

use crate::domain::{BalanceStatement, CourseId, Error, Money, PurchaseReceipt, UserId};

/// Request to buy a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuyCourseRequest {
    /// Buyer.
    pub user_id: UserId,
    /// Course to buy.
    pub course_id: CourseId,
}

/// Request to credit a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopUpBalanceRequest {
    /// Account to credit.
    pub user_id: UserId,
    /// Amount to add; must be positive.
    pub amount: Money,
}

/// Driving port for the enrolment transactor.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrolmentCommand: Send + Sync {
    /// Buy a course atomically.
    ///
    /// # Errors
    ///
    /// - `AlreadyPurchased` when the pair already has a purchase.
    /// - `InsufficientBalance` when the balance does not cover the price.
    /// - `NotFound` when the user or the course is missing.
    async fn buy_course(&self, request: BuyCourseRequest) -> Result<PurchaseReceipt, Error>;

    /// Credit a positive amount and return the new balance.
    async fn top_up_balance(&self, request: TopUpBalanceRequest)
    -> Result<BalanceStatement, Error>;

    /// Whether the user has bought the course.
    async fn has_purchased(&self, user_id: UserId, course_id: CourseId) -> Result<bool, Error>;
}
