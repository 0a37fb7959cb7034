//! Enrolment transactor service.
//!
//! Purchases run as one repository transaction; this service only supplies
//! the timestamp, maps typed repository failures onto domain codes and logs
//! the outcome.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::info;

use crate::domain::ports::{
    BuyCourseRequest, EnrolmentCommand, EnrolmentRepository, EnrolmentRepositoryError,
    TopUpBalanceRequest,
};
use crate::domain::{BalanceStatement, CourseId, Error, PurchaseReceipt, UserId};

/// Service implementing [`EnrolmentCommand`].
#[derive(Clone)]
pub struct EnrolmentService<R> {
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> EnrolmentService<R> {
    /// Create the service over an enrolment repository.
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }
}

#[async_trait]
impl<R> EnrolmentCommand for EnrolmentService<R>
where
    R: EnrolmentRepository,
{
    async fn buy_course(&self, request: BuyCourseRequest) -> Result<PurchaseReceipt, Error> {
        let BuyCourseRequest { user_id, course_id } = request;
        let receipt = self
            .repo
            .purchase_course(user_id, course_id, self.clock.utc())
            .await
            .map_err(map_enrolment_error)?;

        info!(
            %user_id,
            %course_id,
            purchase_id = %receipt.purchase_id,
            amount = %receipt.amount_paid,
            provisioned = receipt.provisioned_modules,
            "course purchased"
        );
        Ok(receipt)
    }

    async fn top_up_balance(
        &self,
        request: TopUpBalanceRequest,
    ) -> Result<BalanceStatement, Error> {
        let TopUpBalanceRequest { user_id, amount } = request;
        if amount.is_zero() {
            return Err(Error::invalid_request("top-up amount must be positive"));
        }

        let balance = self
            .repo
            .credit_balance(user_id, amount)
            .await
            .map_err(map_enrolment_error)?;

        info!(%user_id, credited = %amount, %balance, "balance topped up");
        Ok(BalanceStatement {
            user_id,
            credited: amount,
            balance,
        })
    }

    async fn has_purchased(&self, user_id: UserId, course_id: CourseId) -> Result<bool, Error> {
        self.repo
            .has_purchased(user_id, course_id)
            .await
            .map_err(map_enrolment_error)
    }
}

fn map_enrolment_error(error: EnrolmentRepositoryError) -> Error {
    match error {
        EnrolmentRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("enrolment repository unavailable: {message}"))
        }
        EnrolmentRepositoryError::Query { message } => {
            Error::internal(format!("enrolment repository error: {message}"))
        }
        EnrolmentRepositoryError::UserNotFound { user_id } => {
            Error::not_found(format!("user {user_id} not found"))
                .with_details(json!({ "userId": user_id }))
        }
        EnrolmentRepositoryError::CourseNotFound { course_id } => {
            Error::not_found(format!("course {course_id} not found"))
                .with_details(json!({ "courseId": course_id }))
        }
        EnrolmentRepositoryError::AlreadyPurchased { course_id } => {
            Error::already_purchased(format!("course {course_id} already purchased"))
                .with_details(json!({ "courseId": course_id }))
        }
        EnrolmentRepositoryError::InsufficientBalance { balance, price } => {
            Error::insufficient_balance(format!(
                "balance {balance} does not cover price {price}"
            ))
            .with_details(json!({ "balance": balance, "price": price }))
        }
        EnrolmentRepositoryError::BalanceOverflow { user_id } => Error::invalid_request(format!(
            "top-up would overflow the balance of user {user_id}"
        )),
    }
}

#[cfg(test)]
#[path = "enrolment_service_tests.rs"]
mod tests;
