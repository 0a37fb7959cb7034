//! Shared helpers for Diesel repository implementations.
//!
//! - Classification of Diesel errors into connection, unique-violation and
//!   query failures, with debug context emitted once. Unique violations keep
//!   the constraint name so adapters map only the constraints they own.
//! - [`TxError`], the error type carried through `AsyncConnection::transaction`
//!   so port errors raised mid-transaction roll back and surface unchanged.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Extract a readable message from a pool error.
pub(crate) fn map_pool_error_message(error: PoolError) -> String {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    }
}

/// Coarse category of a Diesel failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DieselFailure {
    /// The connection dropped or could not be used.
    Connection(String),
    /// A unique or primary key constraint rejected the write.
    UniqueViolation {
        /// Constraint name reported by PostgreSQL, when available.
        constraint: Option<String>,
        /// Server message.
        message: String,
    },
    /// Any other failure.
    Query(String),
}

impl DieselFailure {
    /// Whether this failure is a unique violation of the named constraint.
    pub(crate) fn violates(&self, constraint_name: &str) -> bool {
        matches!(
            self,
            Self::UniqueViolation { constraint: Some(name), .. } if name == constraint_name
        )
    }
}

/// Classify a Diesel error and emit debug context for `operation`.
pub(crate) fn classify_diesel_error(error: DieselError, operation: &str) -> DieselFailure {
    let error_message = error.to_string();
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(
                ?kind,
                %operation,
                message = info.message(),
                constraint = info.constraint_name(),
                "diesel operation failed"
            );
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            %operation,
            error = %error_message,
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => DieselFailure::Query("record not found".to_owned()),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, info) => {
            DieselFailure::Connection(info.message().to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            DieselFailure::UniqueViolation {
                constraint: info.constraint_name().map(str::to_owned),
                message: info.message().to_owned(),
            }
        }
        DieselError::DatabaseError(_, info) => DieselFailure::Query(info.message().to_owned()),
        _ => DieselFailure::Query(error_message),
    }
}

/// Error carried out of a transaction closure.
///
/// Diesel errors roll the transaction back and are mapped by the caller;
/// `Port` errors are already expressed in the repository's port error type.
#[derive(Debug)]
pub(crate) enum TxError<E> {
    /// Failure reported by Diesel or the database.
    Diesel(DieselError),
    /// Failure decided by the adapter, e.g. a missing row or refused plan.
    Port(E),
}

impl<E> From<DieselError> for TxError<E> {
    fn from(value: DieselError) -> Self {
        Self::Diesel(value)
    }
}

impl<E> TxError<E> {
    /// Collapse into the port error, mapping Diesel failures with `map`.
    pub(crate) fn into_port(self, map: impl FnOnce(DieselError) -> E) -> E {
        match self {
            Self::Diesel(error) => map(error),
            Self::Port(error) => error,
        }
    }
}
