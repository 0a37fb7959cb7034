//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! This module provides concrete implementations of the enrolment, module,
//! progress and certificate ports backed by PostgreSQL via Diesel with async
//! support through `diesel-async` and `bb8` connection pooling.
//!
//! # Architecture
//!
//! - **Thin adapters**: repositories translate between Diesel rows and domain
//!   types. Decisions (affordability, reorder validity, provisioning sets) are
//!   made by domain policies invoked inside the adapter's transaction.
//! - **Row locks**: every multi-statement operation takes its locks first, in
//!   the order user row, course row, purchase row.
//! - **Internal models**: row structs (`models.rs`) and schema definitions
//!   (`schema.rs`) never leave this module.
//!
//! # Example
//!
//! ```ignore
//! use academy::outbound::persistence::{DbPool, DieselEnrolmentRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/academy")).await?;
//! let repo = DieselEnrolmentRepository::new(pool);
//! ```

mod diesel_certificate_repository;
mod diesel_enrolment_repository;
pub(crate) mod diesel_helpers;
mod diesel_module_repository;
mod diesel_progress_repository;
mod models;
mod pool;
mod provisioning;
mod renumbering;
mod schema;

use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

pub use diesel_certificate_repository::DieselCertificateRepository;
pub use diesel_enrolment_repository::DieselEnrolmentRepository;
pub use diesel_module_repository::DieselModuleRepository;
pub use diesel_progress_repository::DieselProgressRepository;
pub use pool::{DbPool, PoolConfig, PoolError};

/// Schema migrations compiled from `backend/migrations`.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Errors raised while applying schema migrations.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// The database could not be reached.
    #[error("failed to connect for migrations: {0}")]
    Connect(#[from] diesel::ConnectionError),
    /// A migration failed to apply.
    #[error("failed to apply migrations: {0}")]
    Apply(String),
}

/// Apply every pending migration and return the versions applied.
///
/// Blocking; call from a blocking context.
pub fn run_migrations(database_url: &str) -> Result<Vec<String>, MigrationError> {
    let mut conn = PgConnection::establish(database_url)?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| MigrationError::Apply(err.to_string()))?;
    Ok(applied.iter().map(ToString::to_string).collect())
}
