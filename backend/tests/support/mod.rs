//! Shared fixtures for the ledger integration suites.
//!
//! Each [`Ledger`] owns an embedded cluster, a freshly migrated database,
//! a Tokio runtime and the wired services. Rows the services never create
//! (users and courses) are seeded with the synchronous `postgres` client.

mod cluster_skip;
mod pg_embed;

use academy::domain::{CourseId, UserId};
use academy::outbound::artifacts::FilesystemArtifactStore;
use academy::outbound::persistence::{DbPool, PoolConfig, run_migrations};
use academy::wiring::AcademyServices;
use mockable::DefaultClock;
use pg_embedded_setup_unpriv::TestCluster;
use postgres::{Client, NoTls};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::runtime::Runtime;

pub use cluster_skip::handle_cluster_setup_failure;

const TEST_DB: &str = "academy_test";

/// Render a `postgres` error with its SQLSTATE and detail.
pub fn format_postgres_error(error: &postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };
    let mut summary = format!(
        "postgres error {:?}: {}",
        db_error.code(),
        db_error.message()
    );
    if let Some(detail) = db_error.detail() {
        summary.push_str("; detail: ");
        summary.push_str(detail);
    }
    summary
}

/// Drop and recreate `name` through the maintenance database.
fn reset_database(cluster: &TestCluster, name: &str) -> Result<(), String> {
    let admin_url = cluster.connection().database_url("postgres");
    let mut client =
        Client::connect(&admin_url, NoTls).map_err(|err| format_postgres_error(&err))?;
    // DROP/CREATE DATABASE cannot share one simple-query batch: Postgres
    // wraps multi-statement batches in an implicit transaction.
    client
        .batch_execute(&format!("DROP DATABASE IF EXISTS \"{name}\""))
        .map_err(|err| format_postgres_error(&err))?;
    client
        .batch_execute(&format!("CREATE DATABASE \"{name}\""))
        .map_err(|err| format_postgres_error(&err))
}

/// A migrated database with services wired against it.
pub struct Ledger {
    pub runtime: Runtime,
    pub services: AcademyServices,
    pub artifacts: TempDir,
    database_url: String,
    _cluster: TestCluster,
}

impl Ledger {
    fn start() -> Result<Self, String> {
        let runtime = Runtime::new().map_err(|err| err.to_string())?;
        let cluster = pg_embed::test_cluster()?;
        reset_database(&cluster, TEST_DB)?;
        let database_url = cluster.connection().database_url(TEST_DB);
        run_migrations(&database_url).map_err(|err| err.to_string())?;

        let config = PoolConfig::new(&database_url)
            .with_max_size(4)
            .with_min_idle(Some(1));
        let pool = runtime
            .block_on(DbPool::new(config))
            .map_err(|err| err.to_string())?;
        let artifacts = TempDir::new().map_err(|err| err.to_string())?;
        let store = FilesystemArtifactStore::open(artifacts.path(), "/uploads")
            .map_err(|err| err.to_string())?;
        let services = AcademyServices::with_clock(&pool, store, Arc::new(DefaultClock));

        Ok(Self {
            runtime,
            services,
            artifacts,
            database_url,
            _cluster: cluster,
        })
    }

    /// Start a ledger, or `None` when cluster failures may be skipped.
    pub fn start_or_skip() -> Option<Self> {
        match Self::start() {
            Ok(ledger) => Some(ledger),
            Err(reason) => handle_cluster_setup_failure(reason),
        }
    }

    fn client(&self) -> Client {
        Client::connect(&self.database_url, NoTls)
            .unwrap_or_else(|err| panic!("connect: {}", format_postgres_error(&err)))
    }

    /// Insert a learner holding `balance` minor units.
    pub fn seed_user(&self, display_name: &str, balance: i64) -> UserId {
        let user_id = UserId::random();
        self.client()
            .execute(
                "INSERT INTO users (id, display_name, balance) VALUES ($1, $2, $3)",
                &[user_id.as_uuid(), &display_name, &balance],
            )
            .unwrap_or_else(|err| panic!("seed user: {}", format_postgres_error(&err)));
        user_id
    }

    /// Insert a course priced at `price` minor units.
    pub fn seed_course(&self, title: &str, instructor: &str, price: i64) -> CourseId {
        let row = self
            .client()
            .query_one(
                "INSERT INTO courses (title, instructor, price) VALUES ($1, $2, $3) RETURNING id",
                &[&title, &instructor, &price],
            )
            .unwrap_or_else(|err| panic!("seed course: {}", format_postgres_error(&err)));
        CourseId::new(row.get(0))
    }

    /// Stored balance in minor units.
    pub fn balance(&self, user_id: UserId) -> i64 {
        self.client()
            .query_one("SELECT balance FROM users WHERE id = $1", &[user_id.as_uuid()])
            .unwrap_or_else(|err| panic!("balance: {}", format_postgres_error(&err)))
            .get(0)
    }

    /// Progress rows a user holds for a course's modules.
    pub fn progress_rows(&self, user_id: UserId, course_id: CourseId) -> i64 {
        self.client()
            .query_one(
                concat!(
                    "SELECT count(*) FROM module_progress mp ",
                    "JOIN modules m ON m.id = mp.module_id ",
                    "WHERE mp.user_id = $1 AND m.course_id = $2"
                ),
                &[user_id.as_uuid(), &course_id.get()],
            )
            .unwrap_or_else(|err| panic!("progress rows: {}", format_postgres_error(&err)))
            .get(0)
    }

    /// Progress rows a user has marked complete in a course.
    pub fn completed_rows(&self, user_id: UserId, course_id: CourseId) -> i64 {
        self.client()
            .query_one(
                concat!(
                    "SELECT count(*) FROM module_progress mp ",
                    "JOIN modules m ON m.id = mp.module_id ",
                    "WHERE mp.user_id = $1 AND m.course_id = $2 AND mp.is_completed"
                ),
                &[user_id.as_uuid(), &course_id.get()],
            )
            .unwrap_or_else(|err| panic!("completed rows: {}", format_postgres_error(&err)))
            .get(0)
    }

    /// Certificate rows for a user and course.
    pub fn certificate_rows(&self, user_id: UserId, course_id: CourseId) -> i64 {
        self.client()
            .query_one(
                "SELECT count(*) FROM certificates WHERE user_id = $1 AND course_id = $2",
                &[user_id.as_uuid(), &course_id.get()],
            )
            .unwrap_or_else(|err| panic!("certificates: {}", format_postgres_error(&err)))
            .get(0)
    }

    /// Remove one progress row to simulate drift.
    pub fn drop_progress_row(&self, user_id: UserId, module_id: i64) {
        self.client()
            .execute(
                "DELETE FROM module_progress WHERE user_id = $1 AND module_id = $2",
                &[user_id.as_uuid(), &module_id],
            )
            .unwrap_or_else(|err| panic!("drop progress: {}", format_postgres_error(&err)));
    }
}
