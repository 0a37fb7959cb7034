//! Academy configuration loaded via OrthoConfig.
//!
//! Values come from `ACADEMY_*` environment variables, configuration files
//! and command-line flags, layered by OrthoConfig. Every field is optional;
//! accessors fall back to local-development defaults.

use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/academy";
const DEFAULT_POOL_MAX_SIZE: u32 = 10;
const DEFAULT_POOL_MIN_IDLE: u32 = 2;
const DEFAULT_POOL_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CERTIFICATE_DIR: &str = "uploads";
const DEFAULT_PUBLIC_BASE_URL: &str = "/uploads";

/// Configuration for the academy backend and its admin tool.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "ACADEMY")]
pub struct AcademySettings {
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Maximum pooled connections.
    pub pool_max_size: Option<u32>,
    /// Idle connections kept warm.
    pub pool_min_idle: Option<u32>,
    /// Connection checkout timeout in seconds.
    pub pool_timeout_secs: Option<u64>,
    /// Directory certificate artifacts are written under.
    pub certificate_dir: Option<PathBuf>,
    /// URL prefix under which `certificate_dir` is served.
    pub public_base_url: Option<String>,
}

impl AcademySettings {
    /// Return the configured database URL, falling back to the default.
    pub fn database_url(&self) -> &str {
        self.database_url.as_deref().unwrap_or(DEFAULT_DATABASE_URL)
    }

    /// Return the configured pool size, falling back to the default.
    pub fn pool_max_size(&self) -> u32 {
        self.pool_max_size.unwrap_or(DEFAULT_POOL_MAX_SIZE)
    }

    /// Return the configured idle connection count, capped at the pool size.
    pub fn pool_min_idle(&self) -> u32 {
        self.pool_min_idle
            .unwrap_or(DEFAULT_POOL_MIN_IDLE)
            .min(self.pool_max_size())
    }

    /// Return the configured checkout timeout.
    pub fn pool_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_timeout_secs.unwrap_or(DEFAULT_POOL_TIMEOUT_SECS))
    }

    /// Return the artifact directory, falling back to `./uploads`.
    pub fn certificate_dir(&self) -> PathBuf {
        self.certificate_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CERTIFICATE_DIR))
    }

    /// Return the public URL prefix for stored artifacts.
    pub fn public_base_url(&self) -> &str {
        self.public_base_url
            .as_deref()
            .unwrap_or(DEFAULT_PUBLIC_BASE_URL)
    }
}
