//! Application settings loaded via OrthoConfig.
//!
//! Values come from `EXPENSE_TRACKER_*` environment variables or a
//! configuration file; anything unset falls back to the defaults below.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::HashingCost;
use crate::outbound::persistence::PoolConfig;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/expense_tracker";
const DEFAULT_HASH_PARALLELISM: u32 = 1;

/// Storage and hashing settings for the running service.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "EXPENSE_TRACKER")]
pub struct AppSettings {
    /// PostgreSQL connection string.
    pub database_url: Option<String>,
    /// Maximum pooled connections.
    #[ortho_config(default = 10)]
    pub pool_max_size: u32,
    /// Upper bound on any single store call, in seconds.
    #[ortho_config(default = 5)]
    pub query_timeout_secs: u64,
    /// Argon2 memory cost in KiB.
    #[ortho_config(default = 19_456)]
    pub password_hash_memory_kib: u32,
    /// Argon2 iteration count.
    #[ortho_config(default = 2)]
    pub password_hash_iterations: u32,
}

impl AppSettings {
    /// Configured database URL, or a local default.
    pub fn database_url(&self) -> &str {
        self.database_url.as_deref().unwrap_or(DEFAULT_DATABASE_URL)
    }

    /// Per-call store deadline.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    /// Pool settings derived from this configuration.
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::new(self.database_url())
            .with_max_size(self.pool_max_size)
            .with_query_timeout(self.query_timeout())
    }

    /// Argon2 cost parameters.
    pub fn hashing_cost(&self) -> HashingCost {
        HashingCost {
            memory_kib: self.password_hash_memory_kib,
            iterations: self.password_hash_iterations,
            parallelism: DEFAULT_HASH_PARALLELISM,
        }
    }
}
