use config::{Config, ConfigError};
use serde::Deserialize;

pub use common::config::{
    CacheConfig, CouponConfig, DatabaseConfig, MqAppConfig, TelegramConfig,
};

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    #[serde(default)]
    pub allow_origins: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

fn default_cors_max_age() -> u64 {
    3600
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: vec![],
            max_age: default_cors_max_age(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            cors: CorsConfig::default(),
        }
    }
}

/// Background reconciliation of assets and requests that stopped moving.
#[derive(Debug, Deserialize, Clone)]
pub struct ReconcileConfig {
    #[serde(default = "default_reconcile_enabled")]
    pub enabled: bool,
    /// Age after which an in-flight asset or pending request counts as stuck.
    #[serde(default = "default_stuck_timeout_secs")]
    pub stuck_timeout_secs: u64,
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
}

fn default_reconcile_enabled() -> bool {
    true
}
fn default_stuck_timeout_secs() -> u64 {
    900
}
fn default_scan_interval_secs() -> u64 {
    60
}

impl ReconcileConfig {
    pub fn stuck_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.stuck_timeout_secs as i64)
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            enabled: default_reconcile_enabled(),
            stuck_timeout_secs: default_stuck_timeout_secs(),
            scan_interval_secs: default_scan_interval_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ValidationConfig {
    /// Extra words rejected as child names, on top of the built-in list.
    #[serde(default)]
    pub denylist: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AdminConfig {
    /// Bearer token for the admin endpoints. Empty disables them.
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub coupons: CouponConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("mq.url", "redis://localhost:6379")?
            .set_default("mq.queue_name", "video_generation")?
            .set_default("mq.dlq_queue_name", "video_generation_dlq")?;

        // Override from environment (e.g., NAMECAST__ADMIN__TOKEN)
        common::config::layered(defaults)?.build()?.try_deserialize()
    }
}
