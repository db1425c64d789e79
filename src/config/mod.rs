//! # Configuration Management Module
//!
//! Centralized configuration for the mallpoints engine: type-safe structures
//! with serde, validation on load, sensible defaults, and TOML persistence.
//!
//! ## Configuration Structure
//!
//! - [`MallConfig`] - Mall identity and presentation
//! - [`EconomyConfig`] - Reward divisors and mission limits
//! - [`SecurityConfig`] - Token signing, TTLs, and login rate limits
//! - [`StorageConfig`] - Data directory for the sled store
//! - [`CacheConfig`] - Memory tier capacity and TTLs
//! - [`LoggingConfig`] - Log level and optional log file
//!
//! ## Configuration File Format
//!
//! ```toml
//! [mall]
//! name = "Harbor Plaza"
//! location = "Waterfront District"
//!
//! [economy]
//! coin_divisor = 10
//! xp_divisor = 2
//!
//! [security]
//! token_ttl_minutes = 60
//! max_login_attempts = 5
//! ```

use anyhow::{anyhow, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::fs;

/// Main configuration structure

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MallConfig {
    pub name: String,
    pub location: String,
    pub description: String,
    /// Offset from UTC in hours, used to bucket receipts by local
    /// time of day.
    #[serde(default)]
    pub timezone_offset_hours: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Currency units per base coin.
    pub coin_divisor: u64,
    /// Coins per XP point.
    pub xp_divisor: u64,
    /// Cap on concurrently active missions per member.
    pub max_active_missions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Hex-encoded HS256 signing secret, generated by `mallpoints init`.
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    pub max_login_attempts: usize,
    pub login_window_secs: i64,
    pub lockout_secs: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_password_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub memory_capacity: usize,
    pub ttl_secs: i64,
    /// Redis URL for the optional middle tier (requires the `redis-cache`
    /// feature).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub mall: MallConfig,
    pub economy: EconomyConfig,
    pub security: SecurityConfig,
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// Generate a fresh hex-encoded signing secret.
pub fn generate_secret() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mall: MallConfig {
                name: "Harbor Plaza".to_string(),
                location: "Waterfront District".to_string(),
                description: "Customer engagement program".to_string(),
                timezone_offset_hours: 0,
            },
            economy: EconomyConfig {
                coin_divisor: 10,
                xp_divisor: 2,
                max_active_missions: 3,
            },
            security: SecurityConfig {
                jwt_secret: generate_secret(),
                token_ttl_minutes: 60,
                max_login_attempts: 5,
                login_window_secs: 300,
                lockout_secs: 900,
                admin_password_hash: None,
            },
            storage: StorageConfig {
                data_dir: "./data".to_string(),
            },
            cache: CacheConfig {
                memory_capacity: 256,
                ttl_secs: 300,
                redis_url: None,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: None,
            },
        }
    }
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Cannot read config file '{}': {}", path, e))?;
        let config: Config =
            toml::from_str(&content).map_err(|e| anyhow!("Invalid config file: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Persist the configuration back to a TOML file.
    pub async fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Write a default configuration file. Fails if one already exists.
    pub async fn create_default(path: &str) -> Result<Config> {
        if fs::try_exists(path).await.unwrap_or(false) {
            return Err(anyhow!("Config file '{}' already exists", path));
        }
        let config = Config::default();
        config.save(path).await?;
        Ok(config)
    }

    /// Validate all configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.mall.name.trim().is_empty() {
            return Err(anyhow!("mall.name must not be empty"));
        }
        if !(-12..=14).contains(&self.mall.timezone_offset_hours) {
            return Err(anyhow!("mall.timezone_offset_hours out of range"));
        }
        if self.economy.coin_divisor == 0 {
            return Err(anyhow!("economy.coin_divisor must be positive"));
        }
        if self.economy.xp_divisor == 0 {
            return Err(anyhow!("economy.xp_divisor must be positive"));
        }
        if self.economy.max_active_missions == 0 {
            return Err(anyhow!("economy.max_active_missions must be positive"));
        }
        if self.security.jwt_secret.len() < 32 {
            return Err(anyhow!("security.jwt_secret too short (min 32 hex chars)"));
        }
        if self.security.token_ttl_minutes <= 0 {
            return Err(anyhow!("security.token_ttl_minutes must be positive"));
        }
        if self.security.max_login_attempts == 0 {
            return Err(anyhow!("security.max_login_attempts must be positive"));
        }
        if self.storage.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir must not be empty"));
        }
        if self.cache.memory_capacity == 0 {
            return Err(anyhow!("cache.memory_capacity must be positive"));
        }
        if self.cache.ttl_secs <= 0 {
            return Err(anyhow!("cache.ttl_secs must be positive"));
        }
        match self.logging.level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            other => return Err(anyhow!("logging.level '{}' not recognized", other)),
        }
        Ok(())
    }
}
