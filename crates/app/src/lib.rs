//! VoxFlow application: configuration plus the job pipeline runtime.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// "local" or "remote".
    pub kind: String,
    pub model: String,
    /// ISO 639-1 hint; None lets the engine auto-detect.
    pub language: Option<String>,
    /// Hard deadline for a single backend call.
    pub timeout_secs: u64,
    pub local_binary: String,
    pub remote_endpoint: Option<String>,
    pub remote_api_key: Option<String>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            kind: "local".to_string(),
            model: "small".to_string(),
            language: None,
            timeout_secs: 600,
            local_binary: "whisper-cli".to_string(),
            remote_endpoint: None,
            remote_api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Absolute ceiling regardless of tier.
    pub max_file_size_mb: u64,
    pub free_daily_limit_minutes: u64,
    pub pro_daily_limit_minutes: u64,
    pub queue_capacity: usize,
    pub worker_pool_size: usize,
    /// Snapshot file for the tier store; None keeps state in memory.
    pub store_path: Option<String>,
    /// Legacy static PRO list, migrated into the store at startup.
    #[serde(default)]
    pub legacy_pro_user_ids: Vec<u64>,
    #[serde(default)]
    pub backend: BackendSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            max_file_size_mb: 20,
            free_daily_limit_minutes: 30,
            pro_daily_limit_minutes: 180,
            queue_capacity: 32,
            worker_pool_size: 2,
            store_path: None,
            legacy_pro_user_ids: Vec::new(),
            backend: BackendSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from a specific config file path (for tests)
    pub fn from_path(config_path: impl AsRef<Path>) -> Result<Self, String> {
        let builder = Self::defaults_builder()
            .add_source(File::from(config_path.as_ref()).required(true))
            .add_source(Environment::with_prefix("VOXFLOW").separator("__"));

        let config = builder
            .build()
            .map_err(|e| format!("Failed to build config: {e}"))?;
        let mut settings: Settings = config
            .try_deserialize()
            .map_err(|e| format!("Failed to deserialize settings: {e}"))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn new() -> Result<Self, String> {
        let mut builder = Self::defaults_builder();

        let config_path = Path::new("config/default.toml");
        if config_path.exists() {
            tracing::info!("Loading configuration from: {}", config_path.display());
            builder = builder.add_source(File::from(config_path).required(true));
        } else {
            tracing::warn!(
                "No configuration file at 'config/default.toml'. Using defaults and environment variables."
            );
        }

        builder = builder.add_source(Environment::with_prefix("VOXFLOW").separator("__"));

        let config = builder
            .build()
            .map_err(|e| format!("Failed to build config: {e}"))?;
        let mut settings: Settings = config
            .try_deserialize()
            .map_err(|e| format!("Failed to deserialize settings: {e}"))?;
        settings.validate()?;
        Ok(settings)
    }

    fn defaults_builder() -> config::ConfigBuilder<config::builder::DefaultState> {
        let defaults = Settings::default();
        Config::builder()
            .set_default("max_file_size_mb", defaults.max_file_size_mb)
            .unwrap()
            .set_default("free_daily_limit_minutes", defaults.free_daily_limit_minutes)
            .unwrap()
            .set_default("pro_daily_limit_minutes", defaults.pro_daily_limit_minutes)
            .unwrap()
            .set_default("queue_capacity", defaults.queue_capacity as u64)
            .unwrap()
            .set_default("worker_pool_size", defaults.worker_pool_size as u64)
            .unwrap()
    }

    pub fn validate(&mut self) -> Result<(), String> {
        let mut errors = Vec::new();

        if !["local", "remote"].contains(&self.backend.kind.to_lowercase().as_str()) {
            tracing::warn!(
                "Invalid backend kind '{}'. Defaulting to 'local'.",
                self.backend.kind
            );
            self.backend.kind = "local".to_string();
        }
        self.backend.kind = self.backend.kind.to_lowercase();

        if self.max_file_size_mb == 0 {
            errors.push("max_file_size_mb must be >0".to_string());
        }
        if self.free_daily_limit_minutes == 0 {
            errors.push("free_daily_limit_minutes must be >0".to_string());
        }
        if self.pro_daily_limit_minutes < self.free_daily_limit_minutes {
            tracing::warn!(
                "pro_daily_limit_minutes {} below free limit {}. Raising to the free limit.",
                self.pro_daily_limit_minutes,
                self.free_daily_limit_minutes
            );
            self.pro_daily_limit_minutes = self.free_daily_limit_minutes;
        }
        if self.queue_capacity == 0 {
            errors.push("queue_capacity must be >0".to_string());
        }
        if self.worker_pool_size == 0 {
            errors.push("worker_pool_size must be >0".to_string());
        }
        if self.backend.timeout_secs == 0 {
            errors.push("backend.timeout_secs must be >0".to_string());
        }
        if self.backend.kind == "remote"
            && self
                .backend
                .remote_endpoint
                .as_deref()
                .unwrap_or("")
                .is_empty()
        {
            errors.push("backend.remote_endpoint is required for the remote backend".to_string());
        }

        if !errors.is_empty() {
            return Err(format!("Critical config validation errors: {errors:?}"));
        }
        Ok(())
    }
}

pub mod job;
pub mod payments;
pub mod pipeline;
pub mod runtime;
