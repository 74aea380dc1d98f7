use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub security: SecurityConfig,

    pub uploads: UploadConfig,

    pub dashboard: DashboardConfig,

    pub scheduler: SchedulerConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Emit logs as JSON lines instead of the human readable format.
    pub json_logs: bool,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/certrack.db".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on session cookies.
    /// Set to false for local development without HTTPS.
    pub secure_cookies: bool,

    /// Sessions expire after this many minutes without a request.
    pub session_inactivity_minutes: i64,

    /// Requests slower than this are logged as warnings.
    pub slow_request_threshold_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            cors_allowed_origins: vec![
                "http://localhost:8000".to_string(),
                "http://127.0.0.1:8000".to_string(),
            ],
            secure_cookies: true,
            session_inactivity_minutes: 60,
            slow_request_threshold_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,

    /// Minimum length for user chosen passwords.
    pub min_password_length: usize,

    /// Length of generated temporary passwords.
    pub temporary_password_length: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            min_password_length: 8,
            temporary_password_length: 12,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Directory that stores profile images and certificate files.
    pub root: String,

    pub max_image_bytes: usize,

    pub max_document_bytes: usize,

    pub min_image_dimension: u32,

    pub max_image_dimension: u32,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            root: "data/uploads".to_string(),
            max_image_bytes: 5 * 1024 * 1024,
            max_document_bytes: 10 * 1024 * 1024,
            min_image_dimension: 50,
            max_image_dimension: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Window, in days, for the "expiring soon" classification.
    pub expiring_soon_days: i64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            expiring_soon_days: 90,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,

    /// Six-field cron expression (with seconds) for the expiry sweep,
    /// evaluated in the server's local time zone.
    pub expiry_sweep_cron: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            expiry_sweep_cron: "0 0 1 * * *".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "certrack".to_string());

        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("certrack").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".certrack").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    /// Applies `DATABASE_URL`, `DEBUG`, `CERTTRACK_LOG_LEVEL` and
    /// `CERTTRACK_PORT` from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()) {
            self.general.database_path = url;
        }

        if lookup("DEBUG").is_some_and(|v| is_truthy(&v)) {
            self.general.log_level = "debug".to_string();
            self.server.secure_cookies = false;
        }

        if let Some(level) = lookup("CERTTRACK_LOG_LEVEL").filter(|v| !v.trim().is_empty()) {
            self.general.log_level = level;
        }

        if let Some(port) = lookup("CERTTRACK_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid CERTTRACK_PORT: {port}"))?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.general.database_path.trim().is_empty() {
            anyhow::bail!("general.database_path cannot be empty");
        }

        if self.general.min_db_connections > self.general.max_db_connections {
            anyhow::bail!("general.min_db_connections cannot exceed max_db_connections");
        }

        if self.server.session_inactivity_minutes <= 0 {
            anyhow::bail!("server.session_inactivity_minutes must be > 0");
        }

        if self.security.temporary_password_length < 4 {
            anyhow::bail!("security.temporary_password_length must be at least 4");
        }

        if self.uploads.max_image_bytes == 0 || self.uploads.max_document_bytes == 0 {
            anyhow::bail!("Upload size limits must be > 0");
        }

        if self.uploads.min_image_dimension > self.uploads.max_image_dimension {
            anyhow::bail!("uploads.min_image_dimension cannot exceed max_image_dimension");
        }

        if self.dashboard.expiring_soon_days <= 0 {
            anyhow::bail!("dashboard.expiring_soon_days must be > 0");
        }

        if self.scheduler.enabled && self.scheduler.expiry_sweep_cron.trim().is_empty() {
            anyhow::bail!("scheduler.expiry_sweep_cron must be set when the scheduler is enabled");
        }

        Ok(())
    }

    /// Largest request body accepted by upload routes.
    #[must_use]
    pub fn max_upload_body_bytes(&self) -> usize {
        // multipart framing overhead on top of the file itself
        self.uploads
            .max_image_bytes
            .max(self.uploads.max_document_bytes)
            + 64 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.dashboard.expiring_soon_days, 90);
        assert_eq!(config.uploads.max_image_bytes, 5 * 1024 * 1024);
        assert_eq!(config.uploads.max_document_bytes, 10 * 1024 * 1024);
        assert_eq!(config.scheduler.expiry_sweep_cron, "0 0 1 * * *");
        assert!(config.server.secure_cookies);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[uploads]"));
        assert!(toml_str.contains("[scheduler]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [dashboard]
            expiring_soon_days = 30
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.dashboard.expiring_soon_days, 30);

        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("DATABASE_URL", "sqlite:/tmp/other.db"),
            ("DEBUG", "True"),
            ("CERTTRACK_PORT", "9000"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides_from(|k| vars.get(k).map(|v| (*v).to_string()))
            .unwrap();

        assert_eq!(config.general.database_path, "sqlite:/tmp/other.db");
        assert_eq!(config.general.log_level, "debug");
        assert!(!config.server.secure_cookies);
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_explicit_log_level_wins_over_debug() {
        let mut config = Config::default();
        config
            .apply_overrides_from(|k| match k {
                "DEBUG" => Some("1".to_string()),
                "CERTTRACK_LOG_LEVEL" => Some("warn".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.general.log_level, "warn");
    }

    #[test]
    fn test_invalid_port_override_fails() {
        let mut config = Config::default();
        let result = config.apply_overrides_from(|k| {
            (k == "CERTTRACK_PORT").then(|| "not-a-port".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_dimensions() {
        let mut config = Config::default();
        config.uploads.min_image_dimension = 6000;
        assert!(config.validate().is_err());
    }
}
