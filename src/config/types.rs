// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub static_files: StaticFilesConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub max_body_size: u64,
}

/// REST namespace configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Path prefix of the API namespace, e.g. `/api/`
    pub prefix: String,
    /// Field stamped with the document id
    pub id_field: String,
}

/// Document storage configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root directory holding one subdirectory per collection
    pub data_dir: String,
}

/// Static file fallback configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StaticFilesConfig {
    pub root: String,
    pub index_files: Vec<String>,
}
