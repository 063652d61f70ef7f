use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for Expo Console
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExpoConsoleConfig {
    /// Platform API connection
    pub api: ApiConfig,
    /// Per-view polling intervals
    pub polling: PollingConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Base URL of the REST API, e.g. https://expo.example/api
    pub base_url: String,
    /// Bearer token (can be set via env var)
    pub token: Option<String>,
    /// Per-request timeout
    pub timeout_seconds: u64,
    /// Client-side throttling
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Sustained requests per second
    pub requests_per_second: u32,
    /// Burst capacity
    pub burst_capacity: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollingConfig {
    pub event_detail_seconds: u64,
    pub events_list_seconds: u64,
    pub organizer_report_seconds: u64,
    pub monitoring_seconds: u64,
    pub sessions_seconds: u64,
    pub incidents_seconds: u64,
}

impl PollingConfig {
    pub fn event_detail(&self) -> Duration {
        secs(self.event_detail_seconds)
    }

    pub fn events_list(&self) -> Duration {
        secs(self.events_list_seconds)
    }

    pub fn organizer_report(&self) -> Duration {
        secs(self.organizer_report_seconds)
    }

    pub fn monitoring(&self) -> Duration {
        secs(self.monitoring_seconds)
    }

    pub fn sessions(&self) -> Duration {
        secs(self.sessions_seconds)
    }

    pub fn incidents(&self) -> Duration {
        secs(self.incidents_seconds)
    }
}

// Zero would make tokio's interval panic
fn secs(value: u64) -> Duration {
    Duration::from_secs(value.max(1))
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            event_detail_seconds: 30,
            events_list_seconds: 30,
            organizer_report_seconds: 30,
            monitoring_seconds: 10,
            sessions_seconds: 10,
            incidents_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
    /// Emit JSON log lines instead of compact text
    pub json_logs: bool,
}

impl Default for ExpoConsoleConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8000/api".to_string(),
                token: None, // Will be read from env var or .expo-console-rc
                timeout_seconds: 15,
                rate_limit: RateLimitConfig {
                    requests_per_second: 10,
                    burst_capacity: 20,
                },
            },
            polling: PollingConfig::default(),
            observability: ObservabilityConfig {
                log_level: "warn".to_string(),
                json_logs: false,
            },
        }
    }
}

impl ExpoConsoleConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (expo-console.toml, .expo-console-rc)
    /// 3. Environment variables (prefixed with EXPO_CONSOLE__)
    pub fn load() -> Result<Self> {
        let mut files = Vec::new();
        if Path::new("expo-console.toml").exists() {
            files.push(Path::new("expo-console.toml"));
        }
        if Path::new(".expo-console-rc").exists() {
            files.push(Path::new(".expo-console-rc"));
        }
        Self::load_from(&files)
    }

    /// Same layering as [`load`](Self::load) with explicit config files.
    pub fn load_from(files: &[&Path]) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        for path in files {
            builder = builder.add_source(File::from(*path).format(config::FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("EXPO_CONSOLE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let mut expo_config: ExpoConsoleConfig = builder.build()?.try_deserialize()?;

        // Token fallback for shells that already export it
        if expo_config.api.token.is_none() {
            if let Ok(token) = std::env::var("EXPO_API_TOKEN") {
                expo_config.api.token = Some(token);
            }
        }

        Ok(expo_config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<ExpoConsoleConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        // Load .env file first
        let _ = ExpoConsoleConfig::load_env_file();
        ExpoConsoleConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static ExpoConsoleConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let config = config()?;
    tracing::info!(base_url = %config.api.base_url, "Configuration loaded successfully");
    Ok(())
}
