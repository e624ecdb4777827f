use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Secret shipped in the defaults, rejected by `validate` in release builds
pub const DEFAULT_JWT_SECRET: &str = "change-me-livehub-jwt-secret";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub logging: LoggingConfig,
    pub hub: HubConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: 3001,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL URL. Empty selects the in-memory store.
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 20,
            min_connections: 2,
            connect_timeout_seconds: 10,
            idle_timeout_seconds: 600,
            run_migrations: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    /// HS256 shared secret
    pub secret: String,
    /// Clock skew tolerated when checking `exp`
    pub leeway_seconds: u64,
    pub access_token_minutes: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: DEFAULT_JWT_SECRET.to_string(),
            leeway_seconds: 60,
            access_token_minutes: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

/// Real-time hub limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Maximum simultaneous connections for the process
    pub max_connections: usize,
    /// Maximum members in a single room
    pub max_per_room: usize,
    /// Per-connection outbound queue capacity
    pub outbound_buffer: usize,
    /// Largest inbound WebSocket frame accepted
    pub max_message_bytes: usize,
    /// How long shutdown waits for connections to drain
    pub drain_timeout_seconds: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections: 10_000,
            max_per_room: 5_000,
            outbound_buffer: 256,
            max_message_bytes: 64 * 1024,
            drain_timeout_seconds: 30,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // LIVEHUB_SERVER_HOST, LIVEHUB_HUB_OUTBOUND_BUFFER, ...
        builder = builder.add_source(
            Environment::with_prefix("LIVEHUB")
                .separator("_")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only (for Docker/K8s)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// Whether persistence goes to PostgreSQL instead of the in-memory store
    #[must_use]
    pub fn uses_database(&self) -> bool {
        !self.database.url.trim().is_empty()
    }

    /// Get HTTP address
    #[must_use]
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.http_port)
    }

    /// Collect every misconfiguration instead of stopping at the first one
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.server.http_port == 0 {
            errors.push("server.http_port must be non-zero".to_string());
        }
        if self.jwt.secret.trim().is_empty() {
            errors.push("jwt.secret must not be empty".to_string());
        } else if !cfg!(debug_assertions) && self.jwt.secret == DEFAULT_JWT_SECRET {
            errors.push("jwt.secret still uses the built-in default".to_string());
        }
        if self.jwt.access_token_minutes <= 0 {
            errors.push("jwt.access_token_minutes must be positive".to_string());
        }
        if self.hub.outbound_buffer == 0 {
            errors.push("hub.outbound_buffer must be at least 1".to_string());
        }
        if self.hub.max_connections == 0 || self.hub.max_per_room == 0 {
            errors.push("hub connection limits must be at least 1".to_string());
        }
        if self.hub.max_message_bytes < 1024 {
            errors.push("hub.max_message_bytes must be at least 1024".to_string());
        }
        if self.uses_database() && self.database.min_connections > self.database.max_connections {
            errors.push(format!(
                "database.min_connections ({}) exceeds database.max_connections ({})",
                self.database.min_connections, self.database.max_connections
            ));
        }
        let format = self.logging.format.as_str();
        if format != "json" && format != "pretty" {
            errors.push(format!("logging.format must be json or pretty, got {format}"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
