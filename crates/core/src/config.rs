use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// `sqlite::memory:` or `sqlite://<path>`
    pub url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_token_expiry")]
    pub token_expiry_seconds: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_token_expiry() -> i64 {
    15 * 24 * 60 * 60 // 15 days
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

/// Plain variables honoured on top of the prefixed ones, highest precedence.
const PLAIN_OVERRIDES: [(&str, &str); 3] = [
    ("DATABASE_URL", "database.url"),
    ("JWT_SECRET", "auth.jwt_secret"),
    ("PORT", "server.port"),
];

/// Prefixed variables, e.g. BOOKSHELF_DATABASE__URL or BOOKSHELF_AUTH__JWT_SECRET.
const PREFIXED_OVERRIDES: [(&str, &str); 6] = [
    ("BOOKSHELF_DATABASE__URL", "database.url"),
    ("BOOKSHELF_DATABASE__TIMEOUT_MS", "database.timeout_ms"),
    ("BOOKSHELF_AUTH__JWT_SECRET", "auth.jwt_secret"),
    ("BOOKSHELF_AUTH__TOKEN_EXPIRY_SECONDS", "auth.token_expiry_seconds"),
    ("BOOKSHELF_SERVER__HOST", "server.host"),
    ("BOOKSHELF_SERVER__PORT", "server.port"),
];

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from an optional file with environment overrides.
    ///
    /// Returns the config and the keys that were overridden by environment
    /// variables, so the caller can report them.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<(Self, Vec<String>), ConfigError> {
        let mut builder = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix("BOOKSHELF")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        for (env_var, config_key) in PLAIN_OVERRIDES {
            builder = builder.set_override_option(config_key, std::env::var(env_var).ok())?;
        }

        let mut overrides = Vec::new();
        for (env_var, config_key) in PREFIXED_OVERRIDES.iter().chain(PLAIN_OVERRIDES.iter()) {
            if std::env::var(env_var).is_ok() && !overrides.iter().any(|k| k == config_key) {
                overrides.push(config_key.to_string());
            }
        }

        let app_config = builder.build()?.try_deserialize()?;
        Ok((app_config, overrides))
    }
}
