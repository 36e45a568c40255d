use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

const ENV_PREFIX: &str = "CAKEHOUSE";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub seed: SeedConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
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

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
}

/// Optional bootstrap administrator, created at startup when no admin exists.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SeedConfig {
    pub admin_name: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub json: bool,
}

fn default_database_url() -> String {
    "sqlite://cakehouse.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_token_expiry() -> i64 {
    3600 // 1 hour
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_allowed_origin() -> String {
    "http://localhost:5173".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origin: default_allowed_origin(),
        }
    }
}

impl AppConfig {
    /// Parse configuration from TOML text, without environment overrides.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;

        let app_config: Self = config.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Load `cakehouse.toml` (optional) with environment variable overrides.
    ///
    /// Environment variables use the `CAKEHOUSE` prefix and `__` between
    /// path segments, e.g. `CAKEHOUSE__AUTH__JWT_SECRET` or
    /// `CAKEHOUSE__SERVER__PORT`.
    ///
    /// Returns the config and the dotted keys that came from the environment.
    pub fn load_with_env() -> Result<(Self, Vec<String>), ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("cakehouse").required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?;

        let overrides = env_overrides(std::env::vars().map(|(key, _)| key));

        let app_config: Self = config.try_deserialize()?;
        app_config.validate()?;
        Ok((app_config, overrides))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Message("auth.jwt_secret must not be empty".to_string()));
        }
        if self.auth.token_expiry_seconds <= 0 {
            return Err(ConfigError::Message(
                "auth.token_expiry_seconds must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Map `CAKEHOUSE__SECTION__KEY` variable names to `section.key`.
fn env_overrides(keys: impl Iterator<Item = String>) -> Vec<String> {
    let prefix = format!("{ENV_PREFIX}{ENV_SEPARATOR}");
    let mut overrides: Vec<String> = keys
        .filter_map(|key| {
            key.strip_prefix(&prefix)
                .map(|rest| rest.split(ENV_SEPARATOR).collect::<Vec<_>>().join(".").to_lowercase())
        })
        .collect();
    overrides.sort();
    overrides
}
