// Centralized configuration management for PostPilot Backend
// Load ALL env vars ONCE at startup

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Global application configuration loaded once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(|| {
    // For tests, load .env file first
    #[cfg(test)]
    dotenv::dotenv().ok();

    AppConfig::from_env().expect("Failed to load configuration")
});

/// Accessor used across the codebase
pub fn config() -> &'static AppConfig {
    &CONFIG
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    // Server
    pub bind_address: String,
    pub port: u16,
    pub environment: Environment,
    pub rust_log: String,

    // Database
    pub database_url: String,
    pub database_max_connections: u32,
    pub database_min_connections: u32,
    pub database_connect_timeout: u64,
    pub database_idle_timeout: u64,
    pub database_max_lifetime: u64,

    // JWT
    pub jwt_access_secret: String,
    pub jwt_access_expiry: u64,
    pub jwt_audience: String,
    pub jwt_issuer: String,

    // Security
    pub cors_allowed_origins: Vec<String>,

    // Features
    pub disable_embedded_migrations: bool,
    pub enable_token_refresh_task: bool,

    // Nested configs
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub instagram: InstagramConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub environment: Environment,
    pub rust_log: String,
}

/// Environment type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Environment {
    Development,
    Test,
    Staging,
    Production,
}

impl From<String> for Environment {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            "test" => Environment::Test,
            "staging" | "stage" => Environment::Staging,
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: u64,
    pub idle_timeout: u64,
    pub max_lifetime: u64,
}

/// JWT configuration (access tokens only - no refresh rotation in this product)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub access_secret: String,
    pub access_expiry: u64,
    pub audience: String,
    pub issuer: String,
}

/// Facebook/Instagram Graph API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstagramConfig {
    pub app_id: String,
    pub app_secret: String,
    /// Base URL for the Graph API; overridable for staging proxies
    pub graph_api_base: String,
    /// API version used by the OAuth/account-resolution endpoints
    pub oauth_api_version: String,
    /// API version used by the media publish endpoints
    pub publish_api_version: String,
    /// Per-request timeout for Graph calls, in seconds
    pub request_timeout_secs: u64,
    /// Refresh tokens whose expiry falls within this many days
    pub token_refresh_lead_days: i64,
    /// Interval between proactive refresh sweeps, in seconds
    pub token_refresh_interval_secs: u64,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Helper function to get required env var
        let get_required = |key: &str| -> Result<String, ConfigError> {
            env::var(key).map_err(|_| ConfigError::MissingVar(key.to_string()))
        };

        // Helper function to get optional env var with default
        let get_or_default = |key: &str, default: &str| -> String {
            env::var(key).unwrap_or_else(|_| default.to_string())
        };

        // Helper function to parse env var with default
        let parse_or_default = |key: &str, default: &str| -> Result<u32, ConfigError> {
            get_or_default(key, default).parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid u32".to_string())
            })
        };

        let parse_u64_or_default = |key: &str, default: &str| -> Result<u64, ConfigError> {
            get_or_default(key, default).parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid u64".to_string())
            })
        };

        let parse_bool_or_default = |key: &str, default: &str| -> bool {
            get_or_default(key, default).to_lowercase() == "true"
        };

        // Parse bind address to extract port
        let bind_address = get_or_default("BIND_ADDRESS", "0.0.0.0:8080");
        let port = bind_address
            .rsplit(':')
            .next()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        // JWT secret validation
        let jwt_access_secret = get_required("JWT_ACCESS_SECRET")?;
        if jwt_access_secret.len() < 32 {
            return Err(ConfigError::InvalidValue(
                "JWT_ACCESS_SECRET".to_string(),
                "Secret must be at least 32 characters long".to_string(),
            ));
        }

        let environment_str = get_or_default("ENVIRONMENT", "development");
        let environment = Environment::from(environment_str);

        // Database
        let database_url = get_required("DATABASE_URL")?;
        let database_max_connections = parse_or_default("DATABASE_MAX_CONNECTIONS", "100")?;
        let database_min_connections = parse_or_default("DATABASE_MIN_CONNECTIONS", "10")?;
        let database_connect_timeout = parse_u64_or_default("DATABASE_CONNECT_TIMEOUT", "30")?;
        let database_idle_timeout = parse_u64_or_default("DATABASE_IDLE_TIMEOUT", "600")?;
        let database_max_lifetime = parse_u64_or_default("DATABASE_MAX_LIFETIME", "1800")?;

        let jwt_access_expiry = parse_u64_or_default("JWT_ACCESS_EXPIRY", "3600")?;
        let jwt_audience = get_or_default("JWT_AUDIENCE", "postpilot.app");
        let jwt_issuer = get_or_default("JWT_ISSUER", "postpilot.app");

        let cors_allowed_origins: Vec<String> = get_or_default("CORS_ALLOWED_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        // Facebook/Instagram app credentials for the Graph OAuth exchanges
        let instagram_app_id = get_required("INSTAGRAM_APP_ID")?;
        let instagram_app_secret = get_required("INSTAGRAM_APP_SECRET")?;
        let graph_api_base =
            get_or_default("GRAPH_API_BASE_URL", "https://graph.facebook.com");
        let oauth_api_version = get_or_default("GRAPH_OAUTH_API_VERSION", "v18.0");
        let publish_api_version = get_or_default("GRAPH_PUBLISH_API_VERSION", "v20.0");
        let graph_request_timeout = parse_u64_or_default("GRAPH_REQUEST_TIMEOUT_SECS", "15")?;
        let token_refresh_lead_days =
            parse_u64_or_default("INSTAGRAM_TOKEN_REFRESH_LEAD_DAYS", "7")? as i64;
        let token_refresh_interval_secs =
            parse_u64_or_default("INSTAGRAM_TOKEN_REFRESH_INTERVAL_SECS", "3600")?;

        let disable_embedded_migrations =
            parse_bool_or_default("DISABLE_EMBEDDED_MIGRATIONS", "false");
        let enable_token_refresh_task =
            parse_bool_or_default("ENABLE_TOKEN_REFRESH_TASK", "true");

        let rust_log = get_or_default("RUST_LOG", "info");

        // Nested configs
        let server = ServerConfig {
            bind_address: bind_address.clone(),
            port,
            environment: environment.clone(),
            rust_log: rust_log.clone(),
        };

        let database = DatabaseConfig {
            url: database_url.clone(),
            max_connections: database_max_connections,
            min_connections: database_min_connections,
            connect_timeout: database_connect_timeout,
            idle_timeout: database_idle_timeout,
            max_lifetime: database_max_lifetime,
        };

        let jwt = JwtConfig {
            access_secret: jwt_access_secret.clone(),
            access_expiry: jwt_access_expiry,
            audience: jwt_audience.clone(),
            issuer: jwt_issuer.clone(),
        };

        let instagram = InstagramConfig {
            app_id: instagram_app_id,
            app_secret: instagram_app_secret,
            graph_api_base,
            oauth_api_version,
            publish_api_version,
            request_timeout_secs: graph_request_timeout,
            token_refresh_lead_days,
            token_refresh_interval_secs,
        };

        Ok(AppConfig {
            bind_address,
            port,
            environment,
            rust_log,
            database_url,
            database_max_connections,
            database_min_connections,
            database_connect_timeout,
            database_idle_timeout,
            database_max_lifetime,
            jwt_access_secret,
            jwt_access_expiry,
            jwt_audience,
            jwt_issuer,
            cors_allowed_origins,
            disable_embedded_migrations,
            enable_token_refresh_task,
            server,
            database,
            jwt,
            instagram,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_from_string() {
        assert_eq!(Environment::from("dev".to_string()), Environment::Development);
        assert_eq!(Environment::from("PRODUCTION".to_string()), Environment::Production);
        assert_eq!(Environment::from("stage".to_string()), Environment::Staging);
        assert_eq!(Environment::from("unknown".to_string()), Environment::Development);
    }

    #[test]
    fn test_environment_display() {
        assert_eq!(Environment::Test.to_string(), "test");
        assert_eq!(Environment::Production.to_string(), "production");
    }
}
