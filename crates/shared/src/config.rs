//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Identity assertion configuration.
    pub auth: AuthConfig,
    /// Session hint cookie configuration.
    #[serde(default)]
    pub session: SessionConfig,
    /// Auth bridge token configuration.
    pub bridge: BridgeConfig,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development: error details are exposed to clients.
    Development,
    /// Anything else.
    #[default]
    Production,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Deployment environment.
    #[serde(default)]
    pub environment: Environment,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: Environment::default(),
        }
    }
}

impl ServerConfig {
    /// Returns true when running in development mode.
    #[must_use]
    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL. Must use a role subject to RLS.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Allow starting with a role that is `SUPERUSER` or has `BYPASSRLS`.
    #[serde(default)]
    pub allow_rls_bypass_role: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Identity assertion configuration.
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret shared with the identity provider for verifying its tokens.
    pub identity_secret: String,
    /// Expected `aud` claim, if the identity provider sets one.
    #[serde(default)]
    pub identity_audience: Option<String>,
    /// Cookie carrying the identity token when no Authorization header is sent.
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("identity_secret", &"[hidden]")
            .field("identity_audience", &self.identity_audience)
            .field("session_cookie", &self.session_cookie)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            identity_secret: "change-me-in-production".to_string(),
            identity_audience: None,
            session_cookie: default_session_cookie(),
        }
    }
}

fn default_session_cookie() -> String {
    "sb-access-token".to_string()
}

/// Session hint cookie configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Cookie naming the preferred organization.
    #[serde(default = "default_organization_cookie")]
    pub organization_cookie: String,
    /// Cookie naming the preferred workspace.
    #[serde(default = "default_workspace_cookie")]
    pub workspace_cookie: String,
    /// Lifetime of hint cookies set by the organization switch endpoint.
    #[serde(default = "default_cookie_max_age_days")]
    pub cookie_max_age_days: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            organization_cookie: default_organization_cookie(),
            workspace_cookie: default_workspace_cookie(),
            cookie_max_age_days: default_cookie_max_age_days(),
        }
    }
}

fn default_organization_cookie() -> String {
    "current_organization_id".to_string()
}

fn default_workspace_cookie() -> String {
    "current_workspace_id".to_string()
}

fn default_cookie_max_age_days() -> i64 {
    30
}

/// Auth bridge token configuration.
#[derive(Clone, Deserialize)]
pub struct BridgeConfig {
    /// Secret used to sign bridge tokens.
    pub signing_secret: String,
}

impl std::fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("signing_secret", &"[hidden]")
            .finish()
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            signing_secret: "change-me-in-production".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("KEYSTONE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
