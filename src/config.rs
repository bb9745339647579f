use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::{
    infrastructure::keycloak_session::AdminCredentials,
    usecase::register_user_usecase::DEFAULT_ROLE,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// Key used to verify inbound bearer tokens.
#[derive(Clone)]
pub enum TokenKey {
    RsaPem(String),
    Secret(String),
}

impl std::fmt::Debug for TokenKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RsaPem(_) => f.write_str("RsaPem"),
            Self::Secret(_) => f.write_str("Secret(***)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeycloakConfig {
    pub url: Url,
    pub admin_realm: String,
    pub admin_client_id: String,
    pub credentials: AdminCredentials,
    pub target_realm: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub keycloak: KeycloakConfig,
    pub token_key: TokenKey,
    pub jwt_issuer: Option<String>,
    pub default_role: String,
    pub allow_self_registration: bool,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Reads configuration from the process environment (and `.env`, if loaded).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &'static str| lookup(name).filter(|v| !v.trim().is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                name: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let url = Url::parse(&require("KEYCLOAK_URL")?).map_err(|e| ConfigError::Invalid {
            name: "KEYCLOAK_URL",
            reason: e.to_string(),
        })?;

        let credentials = match get("KEYCLOAK_ADMIN_CLIENT_SECRET") {
            Some(secret) => AdminCredentials::ClientSecret(secret),
            None => AdminCredentials::Password {
                username: require("KEYCLOAK_ADMIN_USERNAME")?,
                password: require("KEYCLOAK_ADMIN_PASSWORD")?,
            },
        };

        let token_key = match (get("JWT_PUBLIC_KEY_PEM"), get("JWT_SECRET")) {
            (Some(pem), _) => TokenKey::RsaPem(pem),
            (None, Some(secret)) => TokenKey::Secret(secret),
            (None, None) => return Err(ConfigError::Missing("JWT_PUBLIC_KEY_PEM")),
        };

        let allow_self_registration = match get("ALLOW_SELF_REGISTRATION") {
            None => false,
            Some(v) => parse_bool(&v).ok_or(ConfigError::Invalid {
                name: "ALLOW_SELF_REGISTRATION",
                reason: format!("expected true or false, got '{v}'"),
            })?,
        };

        let log_format = match get("LOG_FORMAT").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("compact") => LogFormat::Compact,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "LOG_FORMAT",
                    reason: format!("unknown format '{other}'"),
                });
            }
        };

        Ok(Self {
            database_url: require("DATABASE_URL")?,
            bind_addr,
            keycloak: KeycloakConfig {
                url,
                admin_realm: get("KEYCLOAK_ADMIN_REALM").unwrap_or_else(|| "master".to_string()),
                admin_client_id: get("KEYCLOAK_ADMIN_CLIENT_ID")
                    .unwrap_or_else(|| "admin-cli".to_string()),
                credentials,
                target_realm: require("KEYCLOAK_TARGET_REALM")?,
            },
            token_key,
            jwt_issuer: get("JWT_ISSUER"),
            default_role: get("DEFAULT_ROLE").unwrap_or_else(|| DEFAULT_ROLE.to_string()),
            allow_self_registration,
            log_format,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
