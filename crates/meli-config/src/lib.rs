//! Configuration for the meli branch engine.
//!
//! TOML file + `MELI_` environment overrides, admin token resolution
//! (env → keyring → plaintext), translation to
//! [`meli_core::EngineConfig`], and tracing setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use meli_core::{EngineConfig, ProxyConfig, SitesConfig, TlsVerification};

/// Keyring service holding the admin token.
pub const KEYRING_SERVICE: &str = "meli";
/// Keyring entry name of the admin token.
pub const KEYRING_TOKEN_ENTRY: &str = "proxy-token";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("token environment variable '{name}' is not set")]
    MissingToken { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("logging setup failed: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub proxy: ProxySection,
    #[serde(default)]
    pub sites: SitesSection,
    #[serde(default)]
    pub sync: SyncSection,
    #[serde(default)]
    pub log: LogSection,
}

/// `[proxy]`: how to reach the Caddy admin API.
#[derive(Debug, Deserialize, Serialize)]
pub struct ProxySection {
    #[serde(default = "default_admin_url")]
    pub admin_url: String,

    /// HTTP server block that owns site routes.
    #[serde(default = "default_server")]
    pub server: String,

    /// Admin request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Admin token (plaintext; prefer keyring or `token_env`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Environment variable holding the admin token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,
}

impl Default for ProxySection {
    fn default() -> Self {
        Self {
            admin_url: default_admin_url(),
            server: default_server(),
            timeout: default_timeout(),
            insecure: false,
            ca_cert: None,
            token: None,
            token_env: None,
        }
    }
}

/// `[sites]`: host layout and artifact root.
#[derive(Debug, Deserialize, Serialize)]
pub struct SitesSection {
    #[serde(default = "default_domain")]
    pub domain: String,

    #[serde(default = "default_root")]
    pub root: PathBuf,

    #[serde(default)]
    pub https: bool,
}

impl Default for SitesSection {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            root: default_root(),
            https: false,
        }
    }
}

/// `[sync]`: background proxy sync bounds.
#[derive(Debug, Deserialize, Serialize)]
pub struct SyncSection {
    #[serde(default = "default_sync_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            timeout_ms: default_sync_timeout_ms(),
        }
    }
}

/// `[log]`
#[derive(Debug, Deserialize, Serialize)]
pub struct LogSection {
    /// Default filter directive; `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_admin_url() -> String {
    meli_core::config::DEFAULT_ADMIN_URL.into()
}
fn default_server() -> String {
    "srv0".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_domain() -> String {
    "localhost".into()
}
fn default_root() -> PathBuf {
    PathBuf::from("/sites")
}
fn default_sync_timeout_ms() -> u64 {
    5000
}
fn default_log_level() -> String {
    "info".into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "meli", "meli").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("meli");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load Config from `path` + environment. A missing file yields defaults.
///
/// Environment variables use the `MELI_` prefix with `__` between
/// section and key, e.g. `MELI_PROXY__ADMIN_URL`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("MELI_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to the canonical path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the admin token.
///
/// `token_env` → system keyring → plaintext `token`. No token at all is
/// fine (the admin endpoint is often unauthenticated), but a configured
/// `token_env` that is unset is an error.
pub fn resolve_token(proxy: &ProxySection) -> Result<Option<SecretString>, ConfigError> {
    // 1. Named environment variable
    if let Some(ref env_name) = proxy.token_env {
        return match std::env::var(env_name) {
            Ok(val) => Ok(Some(SecretString::from(val))),
            Err(_) => Err(ConfigError::MissingToken {
                name: env_name.clone(),
            }),
        };
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, KEYRING_TOKEN_ENTRY) {
        if let Ok(secret) = entry.get_password() {
            return Ok(Some(SecretString::from(secret)));
        }
    }

    // 3. Plaintext in config
    Ok(proxy.token.clone().map(SecretString::from))
}

// ── Translation ─────────────────────────────────────────────────────

/// Build the engine's runtime config, resolving the admin token.
pub fn to_engine_config(cfg: &Config) -> Result<EngineConfig, ConfigError> {
    let admin_url: url::Url = cfg.proxy.admin_url.parse().map_err(|_| {
        invalid(
            "proxy.admin_url",
            format!("invalid URL: {}", cfg.proxy.admin_url),
        )
    })?;

    if cfg.proxy.server.trim().is_empty() {
        return Err(invalid("proxy.server", "must not be empty"));
    }
    if cfg.proxy.timeout == 0 {
        return Err(invalid("proxy.timeout", "must be at least 1 second"));
    }
    if cfg.sync.timeout_ms == 0 {
        return Err(invalid("sync.timeout_ms", "must be greater than zero"));
    }
    if cfg.sites.domain.trim().is_empty() {
        return Err(invalid("sites.domain", "must not be empty"));
    }

    let tls = if cfg.proxy.insecure {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = cfg.proxy.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let proxy = ProxyConfig {
        admin_url,
        server: cfg.proxy.server.clone(),
        tls,
        timeout: Duration::from_secs(cfg.proxy.timeout),
        token: resolve_token(&cfg.proxy)?,
    };
    let sites = SitesConfig {
        domain: cfg.sites.domain.clone(),
        root: cfg.sites.root.clone(),
        https: cfg.sites.https,
    };
    Ok(EngineConfig {
        sync_timeout: Duration::from_millis(cfg.sync.timeout_ms),
        ..EngineConfig::new(proxy, sites)
    })
}

// ── Logging ─────────────────────────────────────────────────────────

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides `log.level` when set.
pub fn init_tracing(log: &LogSection) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log.level))
        .map_err(|e| invalid("log.level", e.to_string()))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let result = if log.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| ConfigError::Logging(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_translate() {
        let engine = to_engine_config(&Config::default()).unwrap();
        assert_eq!(engine.proxy.admin_url.as_str(), "http://localhost:2019/");
        assert_eq!(engine.proxy.server, "srv0");
        assert_eq!(engine.proxy.tls, TlsVerification::SystemDefaults);
        assert_eq!(engine.sync_timeout, Duration::from_millis(5000));
        assert_eq!(engine.sites.domain, "localhost");
    }

    #[test]
    fn insecure_wins_over_ca_cert() {
        let mut cfg = Config::default();
        cfg.proxy.insecure = true;
        cfg.proxy.ca_cert = Some("/etc/ca.pem".into());
        let engine = to_engine_config(&cfg).unwrap();
        assert_eq!(engine.proxy.tls, TlsVerification::DangerAcceptInvalid);

        cfg.proxy.insecure = false;
        let engine = to_engine_config(&cfg).unwrap();
        assert_eq!(
            engine.proxy.tls,
            TlsVerification::CustomCa("/etc/ca.pem".into())
        );
    }

    #[test]
    fn bad_values_are_rejected() {
        let mut cfg = Config::default();
        cfg.proxy.admin_url = "not a url".into();
        assert!(matches!(
            to_engine_config(&cfg),
            Err(ConfigError::Validation { ref field, .. }) if field == "proxy.admin_url"
        ));

        let mut cfg = Config::default();
        cfg.sync.timeout_ms = 0;
        assert!(to_engine_config(&cfg).is_err());
    }
}
