// ── Runtime engine configuration ──
//
// These types describe how to reach the proxy admin API and how site
// hosts are laid out. They never touch disk: `meli-config` builds an
// `EngineConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use meli_proxy::{TlsMode, TransportConfig};

/// TLS verification strategy for the admin endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed admin listener).
    DangerAcceptInvalid,
}

/// Caddy's stock admin listener.
pub const DEFAULT_ADMIN_URL: &str = "http://localhost:2019";

/// Upper bound on one background proxy sync unless configured otherwise.
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_millis(5000);

/// How to reach the reverse proxy's admin API.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Admin listener URL (e.g., `http://localhost:2019`).
    pub admin_url: Url,
    /// Caddy HTTP server block that owns site routes.
    pub server: String,
    pub tls: TlsVerification,
    /// Per-request timeout for admin calls.
    pub timeout: Duration,
    pub token: Option<SecretString>,
}

impl ProxyConfig {
    /// Stock settings for the admin listener at `admin_url`.
    pub fn new(admin_url: Url) -> Self {
        Self {
            admin_url,
            server: "srv0".into(),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(10),
            token: None,
        }
    }

    /// Build a [`TransportConfig`] for the proxy client.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
            token: self.token.clone(),
        }
    }
}

/// Where site content lives and which hosts branches are served on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitesConfig {
    /// Base domain: branches are served on `{slug}.{site}.{domain}`.
    pub domain: String,
    /// Directory holding release artifacts as `{root}/{site_id}/{release_id}`.
    pub root: PathBuf,
    /// Advertise `https://` URLs.
    pub https: bool,
}

impl Default for SitesConfig {
    fn default() -> Self {
        Self {
            domain: "localhost".into(),
            root: PathBuf::from("/sites"),
            https: false,
        }
    }
}

/// Everything the branch engine needs at runtime.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub proxy: ProxyConfig,
    pub sites: SitesConfig,
    /// Upper bound on a single background proxy sync.
    pub sync_timeout: Duration,
    /// bcrypt cost used when hashing branch passwords.
    pub password_cost: u32,
}

impl EngineConfig {
    /// Default sync timeout and bcrypt cost around the given proxy and
    /// site layout.
    pub fn new(proxy: ProxyConfig, sites: SitesConfig) -> Self {
        Self {
            proxy,
            sites,
            sync_timeout: DEFAULT_SYNC_TIMEOUT,
            password_cost: bcrypt::DEFAULT_COST,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn engine_config_defaults_around_given_proxy() {
        let url: Url = "http://caddy.internal:2019".parse().unwrap();
        let config = EngineConfig::new(ProxyConfig::new(url.clone()), SitesConfig::default());

        assert_eq!(config.proxy.admin_url, url);
        assert_eq!(config.proxy.server, "srv0");
        assert_eq!(config.proxy.tls, TlsVerification::SystemDefaults);
        assert!(config.proxy.token.is_none());
        assert_eq!(config.sync_timeout, DEFAULT_SYNC_TIMEOUT);
        assert_eq!(config.password_cost, bcrypt::DEFAULT_COST);
    }

    #[test]
    fn transport_follows_tls_choice() {
        let mut proxy = ProxyConfig::new(DEFAULT_ADMIN_URL.parse().unwrap());
        proxy.tls = TlsVerification::CustomCa("/etc/caddy/ca.pem".into());
        proxy.timeout = Duration::from_secs(3);

        let transport = proxy.transport();
        assert!(matches!(transport.tls, TlsMode::CustomCa(ref p) if p.ends_with("ca.pem")));
        assert_eq!(transport.timeout, Duration::from_secs(3));
    }
}
