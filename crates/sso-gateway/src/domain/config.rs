//! Gateway configuration with validation.
//!
//! Defaults suit local development; `from_env` overrides them for deployment.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use url::Url;

/// Shortest admin API key accepted.
pub const MIN_ADMIN_KEY_LEN: usize = 16;

/// Longest accepted request timeout, nonce TTL or sweep interval.
pub const MAX_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP server configuration
    pub http: HttpConfig,
    /// Handshake behaviour
    pub handshake: HandshakeConfig,
    /// Settings endpoint access
    pub admin: AdminConfig,
}

impl GatewayConfig {
    /// Load defaults overridden by environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SSO_HTTP_HOST`: Bind address (default: 0.0.0.0)
    /// - `SSO_HTTP_PORT`: Port (default: 8080)
    /// - `SSO_REQUEST_TIMEOUT`: Per-request timeout (default: 10s)
    /// - `SSO_NONCE_TTL`: How long a used nonce stays blocked (default: 10m)
    /// - `SSO_SWEEP_INTERVAL`: Replay guard sweep period (default: 60s)
    /// - `SSO_LOGIN_URL`: Where unauthenticated browsers are sent (optional)
    /// - `SSO_ADMIN_API_KEY`: Key for the settings endpoints (optional)
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidEnv` when a variable cannot be parsed, or any
    /// error from [`GatewayConfig::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("SSO_HTTP_HOST") {
            config.http.host = parse_env("SSO_HTTP_HOST", &host, |v| v.parse().ok())?;
        }
        if let Some(port) = lookup("SSO_HTTP_PORT") {
            config.http.port = parse_env("SSO_HTTP_PORT", &port, |v| v.parse().ok())?;
        }
        if let Some(timeout) = lookup("SSO_REQUEST_TIMEOUT") {
            config.http.request_timeout = parse_env("SSO_REQUEST_TIMEOUT", &timeout, |v| {
                humantime_serde::parse_duration(v).ok()
            })?;
        }
        if let Some(ttl) = lookup("SSO_NONCE_TTL") {
            config.handshake.nonce_ttl = parse_env("SSO_NONCE_TTL", &ttl, |v| {
                humantime_serde::parse_duration(v).ok()
            })?;
        }
        if let Some(interval) = lookup("SSO_SWEEP_INTERVAL") {
            config.handshake.sweep_interval = parse_env("SSO_SWEEP_INTERVAL", &interval, |v| {
                humantime_serde::parse_duration(v).ok()
            })?;
        }
        config.handshake.login_url = lookup("SSO_LOGIN_URL").filter(|v| !v.is_empty());
        config.admin.api_key = lookup("SSO_ADMIN_API_KEY").filter(|v| !v.is_empty());

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_duration("request_timeout", self.http.request_timeout)?;
        check_duration("nonce_ttl", self.handshake.nonce_ttl)?;
        check_duration("sweep_interval", self.handshake.sweep_interval)?;

        if let Some(login_url) = &self.handshake.login_url {
            let url = Url::parse(login_url)
                .map_err(|e| ConfigError::InvalidLoginUrl(e.to_string()))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidLoginUrl(format!(
                    "scheme {} is not http or https",
                    url.scheme()
                )));
            }
        }

        if let Some(key) = &self.admin.api_key {
            if key.len() < MIN_ADMIN_KEY_LEN {
                return Err(ConfigError::InvalidAdminKey(format!(
                    "admin API key must be at least {MIN_ADMIN_KEY_LEN} characters"
                )));
            }
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

fn check_duration(name: &str, value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() {
        return Err(ConfigError::InvalidTimeout(format!("{name} cannot be 0")));
    }
    if value > MAX_DURATION {
        return Err(ConfigError::InvalidTimeout(format!(
            "{name} cannot exceed {}s",
            MAX_DURATION.as_secs()
        )));
    }
    Ok(())
}

fn parse_env<T>(
    var: &'static str,
    raw: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, ConfigError> {
    parse(raw.trim()).ok_or_else(|| ConfigError::InvalidEnv {
        var,
        value: raw.to_string(),
    })
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8080)
    pub port: u16,
    /// Requests taking longer than this get a 408
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 8080,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Handshake configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HandshakeConfig {
    /// How long a claimed nonce is blocked
    #[serde(with = "humantime_serde")]
    pub nonce_ttl: Duration,
    /// How often the background task sweeps expired nonces
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
    /// Login page for unauthenticated browsers; `None` answers 401 instead
    pub login_url: Option<String>,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            nonce_ttl: sso_core::DEFAULT_NONCE_TTL,
            sweep_interval: sso_core::DEFAULT_SWEEP_INTERVAL,
            login_url: None,
        }
    }
}

/// Admin configuration
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// API key accepted by the settings endpoints (None = admin sessions only)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Invalid timeout or interval
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// Login URL is not an absolute http(s) URL
    #[error("invalid login URL: {0}")]
    InvalidLoginUrl(String),
    /// Admin API key too weak
    #[error("invalid admin API key: {0}")]
    InvalidAdminKey(String),
    /// An environment variable could not be parsed
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Humantime serde module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" must be checked before "s" and "m"
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .map_err(|_| "invalid minutes")?
                .checked_mul(60)
                .map(Duration::from_secs)
                .ok_or("minutes out of range")
        } else if let Some(hours) = s.strip_suffix('h') {
            hours
                .trim()
                .parse::<u64>()
                .map_err(|_| "invalid hours")?
                .checked_mul(3600)
                .map(Duration::from_secs)
                .ok_or("hours out of range")
        } else {
            // Try parsing as plain seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.handshake.nonce_ttl, Duration::from_secs(600));
        assert_eq!(config.handshake.sweep_interval, Duration::from_secs(60));
        assert!(config.handshake.login_url.is_none());
    }

    #[test]
    fn test_from_env_overrides() {
        let config = GatewayConfig::from_lookup(lookup(&[
            ("SSO_HTTP_HOST", "127.0.0.1"),
            ("SSO_HTTP_PORT", "9090"),
            ("SSO_NONCE_TTL", "5m"),
            ("SSO_SWEEP_INTERVAL", "1500ms"),
            ("SSO_LOGIN_URL", "https://archive.example/#?dialog=login"),
            ("SSO_ADMIN_API_KEY", "0123456789abcdef"),
        ]))
        .unwrap();

        assert_eq!(config.http_addr().to_string(), "127.0.0.1:9090");
        assert_eq!(config.handshake.nonce_ttl, Duration::from_secs(300));
        assert_eq!(config.handshake.sweep_interval, Duration::from_millis(1500));
        assert!(config.handshake.login_url.is_some());
        assert!(config.admin.api_key.is_some());
    }

    #[test]
    fn test_from_env_bad_port() {
        let err = GatewayConfig::from_lookup(lookup(&[("SSO_HTTP_PORT", "http")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv {
                var: "SSO_HTTP_PORT",
                ..
            }
        ));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let mut config = GatewayConfig::default();
        config.handshake.nonce_ttl = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimeout(_))
        ));
    }

    #[test]
    fn test_zero_sweep_interval_rejected() {
        let err = GatewayConfig::from_lookup(lookup(&[("SSO_SWEEP_INTERVAL", "0s")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimeout(_)));
    }

    #[test]
    fn test_huge_ttl_rejected() {
        let err = GatewayConfig::from_lookup(lookup(&[("SSO_NONCE_TTL", "18446744073709551615")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimeout(_)));

        let err = GatewayConfig::from_lookup(lookup(&[("SSO_REQUEST_TIMEOUT", "25h")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimeout(_)));

        let ok = GatewayConfig::from_lookup(lookup(&[("SSO_SWEEP_INTERVAL", "24h")])).unwrap();
        assert_eq!(ok.handshake.sweep_interval, MAX_DURATION);
    }

    #[test]
    fn test_overflowing_units_are_parse_errors() {
        use humantime_serde::parse_duration;
        assert_eq!(parse_duration("307445734561825861m"), Err("minutes out of range"));
        assert_eq!(parse_duration("5124095576030432h"), Err("hours out of range"));

        let err = GatewayConfig::from_lookup(lookup(&[("SSO_NONCE_TTL", "307445734561825861m")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv {
                var: "SSO_NONCE_TTL",
                ..
            }
        ));
    }

    #[test]
    fn test_login_url_must_be_http() {
        let mut config = GatewayConfig::default();
        config.handshake.login_url = Some("ftp://archive.example/login".into());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLoginUrl(_))
        ));

        config.handshake.login_url = Some("/login".into());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLoginUrl(_))
        ));
    }

    #[test]
    fn test_short_admin_key_rejected() {
        let mut config = GatewayConfig::default();
        config.admin.api_key = Some("short".into());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidAdminKey(_))
        ));
    }

    #[test]
    fn test_admin_key_not_printed() {
        let mut config = GatewayConfig::default();
        config.admin.api_key = Some("0123456789abcdef".into());
        assert!(!format!("{:?}", config).contains("0123456789abcdef"));
    }

    #[test]
    fn test_parse_duration_suffixes() {
        use humantime_serde::parse_duration;
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("30s"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_duration("10m"), Ok(Duration::from_secs(600)));
        assert_eq!(parse_duration("2h"), Ok(Duration::from_secs(7200)));
        assert_eq!(parse_duration("45"), Ok(Duration::from_secs(45)));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_deserialize_durations() {
        let json = r#"{"handshake": {"nonce_ttl": "2m", "sweep_interval": "15s"}}"#;
        let config: GatewayConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.handshake.nonce_ttl, Duration::from_secs(120));
        assert_eq!(config.http.port, 8080);
    }
}
