// SPDX-License-Identifier: BUSL-1.1
//! # Service Settings
//!
//! Loaded once at startup, in three layers, later layers winning:
//!
//! 1. an optional YAML file (`--config`)
//! 2. `HELIO_*` environment variables
//! 3. CLI flags (applied by `main`)
//!
//! Gate rules are validated by `helio-core` before the router is built.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use helio_core::{ConfigError, GateConfig, MatcherScope};
use helio_session::{SessionServiceConfig, DEFAULT_COOKIE_NAME, DEFAULT_TIMEOUT_MS};

/// Default request body limit for proxied requests (10 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("invalid {field} URL {value:?}: {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("identity.timeout_ms must be greater than zero")]
    ZeroTimeout,

    #[error(transparent)]
    Gate(#[from] ConfigError),

    #[error("identity service not configured (set HELIO_IDENTITY_URL and HELIO_IDENTITY_API_KEY)")]
    MissingIdentity,
}

/// Identity service connection used for session lookups.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct IdentitySettings {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub cookie_name: String,
    pub timeout_ms: u64,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl std::fmt::Debug for IdentitySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentitySettings")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("cookie_name", &self.cookie_name)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Complete runtime configuration of the edge service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct GateSettings {
    pub port: u16,
    /// Base URL of the CRM application. Without it, gated requests get 503.
    pub upstream_url: Option<String>,
    pub identity: IdentitySettings,
    pub gate: GateConfig,
    pub matcher: MatcherScope,
    pub metrics_enabled: bool,
    pub max_body_bytes: usize,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            upstream_url: None,
            identity: IdentitySettings::default(),
            gate: GateConfig::default(),
            matcher: MatcherScope::default(),
            metrics_enabled: true,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl GateSettings {
    /// Load from an optional YAML file, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env(|name| std::env::var(name).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: display.clone(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|source| SettingsError::Yaml {
            path: display,
            source,
        })
    }

    /// Overlay `HELIO_*` variables. `lookup` abstracts the environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("HELIO_PORT") {
            self.port = parse_env("HELIO_PORT", v)?;
        }
        if let Some(v) = lookup("HELIO_UPSTREAM_URL") {
            self.upstream_url = non_empty(v);
        }
        if let Some(v) = lookup("HELIO_IDENTITY_URL") {
            self.identity.url = non_empty(v);
        }
        if let Some(v) = lookup("HELIO_IDENTITY_API_KEY") {
            self.identity.api_key = non_empty(v);
        }
        if let Some(v) = lookup("HELIO_SESSION_COOKIE") {
            if !v.is_empty() {
                self.identity.cookie_name = v;
            }
        }
        if let Some(v) = lookup("HELIO_SESSION_TIMEOUT_MS") {
            self.identity.timeout_ms = parse_env("HELIO_SESSION_TIMEOUT_MS", v)?;
        }
        if let Some(v) = lookup("HELIO_METRICS_ENABLED") {
            self.metrics_enabled = v.to_lowercase() != "false";
        }
        Ok(())
    }

    /// Check gate rules and URLs. Does not require the identity service.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.gate.validate()?;
        if let Some(upstream) = &self.upstream_url {
            check_url("upstream_url", upstream)?;
        }
        if let Some(identity) = &self.identity.url {
            check_url("identity.url", identity)?;
        }
        if self.identity.timeout_ms == 0 {
            return Err(SettingsError::ZeroTimeout);
        }
        Ok(())
    }

    /// Session adapter configuration. Errors when the identity service is unset.
    pub fn session_config(&self) -> Result<SessionServiceConfig, SettingsError> {
        match (&self.identity.url, &self.identity.api_key) {
            (Some(url), Some(key)) => Ok(SessionServiceConfig::new(url.clone(), key.clone())
                .with_cookie_name(self.identity.cookie_name.clone())
                .with_timeout(Duration::from_millis(self.identity.timeout_ms))),
            _ => Err(SettingsError::MissingIdentity),
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, SettingsError> {
    value
        .trim()
        .parse()
        .map_err(|_| SettingsError::InvalidEnv { name, value })
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn check_url(field: &'static str, value: &str) -> Result<(), SettingsError> {
    let invalid = |reason: String| SettingsError::InvalidUrl {
        field,
        value: value.to_string(),
        reason,
    };
    let url = Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults() {
        let s = GateSettings::default();
        assert_eq!(s.port, 8080);
        assert!(s.metrics_enabled);
        assert_eq!(s.max_body_bytes, 10 * 1024 * 1024);
        assert_eq!(s.identity.cookie_name, "sb-auth-token");
        assert_eq!(s.identity.timeout_ms, 3_000);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn env_overrides() {
        let mut s = GateSettings::default();
        s.apply_env(env(&[
            ("HELIO_PORT", "9090"),
            ("HELIO_UPSTREAM_URL", "http://crm:3000"),
            ("HELIO_IDENTITY_URL", "https://id.example.com"),
            ("HELIO_IDENTITY_API_KEY", "anon"),
            ("HELIO_SESSION_COOKIE", "crm-session"),
            ("HELIO_SESSION_TIMEOUT_MS", "750"),
            ("HELIO_METRICS_ENABLED", "FALSE"),
        ]))
        .unwrap();
        assert_eq!(s.port, 9090);
        assert_eq!(s.upstream_url.as_deref(), Some("http://crm:3000"));
        assert_eq!(s.identity.cookie_name, "crm-session");
        assert_eq!(s.identity.timeout_ms, 750);
        assert!(!s.metrics_enabled);

        let session = s.session_config().unwrap();
        assert_eq!(session.timeout, Duration::from_millis(750));
        assert_eq!(session.cookie_name, "crm-session");
    }

    #[test]
    fn metrics_stay_enabled_unless_false() {
        let mut s = GateSettings::default();
        s.apply_env(env(&[("HELIO_METRICS_ENABLED", "0")])).unwrap();
        assert!(s.metrics_enabled);
    }

    #[test]
    fn bad_env_values_rejected() {
        let mut s = GateSettings::default();
        let err = s.apply_env(env(&[("HELIO_PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidEnv { name: "HELIO_PORT", .. }));
    }

    #[test]
    fn missing_identity() {
        let s = GateSettings::default();
        assert!(matches!(s.session_config(), Err(SettingsError::MissingIdentity)));
    }

    #[test]
    fn invalid_urls_rejected() {
        let mut s = GateSettings::default();
        s.upstream_url = Some("ftp://crm".into());
        assert!(matches!(
            s.validate(),
            Err(SettingsError::InvalidUrl { field: "upstream_url", .. })
        ));
    }

    #[test]
    fn gate_rules_validated() {
        let mut s = GateSettings::default();
        s.gate.public_prefixes = vec!["/login".into()];
        assert!(matches!(s.validate(), Err(SettingsError::Gate(_))));
    }

    #[test]
    fn debug_redacts_api_key() {
        let mut s = GateSettings::default();
        s.identity.api_key = Some("service-role-secret".into());
        let debug = format!("{s:?}");
        assert!(!debug.contains("service-role-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gate.yaml");
        std::fs::write(
            &path,
            "port: 7000\nupstream_url: http://127.0.0.1:3000\ngate:\n  api_prefixes: [/api, /webhooks]\nmatcher:\n  excluded_prefixes: [/assets]\n",
        )
        .unwrap();
        let s = GateSettings::from_file(&path).unwrap();
        assert_eq!(s.port, 7000);
        assert_eq!(s.gate.api_prefixes, vec!["/api", "/webhooks"]);
        assert_eq!(s.gate.login_path, "/auth");
        assert_eq!(s.matcher.excluded_prefixes, vec!["/assets"]);
        assert!(s.metrics_enabled);
    }

    #[test]
    fn unknown_yaml_keys_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gate.yaml");
        std::fs::write(&path, "prot: 7000\n").unwrap();
        assert!(matches!(
            GateSettings::from_file(&path),
            Err(SettingsError::Yaml { .. })
        ));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            GateSettings::from_file(Path::new("/nonexistent/gate.yaml")),
            Err(SettingsError::Io { .. })
        ));
    }

    #[test]
    fn zero_timeout_from_file_names_the_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gate.yaml");
        std::fs::write(&path, "identity:\n  timeout_ms: 0\n").unwrap();
        let s = GateSettings::from_file(&path).unwrap();
        let err = s.validate().unwrap_err();
        assert!(matches!(err, SettingsError::ZeroTimeout));
        assert!(err.to_string().contains("identity.timeout_ms"));
    }
}
