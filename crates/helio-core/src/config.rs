// SPDX-License-Identifier: BUSL-1.1
//! # Gate Configuration
//!
//! The two prefix lists and the two fixed redirect destinations. Supplied
//! once at process start; there is no runtime reconfiguration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::route::{RouteClass, RouteTable};

/// Errors raised while validating a [`GateConfig`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A path or prefix does not start with `/`.
    #[error("{field} must start with '/': {value:?}")]
    NotAbsolute { field: &'static str, value: String },

    /// A prefix list contains an empty string, which would match every path.
    #[error("{field} contains an empty prefix")]
    EmptyPrefix { field: &'static str },

    /// A path or prefix carries a query string or fragment.
    #[error("{field} must not contain '?' or '#': {value:?}")]
    QueryNotAllowed { field: &'static str, value: String },

    /// The login path would itself require a session.
    #[error("login_path {0:?} classifies as protected; unauthenticated requests would loop")]
    ProtectedLoginPath(String),

    /// The landing path would redirect an authenticated user again.
    #[error("landing_path {0:?} classifies as public; authenticated requests would loop")]
    PublicLandingPath(String),
}

/// Access gate configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    /// Paths never requiring a session.
    pub public_prefixes: Vec<String>,
    /// Paths fully exempt from gating.
    pub api_prefixes: Vec<String>,
    /// Destination for unauthenticated requests to protected paths.
    pub login_path: String,
    /// Destination for authenticated requests to public paths.
    pub landing_path: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            public_prefixes: vec!["/auth".to_string()],
            api_prefixes: vec!["/api".to_string()],
            login_path: "/auth".to_string(),
            landing_path: "/".to_string(),
        }
    }
}

impl GateConfig {
    /// Check structural rules and reject configurations that would loop.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_prefixes("public_prefixes", &self.public_prefixes)?;
        check_prefixes("api_prefixes", &self.api_prefixes)?;
        check_path("login_path", &self.login_path)?;
        check_path("landing_path", &self.landing_path)?;

        let routes = self.route_table();
        if routes.classify(&self.login_path) == RouteClass::Protected {
            return Err(ConfigError::ProtectedLoginPath(self.login_path.clone()));
        }
        if routes.classify(&self.landing_path) == RouteClass::Public {
            return Err(ConfigError::PublicLandingPath(self.landing_path.clone()));
        }
        Ok(())
    }

    /// Build the classification table for this configuration.
    pub fn route_table(&self) -> RouteTable {
        RouteTable::new(self.api_prefixes.clone(), self.public_prefixes.clone())
    }
}

fn check_prefixes(field: &'static str, prefixes: &[String]) -> Result<(), ConfigError> {
    for prefix in prefixes {
        if prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix { field });
        }
        check_path(field, prefix)?;
    }
    Ok(())
}

fn check_path(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if !value.starts_with('/') {
        return Err(ConfigError::NotAbsolute {
            field,
            value: value.to_string(),
        });
    }
    if value.contains('?') || value.contains('#') {
        return Err(ConfigError::QueryNotAllowed {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = GateConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.login_path, "/auth");
        assert_eq!(config.landing_path, "/");
    }

    #[test]
    fn relative_prefix_rejected() {
        let config = GateConfig {
            api_prefixes: vec!["api".into()],
            ..GateConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotAbsolute { field: "api_prefixes", .. })
        ));
    }

    #[test]
    fn empty_prefix_rejected() {
        let config = GateConfig {
            public_prefixes: vec!["/auth".into(), String::new()],
            ..GateConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptyPrefix {
                field: "public_prefixes"
            })
        );
    }

    #[test]
    fn query_in_login_path_rejected() {
        let config = GateConfig {
            login_path: "/auth?mode=signin".into(),
            ..GateConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::QueryNotAllowed { field: "login_path", .. })
        ));
    }

    #[test]
    fn protected_login_path_rejected() {
        let config = GateConfig {
            login_path: "/login".into(),
            ..GateConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ProtectedLoginPath("/login".into()))
        );
    }

    #[test]
    fn login_path_under_api_prefix_allowed() {
        let config = GateConfig {
            login_path: "/api/auth/login".into(),
            ..GateConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn public_landing_path_rejected() {
        let config = GateConfig {
            landing_path: "/auth/welcome".into(),
            ..GateConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::PublicLandingPath("/auth/welcome".into()))
        );
    }

    #[test]
    fn deserializes_with_defaults_for_missing_fields() {
        let yaml = "public_prefixes:\n  - /auth\n  - /reset-password\n";
        let config: GateConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.public_prefixes, vec!["/auth", "/reset-password"]);
        assert_eq!(config.api_prefixes, vec!["/api"]);
        assert_eq!(config.login_path, "/auth");
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn unknown_fields_rejected() {
        let yaml = "public_prefix: /auth\n";
        assert!(serde_yaml::from_str::<GateConfig>(yaml).is_err());
    }
}
