use std::collections::HashMap;

use config::{Config as ConfigLib, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Default upper bound for downloaded CRLs, certificates and OCSP answers
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub revocation: RevocationConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationConfig {
    /// Treat checks that cannot complete as revoked
    pub hard_fail: bool,
    /// Local CRL file (path or `file://` URI) consulted before any distribution point
    #[serde(default)]
    pub local_crl: Option<String>,
    /// Refuse remote CRLs whose issuer cannot be resolved for verification
    pub require_crl_issuer: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_body_bytes: usize,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_sources(None)
    }

    pub fn load_with_sources(
        env_vars: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = ConfigLib::builder()
            .set_default("revocation.hard_fail", false)?
            .set_default("revocation.require_crl_issuer", false)?
            .set_default("http.timeout_secs", 30)?
            .set_default("http.max_body_bytes", DEFAULT_MAX_BODY_BYTES as u64)?
            .add_source(File::with_name("config/settings").required(false));

        // Explicit overrides replace the system environment so tests stay isolated
        if let Some(vars) = env_vars {
            for (key, value) in vars {
                builder = builder.set_override(&key, value)?;
            }
        } else {
            // Format: APP_REVOCATION__HARD_FAIL or APP_HTTP__TIMEOUT_SECS
            builder = builder.add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );
        }

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::load_with_sources(Some(HashMap::new())).expect("Failed to load config");

        assert!(!config.revocation.hard_fail);
        assert!(config.revocation.local_crl.is_none());
        assert!(!config.revocation.require_crl_issuer);
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.http.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
    }

    #[test]
    fn test_env_config() {
        let mut env_vars = HashMap::new();
        env_vars.insert("revocation.hard_fail".to_string(), "true".to_string());
        env_vars.insert(
            "revocation.local_crl".to_string(),
            "file:///etc/pki/ca.crl".to_string(),
        );
        env_vars.insert("http.timeout_secs".to_string(), "5".to_string());

        let config = Config::load_with_sources(Some(env_vars)).expect("Failed to load config");

        assert!(config.revocation.hard_fail);
        assert_eq!(
            config.revocation.local_crl.as_deref(),
            Some("file:///etc/pki/ca.crl")
        );
        assert_eq!(config.http.timeout_secs, 5);
    }

    #[test]
    fn test_partial_env_override() {
        let mut env_vars = HashMap::new();
        env_vars.insert(
            "revocation.require_crl_issuer".to_string(),
            "true".to_string(),
        );

        let config = Config::load_with_sources(Some(env_vars)).expect("Failed to load config");

        assert!(config.revocation.require_crl_issuer);
        // The other values should use default
        assert!(!config.revocation.hard_fail);
        assert_eq!(config.http.timeout_secs, 30);
    }
}
