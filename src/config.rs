use std::{env, net::SocketAddr};

use anyhow::{Context, Result, anyhow};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MAX_UPLOAD_MB: usize = 20;

/// Process-level settings read once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = AppConfig::default();

        if let Some(raw) = lookup("PORT") {
            config.port = raw
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a valid port number, got `{raw}`"))?;
        }

        if let Some(raw) = lookup("MAX_UPLOAD_MB") {
            let megabytes: usize = raw
                .trim()
                .parse()
                .with_context(|| format!("MAX_UPLOAD_MB must be an integer, got `{raw}`"))?;
            if megabytes == 0 {
                return Err(anyhow!("MAX_UPLOAD_MB must be greater than zero"));
            }
            config.max_upload_bytes = megabytes
                .checked_mul(1024 * 1024)
                .ok_or_else(|| anyhow!("MAX_UPLOAD_MB is too large"))?;
        }

        Ok(config)
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|key| values.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.listen_addr().port(), 8080);
    }

    #[test]
    fn reads_port_and_upload_limit() {
        let config = config_from(&[("PORT", " 3000 "), ("MAX_UPLOAD_MB", "5")]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(config_from(&[("PORT", "eighty")]).is_err());
        assert!(config_from(&[("PORT", "70000")]).is_err());
        assert!(config_from(&[("MAX_UPLOAD_MB", "0")]).is_err());
        assert!(config_from(&[("MAX_UPLOAD_MB", "-1")]).is_err());
    }
}
