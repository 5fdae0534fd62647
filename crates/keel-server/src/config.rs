use std::net::SocketAddr;

use keel_core::{Deployment, InstanceKind};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("BIND_ADDR is not a socket address: {0}")]
    InvalidBindAddr(String),

    #[error("MAX_BODY_BYTES is not a byte count: {0}")]
    InvalidBodyLimit(String),
}

pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

/// Process settings, read from the environment (and `.env` via dotenvy).
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Largest request body the admission layer buffers to read credentials.
    pub max_body_bytes: usize,
    pub deployment: Deployment,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let raw_addr = var("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:3000".to_string());
        let bind_addr: SocketAddr = raw_addr
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddr(raw_addr.clone()))?;

        let max_body_bytes = match var("MAX_BODY_BYTES") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidBodyLimit(raw.clone()))?,
            None => DEFAULT_MAX_BODY_BYTES,
        };

        let service_name = var("SERVICE_NAME").unwrap_or_else(|| "registry".to_string());
        let url = var("SERVICE_URL").unwrap_or_else(|| format!("http://{}", bind_addr));

        let kind = var("INSTANCE_TYPE")
            .map(|v| v.parse::<InstanceKind>().unwrap_or_default())
            .unwrap_or_default();

        Ok(Self {
            database_url: var("DATABASE_URL").unwrap_or_else(|| "keel.db".to_string()),
            bind_addr,
            max_body_bytes,
            deployment: Deployment {
                service_name,
                url,
                kind,
                test_mode: lookup("TEST_MODE").is_some_and(|v| is_enabled(&v)),
                plugin: var("ADDITIONAL_PLUGIN"),
                gateway: var("GATEWAY_NAME"),
                websocket: var("WEBSOCKET_URL"),
            },
        })
    }
}

/// Any value turns the flag on except an empty one, `0` or `false`.
fn is_enabled(value: &str) -> bool {
    !matches!(value.trim().to_ascii_lowercase().as_str(), "" | "0" | "false")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.database_url, "keel.db");
        assert_eq!(s.bind_addr.to_string(), "127.0.0.1:3000");
        assert_eq!(s.deployment.service_name, "registry");
        assert_eq!(s.deployment.url, "http://127.0.0.1:3000");
        assert_eq!(s.deployment.kind, InstanceKind::Heroku);
        assert!(!s.deployment.test_mode);
        assert!(s.deployment.plugin.is_none());
        assert!(s.deployment.gateway.is_none());
        assert!(s.deployment.websocket.is_none());
        assert_eq!(s.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
    }

    #[test]
    fn test_overrides() {
        let s = settings(&[
            ("SERVICE_NAME", "billing"),
            ("SERVICE_URL", "https://billing.example.com"),
            ("INSTANCE_TYPE", "docker"),
            ("TEST_MODE", "1"),
            ("ADDITIONAL_PLUGIN", "instance_gauge"),
            ("GATEWAY_NAME", "front"),
            ("WEBSOCKET_URL", "wss://ws.example.com"),
            ("MAX_BODY_BYTES", "1024"),
        ])
        .unwrap();
        assert_eq!(s.deployment.service_name, "billing");
        assert_eq!(s.deployment.url, "https://billing.example.com");
        assert_eq!(s.deployment.kind, InstanceKind::Docker);
        assert!(s.deployment.test_mode);
        assert_eq!(s.deployment.plugin.as_deref(), Some("instance_gauge"));
        assert_eq!(s.deployment.gateway.as_deref(), Some("front"));
        assert_eq!(s.deployment.websocket.as_deref(), Some("wss://ws.example.com"));
        assert_eq!(s.max_body_bytes, 1024);
    }

    #[test]
    fn test_test_mode_values() {
        assert!(settings(&[("TEST_MODE", "true")]).unwrap().deployment.test_mode);
        assert!(!settings(&[("TEST_MODE", "false")]).unwrap().deployment.test_mode);
        assert!(!settings(&[("TEST_MODE", "0")]).unwrap().deployment.test_mode);
    }

    #[test]
    fn test_bad_bind_addr() {
        assert!(matches!(
            settings(&[("BIND_ADDR", "localhost")]),
            Err(ConfigError::InvalidBindAddr(_))
        ));
    }

    #[test]
    fn test_bad_body_limit() {
        assert!(matches!(
            settings(&[("MAX_BODY_BYTES", "lots")]),
            Err(ConfigError::InvalidBodyLimit(_))
        ));
    }
}
