use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Deployment kind an instance advertises at boot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InstanceKind {
    #[default]
    Heroku,
    Docker,
    Kubernetes,
    Local,
    Custom(String),
}

impl fmt::Display for InstanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceKind::Heroku => f.write_str("heroku"),
            InstanceKind::Docker => f.write_str("docker"),
            InstanceKind::Kubernetes => f.write_str("kubernetes"),
            InstanceKind::Local => f.write_str("local"),
            InstanceKind::Custom(name) => f.write_str(name),
        }
    }
}

impl FromStr for InstanceKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "heroku" => InstanceKind::Heroku,
            "docker" => InstanceKind::Docker,
            "kubernetes" | "k8s" => InstanceKind::Kubernetes,
            "local" => InstanceKind::Local,
            _ => InstanceKind::Custom(s.to_string()),
        })
    }
}

/// One process of a service, identified by the URL it advertises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Instance {
    pub id: Uuid,
    pub service_key: String,
    pub url: String,
    pub kind: InstanceKind,
    pub running: bool,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Instance {
    pub fn new(
        service_key: impl Into<String>,
        url: impl Into<String>,
        kind: InstanceKind,
        created_at: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            service_key: service_key.into(),
            url: url.into(),
            kind,
            running: false,
            created_at,
            updated_at: created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parses_known_names_case_insensitively() {
        assert_eq!("Heroku".parse::<InstanceKind>().unwrap(), InstanceKind::Heroku);
        assert_eq!("k8s".parse::<InstanceKind>().unwrap(), InstanceKind::Kubernetes);
    }

    #[test]
    fn test_custom_kind_keeps_its_name() {
        let kind: InstanceKind = "fly.io".parse().unwrap();
        assert_eq!(kind, InstanceKind::Custom("fly.io".to_string()));
        assert_eq!(kind.to_string(), "fly.io");
    }

    #[test]
    fn test_new_instance_is_not_running() {
        let instance = Instance::new("billing", "http://10.0.0.1:8080", InstanceKind::Docker, 42);
        assert!(!instance.running);
        assert_eq!(instance.updated_at, 42);
    }
}
