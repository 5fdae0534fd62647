use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::RegistryError;

/// A named front-door process owning a set of routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Gateway {
    pub id: Uuid,
    pub name: String,
}

impl Gateway {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

/// Maps an external path prefix of a gateway to a target service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Route {
    pub id: Uuid,
    pub gateway_id: Uuid,
    /// Normalized prefix, see [`normalize_pattern`]
    pub pattern: String,
    pub service_key: String,
}

impl Route {
    pub fn new(
        gateway: &Gateway,
        pattern: &str,
        service_key: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        Ok(Self {
            id: Uuid::new_v4(),
            gateway_id: gateway.id,
            pattern: normalize_pattern(pattern)?,
            service_key: service_key.into(),
        })
    }

    /// True when `path` is the pattern itself or continues it at a segment boundary.
    pub fn matches(&self, path: &str) -> bool {
        if self.pattern == "/" {
            return true;
        }
        match path.strip_prefix(self.pattern.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

/// Leading slash added, trailing slashes dropped (root stays `/`).
pub fn normalize_pattern(pattern: &str) -> Result<String, RegistryError> {
    let trimmed = pattern.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        return Err(RegistryError::InvalidPattern(pattern.to_string()));
    }
    let body = trimmed.trim_matches('/');
    if body.contains("//") {
        return Err(RegistryError::InvalidPattern(pattern.to_string()));
    }
    Ok(format!("/{}", body))
}

/// In-memory routing table for one gateway. Longest matching prefix wins.
#[derive(Debug, Clone)]
pub struct RouteTable {
    gateway: String,
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(gateway: impl Into<String>) -> Self {
        Self {
            gateway: gateway.into(),
            routes: Vec::new(),
        }
    }

    pub fn from_routes(
        gateway: impl Into<String>,
        routes: impl IntoIterator<Item = Route>,
    ) -> Result<Self, RegistryError> {
        let mut table = Self::new(gateway);
        for route in routes {
            table.add_route(route)?;
        }
        Ok(table)
    }

    pub fn gateway(&self) -> &str {
        &self.gateway
    }

    /// Two patterns that normalize to the same prefix but target different
    /// services cannot be told apart at request time, so they are refused here.
    pub fn add_route(&mut self, route: Route) -> Result<(), RegistryError> {
        if let Some(existing) = self.routes.iter().find(|r| r.pattern == route.pattern) {
            if existing.service_key == route.service_key {
                return Ok(());
            }
            return Err(RegistryError::AmbiguousRoute {
                gateway: self.gateway.clone(),
                pattern: route.pattern,
                existing: existing.service_key.clone(),
            });
        }
        self.routes.push(route);
        Ok(())
    }

    pub fn resolve(&self, path: &str) -> Option<&Route> {
        self.routes
            .iter()
            .filter(|route| route.matches(path))
            .max_by_key(|route| route.pattern.len())
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}
