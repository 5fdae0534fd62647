use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::RegistryError;

/// A logical service, shared by every instance booted under the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Service {
    pub id: Uuid,
    /// Unique slug, e.g. `billing`
    pub key: String,
    /// Mount prefix, always `/` followed by the key
    pub path: String,
    pub test_mode: bool,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Service {
    pub fn new(key: impl Into<String>, created_at: u64) -> Result<Self, RegistryError> {
        let key = key.into();
        validate_key(&key)?;
        Ok(Self {
            id: Uuid::new_v4(),
            path: mount_path(&key),
            key,
            test_mode: false,
            created_at,
            updated_at: created_at,
        })
    }
}

pub fn mount_path(key: &str) -> String {
    format!("/{}", key)
}

pub fn validate_key(key: &str) -> Result<(), RegistryError> {
    if key.is_empty() || key.contains('/') || key.chars().any(char::is_whitespace) {
        return Err(RegistryError::InvalidKey(key.to_string()));
    }
    Ok(())
}
