/// Domain errors for the Keel registry store
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Instance not found")]
    InstanceNotFound,

    #[error("Gateway not found: {0}")]
    GatewayNotFound(String),

    #[error("Invalid service key: {0:?}")]
    InvalidKey(String),

    #[error("Invalid route pattern: {0:?}")]
    InvalidPattern(String),

    #[error("Route {pattern} on gateway {gateway} already targets {existing}")]
    AmbiguousRoute {
        gateway: String,
        pattern: String,
        existing: String,
    },

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Registry store unavailable: {0}")]
    Unavailable(String),
}
