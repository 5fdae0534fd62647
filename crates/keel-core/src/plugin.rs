use std::collections::HashMap;
use std::sync::Arc;

use crate::Instance;

#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("Unknown plugin: {0}")]
    Unknown(String),

    #[error("Plugin {name} failed to load: {reason}")]
    Failed { name: String, reason: String },
}

/// Capability invoked once after an instance has registered.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;
    fn load(&self, instance: &Instance) -> Result<(), PluginError>;
}

/// Plugins available to a process, keyed by the name configuration refers to.
#[derive(Default, Clone)]
pub struct PluginTable {
    plugins: HashMap<String, Arc<dyn Plugin>>,
}

impl PluginTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: impl Plugin + 'static) -> &mut Self {
        self.plugins.insert(plugin.name().to_string(), Arc::new(plugin));
        self
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Plugin>, PluginError> {
        self.plugins
            .get(name)
            .cloned()
            .ok_or_else(|| PluginError::Unknown(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
