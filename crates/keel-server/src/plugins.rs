use keel_core::{Instance, Plugin, PluginError, PluginTable};

/// Publishes `keel_instance_running{service, kind}` once the instance is up.
pub struct InstanceGauge;

impl Plugin for InstanceGauge {
    fn name(&self) -> &str {
        "instance_gauge"
    }

    fn load(&self, instance: &Instance) -> Result<(), PluginError> {
        metrics::gauge!(
            "keel_instance_running",
            "service" => instance.service_key.clone(),
            "kind" => instance.kind.to_string()
        )
        .set(1.0);
        tracing::debug!(instance = %instance.id, "instance gauge published");
        Ok(())
    }
}

pub fn default_plugins() -> PluginTable {
    let mut plugins = PluginTable::new();
    plugins.register(InstanceGauge);
    plugins
}
