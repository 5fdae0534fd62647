use tracing::{info, warn};

use crate::plugin::{PluginError, PluginTable};
use crate::{Instance, InstanceKind, RegistryError, RegistryStore, Service};

/// What a process announces about itself when it boots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub service_name: String,
    pub url: String,
    pub kind: InstanceKind,
    /// Deployment-wide test flag; flips the service's `test_mode` while running.
    pub test_mode: bool,
    pub plugin: Option<String>,
    /// Gateway on which the service's mount path gets routed, if any.
    pub gateway: Option<String>,
    pub websocket: Option<String>,
}

impl Deployment {
    pub fn new(service_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            url: url.into(),
            kind: InstanceKind::default(),
            test_mode: false,
            plugin: None,
            gateway: None,
            websocket: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("registration failed: {0}")]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Plugin(#[from] PluginError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Registered,
    Running,
    Stopped,
}

/// The identity this process holds between boot and shutdown.
#[derive(Debug, Clone)]
pub struct Registration {
    service: Service,
    instance: Instance,
    state: LifecycleState,
    test_mode: bool,
}

impl Registration {
    /// Registers the process and marks its instance running.
    ///
    /// Lookups, route and websocket announcements, and the plugin are fatal.
    /// Nothing is flagged running or in test mode until every fatal step that
    /// precedes it has passed, and a plugin failure rolls both flags back.
    pub fn boot<S>(
        store: &S,
        deployment: &Deployment,
        plugins: &PluginTable,
    ) -> Result<Self, LifecycleError>
    where
        S: RegistryStore + ?Sized,
    {
        let plugin = deployment
            .plugin
            .as_deref()
            .map(|name| plugins.resolve(name))
            .transpose()?;

        let service = store.find_or_create_service(&deployment.service_name)?;
        let instance = store.find_or_create_instance(&service, &deployment.url, &deployment.kind)?;

        if let Some(gateway_name) = deployment.gateway.as_deref() {
            let gateway = store.find_or_create_gateway(gateway_name)?;
            let route = store.add_route(&gateway, &service.path, &service.key)?;
            info!(gateway = %gateway.name, pattern = %route.pattern, "route announced");
        }

        if let Some(url) = deployment.websocket.as_deref() {
            let websocket = store.find_or_create_websocket(url)?;
            info!(websocket = %websocket.url, "websocket front recorded");
        }

        let mut registration = Self {
            service,
            instance,
            state: LifecycleState::Registered,
            test_mode: deployment.test_mode,
        };

        if deployment.test_mode {
            store.set_test_mode(&registration.service, true)?;
            registration.service.test_mode = true;
        }

        match store.set_running(&registration.instance, true) {
            Ok(()) => registration.instance.running = true,
            Err(e) => warn!(
                instance = %registration.instance.id,
                error = %e,
                "failed to mark instance running"
            ),
        }
        registration.state = LifecycleState::Running;

        info!(
            service = %registration.service.key,
            instance = %registration.instance.id,
            url = %registration.instance.url,
            kind = %registration.instance.kind,
            "instance registered"
        );

        if let Some(plugin) = plugin {
            if let Err(e) = plugin.load(&registration.instance) {
                registration.shutdown(store);
                return Err(e.into());
            }
            info!(plugin = plugin.name(), "plugin loaded");
        }

        Ok(registration)
    }

    /// Marks the instance not running. Best effort: failures are logged and
    /// the registration is considered stopped either way.
    pub fn shutdown<S>(&mut self, store: &S)
    where
        S: RegistryStore + ?Sized,
    {
        if self.state != LifecycleState::Running {
            return;
        }

        match store.set_running(&self.instance, false) {
            Ok(()) => self.instance.running = false,
            Err(e) => warn!(instance = %self.instance.id, error = %e, "failed to mark instance stopped"),
        }

        if self.test_mode {
            match store.set_test_mode(&self.service, false) {
                Ok(()) => self.service.test_mode = false,
                Err(e) => warn!(service = %self.service.key, error = %e, "failed to clear test mode"),
            }
        }

        self.state = LifecycleState::Stopped;
        info!(instance = %self.instance.id, "instance deregistered");
    }

    pub fn service(&self) -> &Service {
        &self.service
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }
}
