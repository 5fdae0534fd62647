use crate::{Gateway, Instance, InstanceKind, RegistryError, Route, Service, Websocket};

/// Durable bookkeeping for services, instances, gateways and routes.
///
/// The `find_or_create_*` operations are idempotent on their unique key and
/// must stay correct when two processes call them concurrently.
pub trait RegistryStore {
    fn find_or_create_service(&self, key: &str) -> Result<Service, RegistryError>;
    fn get_service(&self, key: &str) -> Result<Service, RegistryError>;
    fn get_all_services(&self) -> Result<Vec<Service>, RegistryError>;
    fn set_test_mode(&self, service: &Service, test_mode: bool) -> Result<(), RegistryError>;

    fn find_or_create_instance(
        &self,
        service: &Service,
        url: &str,
        kind: &InstanceKind,
    ) -> Result<Instance, RegistryError>;
    fn set_running(&self, instance: &Instance, running: bool) -> Result<(), RegistryError>;
    fn get_instances(&self, service_key: &str) -> Result<Vec<Instance>, RegistryError>;
    fn get_all_instances(&self) -> Result<Vec<Instance>, RegistryError>;

    fn find_or_create_gateway(&self, name: &str) -> Result<Gateway, RegistryError>;
    fn get_all_gateways(&self) -> Result<Vec<Gateway>, RegistryError>;
    fn add_route(
        &self,
        gateway: &Gateway,
        pattern: &str,
        service_key: &str,
    ) -> Result<Route, RegistryError>;
    fn get_routes(&self, gateway_name: &str) -> Result<Vec<Route>, RegistryError>;

    fn find_or_create_websocket(&self, url: &str) -> Result<Websocket, RegistryError>;
    fn get_all_websockets(&self) -> Result<Vec<Websocket>, RegistryError>;
}
