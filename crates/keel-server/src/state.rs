use std::sync::Arc;

use keel_core::{Instance, Service};
use keel_db::DbRegistry;
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<DbRegistry>,
    /// Identity this process registered under at boot
    pub service: Service,
    pub instance: Instance,
    pub metrics: PrometheusHandle,
    pub max_body_bytes: usize,
}
