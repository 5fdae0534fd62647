use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use keel_core::{
    admission::{Field, Reason, RejectionBody},
    Gateway, Instance, InstanceKind, InvitationStatus, Principal, RegistryStore, Route,
    RouteTable, RoutePolicy, Service, Websocket,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::admission::{ApiRoutes, Directory, CLIENT_ID_HEADER, SESSION_ID_HEADER};
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        me,
        list_services,
        get_service,
        list_instances,
        set_test_mode,
        list_gateways,
        list_routes,
        add_route,
        resolve,
        list_websockets,
    ),
    components(
        schemas(
            HealthReport,
            TestModeUpdate,
            NewRoute,
            Resolution,
            RejectionBody,
            Field,
            Reason,
            Principal,
            Service,
            Instance,
            InstanceKind,
            Gateway,
            Route,
            Websocket,
            InvitationStatus,
            keel_core::Account,
            keel_core::Application,
            keel_core::Session,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};

        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "client_id",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(CLIENT_ID_HEADER))),
            );
            components.add_security_scheme(
                "session_id",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(SESSION_ID_HEADER))),
            );
        }
    }
}

pub fn router(state: AppState) -> Router {
    let directory: Directory = state.registry.clone();

    let api = ApiRoutes::new(directory)
        .body_limit(state.max_body_bytes)
        .route("/api/me", get(me), RoutePolicy::authenticated())
        .route("/api/services", get(list_services), RoutePolicy::default())
        .route("/api/services/:key", get(get_service), RoutePolicy::default())
        .route(
            "/api/services/:key/instances",
            get(list_instances),
            RoutePolicy::authenticated(),
        )
        .route(
            "/api/services/:key/test-mode",
            put(set_test_mode),
            RoutePolicy::new(true, true),
        )
        .route("/api/gateways", get(list_gateways), RoutePolicy::default())
        .route("/api/gateways/:name/routes", get(list_routes), RoutePolicy::default())
        .route(
            "/api/gateways/:name/routes",
            post(add_route),
            RoutePolicy::new(true, true),
        )
        .route("/api/gateways/:name/resolve", get(resolve), RoutePolicy::default())
        .route("/api/websockets", get(list_websockets), RoutePolicy::default())
        .into_router();

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthReport {
    #[schema(example = "ok")]
    status: String,
    service: String,
    instance: Instance,
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Process is up", body = HealthReport))
)]
async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok".to_string(),
        service: state.service.key.clone(),
        instance: state.instance.clone(),
    })
}

async fn render_metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}

#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Resolved caller", body = Principal),
        (status = 400, description = "Missing client_id or session_id", body = RejectionBody),
        (status = 404, description = "Unknown client_id or session_id", body = RejectionBody)
    ),
    security(("client_id" = [], "session_id" = []))
)]
async fn me(Extension(principal): Extension<Principal>) -> Json<Principal> {
    Json(principal)
}

#[utoipa::path(
    get,
    path = "/api/services",
    responses(
        (status = 200, description = "Registered services", body = [Service]),
        (status = 400, description = "Missing client_id", body = RejectionBody)
    ),
    security(("client_id" = []))
)]
async fn list_services(State(state): State<AppState>) -> Result<Json<Vec<Service>>> {
    Ok(Json(state.registry.get_all_services()?))
}

#[utoipa::path(
    get,
    path = "/api/services/{key}",
    responses(
        (status = 200, description = "Service", body = Service),
        (status = 404, description = "Unknown service")
    ),
    params(("key" = String, Path, description = "Service key")),
    security(("client_id" = []))
)]
async fn get_service(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Service>> {
    Ok(Json(state.registry.get_service(&key)?))
}

#[utoipa::path(
    get,
    path = "/api/services/{key}/instances",
    responses(
        (status = 200, description = "Every instance ever booted for the service", body = [Instance]),
        (status = 404, description = "Unknown service")
    ),
    params(("key" = String, Path, description = "Service key")),
    security(("client_id" = [], "session_id" = []))
)]
async fn list_instances(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Vec<Instance>>> {
    Ok(Json(state.registry.get_instances(&key)?))
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TestModeUpdate {
    test_mode: bool,
}

#[utoipa::path(
    put,
    path = "/api/services/{key}/test-mode",
    request_body = TestModeUpdate,
    responses(
        (status = 200, description = "Updated service", body = Service),
        (status = 403, description = "Application is not premium", body = RejectionBody),
        (status = 404, description = "Unknown service")
    ),
    params(("key" = String, Path, description = "Service key")),
    security(("client_id" = [], "session_id" = []))
)]
async fn set_test_mode(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(key): Path<String>,
    Json(payload): Json<TestModeUpdate>,
) -> Result<Json<Service>> {
    let mut service = state.registry.get_service(&key)?;
    state.registry.set_test_mode(&service, payload.test_mode)?;
    service.test_mode = payload.test_mode;
    tracing::info!(
        service = %service.key,
        test_mode = service.test_mode,
        application = %principal.application.client_id,
        "test mode updated"
    );
    Ok(Json(service))
}

#[utoipa::path(
    get,
    path = "/api/gateways",
    responses((status = 200, description = "Known gateways", body = [Gateway])),
    security(("client_id" = []))
)]
async fn list_gateways(State(state): State<AppState>) -> Result<Json<Vec<Gateway>>> {
    Ok(Json(state.registry.get_all_gateways()?))
}

#[utoipa::path(
    get,
    path = "/api/gateways/{name}/routes",
    responses(
        (status = 200, description = "Routes of the gateway", body = [Route]),
        (status = 404, description = "Unknown gateway")
    ),
    params(("name" = String, Path, description = "Gateway name")),
    security(("client_id" = []))
)]
async fn list_routes(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<Route>>> {
    Ok(Json(state.registry.get_routes(&name)?))
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NewRoute {
    #[schema(example = "/billing")]
    pattern: String,
    #[schema(example = "billing")]
    service: String,
}

#[utoipa::path(
    post,
    path = "/api/gateways/{name}/routes",
    request_body = NewRoute,
    responses(
        (status = 201, description = "Route recorded", body = Route),
        (status = 404, description = "Unknown target service"),
        (status = 409, description = "Pattern already targets another service")
    ),
    params(("name" = String, Path, description = "Gateway name")),
    security(("client_id" = [], "session_id" = []))
)]
async fn add_route(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(payload): Json<NewRoute>,
) -> Result<(StatusCode, Json<Route>)> {
    let gateway = state.registry.find_or_create_gateway(&name)?;
    let route = state
        .registry
        .add_route(&gateway, &payload.pattern, &payload.service)?;
    Ok((StatusCode::CREATED, Json(route)))
}

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    path: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Resolution {
    gateway: String,
    route: Route,
    service: Service,
    /// Running instances only
    instances: Vec<Instance>,
}

#[utoipa::path(
    get,
    path = "/api/gateways/{name}/resolve",
    responses(
        (status = 200, description = "Target of the path", body = Resolution),
        (status = 404, description = "Unknown gateway or no matching route")
    ),
    params(
        ("name" = String, Path, description = "Gateway name"),
        ("path" = String, Query, description = "Incoming external path")
    ),
    security(("client_id" = []))
)]
async fn resolve(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<Resolution>> {
    let registry = &state.registry;
    let table = RouteTable::from_routes(name.as_str(), registry.get_routes(&name)?)?;
    let route = table
        .resolve(&query.path)
        .cloned()
        .ok_or_else(|| AppError::NoRoute(query.path.clone()))?;
    let service = registry.get_service(&route.service_key)?;
    let instances = registry
        .get_instances(&route.service_key)?
        .into_iter()
        .filter(|instance| instance.running)
        .collect();

    Ok(Json(Resolution {
        gateway: table.gateway().to_string(),
        route,
        service,
        instances,
    }))
}

#[utoipa::path(
    get,
    path = "/api/websockets",
    responses((status = 200, description = "Recorded websocket fronts", body = [Websocket])),
    security(("client_id" = []))
)]
async fn list_websockets(State(state): State<AppState>) -> Result<Json<Vec<Websocket>>> {
    Ok(Json(state.registry.get_all_websockets()?))
}
