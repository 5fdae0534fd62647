use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        HeaderMap, Request, StatusCode,
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::MethodRouter,
    Json, Router,
};
use http_body::{LengthLimitError, Limited};
use keel_core::{admit, AccountDirectory, AdmissionError, Credentials, Rejection, RoutePolicy};

use crate::config::DEFAULT_MAX_BODY_BYTES;
use crate::error::AppError;

pub const CLIENT_ID_HEADER: &str = "x-client-id";
pub const SESSION_ID_HEADER: &str = "x-session-id";

pub type Directory = Arc<dyn AccountDirectory + Send + Sync>;

#[derive(Clone)]
pub struct AdmissionGuard {
    directory: Directory,
    policy: RoutePolicy,
    body_limit: usize,
}

/// Router builder where every route carries its admission policy.
pub struct ApiRoutes<S> {
    router: Router<S>,
    directory: Directory,
    body_limit: usize,
}

impl<S> ApiRoutes<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(directory: Directory) -> Self {
        Self {
            router: Router::new(),
            directory,
            body_limit: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Caps the bytes buffered when credentials have to be read from the body.
    /// Applies to routes declared after this call.
    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn route(self, path: &str, method_router: MethodRouter<S>, policy: RoutePolicy) -> Self {
        let guard = AdmissionGuard {
            directory: self.directory.clone(),
            policy,
            body_limit: self.body_limit,
        };
        let guarded =
            method_router.route_layer(middleware::from_fn_with_state(guard, admission_middleware));
        Self {
            router: self.router.route(path, guarded),
            directory: self.directory,
            body_limit: self.body_limit,
        }
    }

    pub fn into_router(self) -> Router<S> {
        self.router
    }
}

pub async fn admission_middleware(
    State(guard): State<AdmissionGuard>,
    request: Request<Body>,
    next: Next<Body>,
) -> Response {
    let (parts, body) = request.into_parts();

    let mut credentials = from_headers(&parts.headers).or(from_query(parts.uri.query()));

    // The body is read only when headers and query left a required value out.
    let body = match body_kind(&parts.headers) {
        Some(kind) if !credentials.satisfies(guard.policy) => {
            let bytes = match read_limited(&parts.headers, body, guard.body_limit).await {
                Ok(bytes) => bytes,
                Err(response) => return response,
            };
            credentials = credentials.or(from_body(kind, &bytes));
            Body::from(bytes)
        }
        _ => body,
    };
    let request = Request::from_parts(parts, body);

    match admit(guard.policy, &credentials, guard.directory.as_ref()) {
        Ok(principal) => {
            metrics::counter!("keel_admission_total", "outcome" => "admitted").increment(1);
            let mut request = request;
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(AdmissionError::Rejected(rejection)) => {
            metrics::counter!(
                "keel_admission_total",
                "outcome" => "rejected",
                "reason" => rejection.reason.as_str()
            )
            .increment(1);
            tracing::debug!(
                path = %request.uri().path(),
                field = rejection.field.as_str(),
                reason = rejection.reason.as_str(),
                "request rejected"
            );
            rejection_response(rejection)
        }
        Err(AdmissionError::Store(e)) => {
            metrics::counter!("keel_admission_total", "outcome" => "error").increment(1);
            AppError::from(e).into_response()
        }
    }
}

async fn read_limited(headers: &HeaderMap, body: Body, limit: usize) -> Result<Bytes, Response> {
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(payload_too_large(limit));
    }

    hyper::body::to_bytes(Limited::new(body, limit))
        .await
        .map_err(|e| {
            if e.is::<LengthLimitError>() {
                payload_too_large(limit)
            } else {
                tracing::debug!(error = %e, "failed to read request body");
                StatusCode::BAD_REQUEST.into_response()
            }
        })
}

fn payload_too_large(limit: usize) -> Response {
    metrics::counter!(
        "keel_admission_total",
        "outcome" => "rejected",
        "reason" => "too_large"
    )
    .increment(1);
    AppError::PayloadTooLarge(limit).into_response()
}

pub fn rejection_response(rejection: Rejection) -> Response {
    let status = StatusCode::from_u16(rejection.status()).unwrap_or(StatusCode::BAD_REQUEST);
    (status, Json(rejection.body())).into_response()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
}

fn body_kind(headers: &HeaderMap) -> Option<BodyKind> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let mime = content_type.split(';').next()?.trim();
    if mime.eq_ignore_ascii_case("application/json") {
        Some(BodyKind::Json)
    } else if mime.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
        Some(BodyKind::Form)
    } else {
        None
    }
}

fn from_headers(headers: &HeaderMap) -> Credentials {
    let value = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    Credentials::new(value(CLIENT_ID_HEADER), value(SESSION_ID_HEADER))
}

fn from_query(query: Option<&str>) -> Credentials {
    query
        .and_then(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok())
        .map(|pairs| from_pairs(&pairs))
        .unwrap_or_default()
}

/// Repeated keys resolve to their first non-blank value.
fn from_pairs(pairs: &[(String, String)]) -> Credentials {
    let first = |name: &str| {
        pairs
            .iter()
            .find(|(key, value)| key == name && !value.trim().is_empty())
            .map(|(_, value)| value.as_str())
    };
    Credentials::new(first("client_id"), first("session_id"))
}

fn from_body(kind: BodyKind, bytes: &Bytes) -> Credentials {
    match kind {
        BodyKind::Form => serde_urlencoded::from_bytes::<Vec<(String, String)>>(bytes)
            .map(|pairs| from_pairs(&pairs))
            .unwrap_or_default(),
        BodyKind::Json => {
            // Non-string values are ignored rather than failing the whole body.
            let parsed = serde_json::from_slice::<serde_json::Value>(bytes);
            let Ok(serde_json::Value::Object(map)) = parsed else {
                return Credentials::default();
            };
            let field = |name: &str| map.get(name).and_then(|v| v.as_str());
            Credentials::new(field("client_id"), field("session_id"))
        }
    }
}
