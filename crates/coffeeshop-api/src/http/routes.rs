//! HTTP route definitions and handlers.

use std::sync::Arc;

use axum::{
    async_trait,
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, FromRequestParts, Path, State},
    http::{header::CONTENT_TYPE, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info};

use coffeeshop_domain::{DomainError, DrinkPayload, LongDrink, Permission, ShortDrink};
use coffeeshop_storage::{DrinkStore, StorageError};

use super::state::AppState;
use crate::auth::AuthError;
use crate::middleware::{
    cors_layer, MetricsLayer, RequestIdLayer, RequestLoggingLayer, RequestMetrics,
};
use crate::observability::{metrics_handler, MetricsState};

/// Default request body size limit (1MB).
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

fn api_routes<S: DrinkStore>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route(
            "/drinks",
            get(list_drinks::<S>)
                .post(create_drink::<S>)
                .fallback(method_not_allowed),
        )
        .route(
            "/drinks-detail",
            get(list_drinks_detail::<S>).fallback(method_not_allowed),
        )
        .route(
            "/drinks/:id",
            axum::routing::patch(update_drink::<S>)
                .delete(delete_drink::<S>)
                .fallback(method_not_allowed),
        )
        .route("/health", get(health_check).fallback(method_not_allowed))
        .route(
            "/ready",
            get(readiness_check::<S>).fallback(method_not_allowed),
        )
        .fallback(not_found)
}

/// Creates the HTTP router with the drinks endpoints and probes.
///
/// Applies the default body size limit (1MB).
pub fn create_router<S: DrinkStore>(state: AppState<S>) -> Router {
    create_router_with_body_limit(state, DEFAULT_BODY_LIMIT)
}

/// Creates the HTTP router with a custom body size limit.
pub fn create_router_with_body_limit<S: DrinkStore>(
    state: AppState<S>,
    body_limit: usize,
) -> Router {
    api_routes::<S>()
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(Arc::new(state))
}

/// Route serving Prometheus metrics.
#[derive(Clone)]
pub struct MetricsEndpoint {
    pub path: String,
    pub state: MetricsState,
}

/// Settings for [`create_router_with_observability`].
#[derive(Clone)]
pub struct ObservabilityOptions {
    /// Maximum accepted request body size in bytes.
    pub body_limit: usize,
    /// Exposition route; omitted when metrics are disabled.
    pub metrics_endpoint: Option<MetricsEndpoint>,
    /// Per-request counters shared with the metrics middleware.
    pub request_metrics: Arc<RequestMetrics>,
}

impl Default for ObservabilityOptions {
    fn default() -> Self {
        Self {
            body_limit: DEFAULT_BODY_LIMIT,
            metrics_endpoint: None,
            request_metrics: Arc::new(RequestMetrics::new()),
        }
    }
}

/// Creates the production router: the drinks endpoints, the optional
/// metrics route and the request middleware stack.
///
/// Layers run outermost first: CORS, request ID, metrics, then the request
/// span and log.
pub fn create_router_with_observability<S: DrinkStore>(
    state: AppState<S>,
    options: ObservabilityOptions,
) -> Router {
    let mut router = create_router_with_body_limit(state, options.body_limit);

    if let Some(endpoint) = options.metrics_endpoint {
        let metrics_router = Router::new()
            .route(&endpoint.path, get(metrics_handler))
            .with_state(endpoint.state);
        router = router.merge(metrics_router);
    }

    router
        .layer(RequestLoggingLayer::new())
        .layer(MetricsLayer::new(options.request_metrics))
        .layer(RequestIdLayer::new())
        .layer(cors_layer())
}

// ============================================================
// Error Handling
// ============================================================

/// Error returned at the HTTP boundary.
///
/// Every failure becomes `{"success": false, "error": <status>, "message": <text>}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: u16,
    message: &'a str,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400: unreadable or non-JSON body.
    pub fn bad_request() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad request")
    }

    /// 404: unknown route, non-numeric id or missing drink.
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "resource not found")
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
    }

    pub fn payload_too_large() -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, "payload too large")
    }

    /// 422: invalid drink or duplicate title.
    pub fn unprocessable() -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "unprocessable")
    }

    pub fn internal_error() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }

    pub fn service_unavailable() -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "service unavailable")
    }

    pub fn gateway_timeout() -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, "gateway timeout")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: self.status.as_u16(),
            message: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::new(err.status(), err.description())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match &err {
            StorageError::DrinkNotFound { .. } => ApiError::not_found(),
            StorageError::DuplicateTitle { title } => {
                info!(title = %title, "Rejected duplicate drink title");
                ApiError::unprocessable()
            }
            StorageError::ConnectionError { .. } | StorageError::HealthCheckFailed { .. } => {
                error!("Storage unavailable: {}", err);
                ApiError::service_unavailable()
            }
            StorageError::QueryTimeout { .. } => {
                error!("Query timeout: {}", err);
                ApiError::gateway_timeout()
            }
            _ => {
                error!("Storage error: {}", err);
                ApiError::internal_error()
            }
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        if err.is_validation() {
            info!(reason = %err, "Rejected drink payload");
            ApiError::unprocessable()
        } else {
            error!("Domain error: {}", err);
            ApiError::internal_error()
        }
    }
}

type ApiResult<T> = Result<T, ApiError>;

async fn not_found() -> ApiError {
    ApiError::not_found()
}

async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

// ============================================================
// Request Parsing
// ============================================================

/// Numeric drink id taken from the `:id` path segment.
///
/// Anything other than ASCII digits that fit an `i64` is treated as an
/// unmatched route and answered with 404.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrinkId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for DrinkId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::not_found())?;
        parse_drink_id(&raw)
            .map(DrinkId)
            .ok_or_else(ApiError::not_found)
    }
}

fn parse_drink_id(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn has_json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

/// Reads a drink payload from a buffered request body.
///
/// The body is taken as a `Result` so that a protected handler can check the
/// token before reporting an oversized or unreadable body.
fn parse_json_body(
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<DrinkPayload> {
    let bytes = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::payload_too_large()
        } else {
            debug!(error = %rejection.body_text(), "Failed to read request body");
            ApiError::bad_request()
        }
    })?;

    if !has_json_content_type(headers) {
        debug!("Request body without a JSON content type");
        return Err(ApiError::bad_request());
    }

    let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
        debug!(error = %e, "Malformed JSON body");
        ApiError::bad_request()
    })?;
    if !value.is_object() {
        return Err(ApiError::bad_request());
    }

    serde_json::from_value(value).map_err(|e| {
        debug!(error = %e, "Unexpected drink payload shape");
        ApiError::bad_request()
    })
}

// ============================================================
// Health and Readiness Checks
// ============================================================

/// Liveness probe; does not touch the store.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "success": true, "status": "ok" }))
}

/// Readiness probe: 200 when the store answers its health check, 503 otherwise.
///
/// Failure details are logged but not exposed in the response.
async fn readiness_check<S: DrinkStore>(
    State(state): State<Arc<AppState<S>>>,
) -> ApiResult<impl IntoResponse> {
    match state.storage.health_check().await {
        Ok(status) if status.healthy => {
            debug!(latency_ms = status.latency.as_millis() as u64, "Storage ready");
            Ok(Json(serde_json::json!({ "success": true, "status": "ready" })))
        }
        Ok(status) => {
            error!(message = ?status.message, "Readiness check failed: storage unhealthy");
            Err(ApiError::service_unavailable())
        }
        Err(e) => {
            error!("Readiness check failed: storage unavailable: {}", e);
            Err(ApiError::service_unavailable())
        }
    }
}

// ============================================================
// Drinks
// ============================================================

/// Successful response carrying drinks in one of the two views.
#[derive(Debug, Serialize)]
pub struct DrinksResponse<T> {
    pub success: bool,
    pub drinks: Vec<T>,
}

impl<T> DrinksResponse<T> {
    fn new(drinks: Vec<T>) -> Self {
        Self {
            success: true,
            drinks,
        }
    }
}

/// Successful response to a delete.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub delete: i64,
}

async fn list_drinks<S: DrinkStore>(
    State(state): State<Arc<AppState<S>>>,
) -> ApiResult<Json<DrinksResponse<ShortDrink>>> {
    let drinks = state.storage.list_drinks().await?;
    Ok(Json(DrinksResponse::new(
        drinks.iter().map(|d| d.short()).collect(),
    )))
}

async fn list_drinks_detail<S: DrinkStore>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> ApiResult<Json<DrinksResponse<LongDrink>>> {
    state
        .verifier
        .authorize(&headers, Permission::GetDrinksDetail)
        .await?;

    let drinks = state.storage.list_drinks().await?;
    Ok(Json(DrinksResponse::new(
        drinks.iter().map(|d| d.long()).collect(),
    )))
}

async fn create_drink<S: DrinkStore>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<DrinksResponse<LongDrink>>> {
    let claims = state
        .verifier
        .authorize(&headers, Permission::PostDrinks)
        .await?;

    let new_drink = parse_json_body(&headers, body)?.validate()?;
    let drink = state.storage.create_drink(new_drink).await?;

    info!(drink_id = drink.id, subject = ?claims.sub, "Drink created");
    Ok(Json(DrinksResponse::new(vec![drink.long()])))
}

async fn update_drink<S: DrinkStore>(
    State(state): State<Arc<AppState<S>>>,
    DrinkId(id): DrinkId,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<DrinksResponse<LongDrink>>> {
    let claims = state
        .verifier
        .authorize(&headers, Permission::PatchDrinks)
        .await?;

    // An unknown id is reported before anything about the body.
    state.storage.get_drink(id).await?;

    let replacement = parse_json_body(&headers, body)?.validate()?;
    let drink = state.storage.update_drink(id, replacement).await?;

    info!(drink_id = drink.id, subject = ?claims.sub, "Drink replaced");
    Ok(Json(DrinksResponse::new(vec![drink.long()])))
}

async fn delete_drink<S: DrinkStore>(
    State(state): State<Arc<AppState<S>>>,
    DrinkId(id): DrinkId,
    headers: HeaderMap,
) -> ApiResult<Json<DeleteResponse>> {
    let claims = state
        .verifier
        .authorize(&headers, Permission::DeleteDrinks)
        .await?;

    let deleted = state.storage.delete_drink(id).await?;

    info!(drink_id = deleted, subject = ?claims.sub, "Drink deleted");
    Ok(Json(DeleteResponse {
        success: true,
        delete: deleted,
    }))
}
