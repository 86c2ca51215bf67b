use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, patch},
};
use chrono::Utc;
use entity::{devices, imeis, search_history, users};
use platform_access::{
    DeviceSnapshot, Operation, PermissionMatrix, ResourceKind, ScopeFilter, can_access_device,
    can_access_imei, redact,
};
use platform_authn::{AccessContext, ContextError, RequestPrincipal};
use platform_db::{DbPool, ScopeColumns, scope_condition};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseBackend, EntityTrait, JoinType,
    QueryFilter, QuerySelect, RelationTrait, Set, Statement,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    audit,
    config::AppConfig,
    store::{PrincipalRepo, principal_from_model},
};

const DEVICE_COLUMNS: ScopeColumns = ScopeColumns {
    owner: "owner_id",
    brand: "brand",
    organization: "organization",
    identifier: "imei_number",
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<AppConfig>,
    pub matrix: Arc<PermissionMatrix>,
    pub access: Arc<AccessContext>,
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "eir server listening");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let allow_origin = if allowed.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed)
    };
    CorsLayer::new()
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_methods([Method::GET, Method::PATCH])
        .allow_origin(allow_origin)
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");
    Router::new()
        .route("/health", get(health_handler))
        .route("/imei/{imei}", get(lookup_imei_handler))
        .route("/imei/{imei}/status", patch(update_imei_status_handler))
        .route("/devices", get(list_devices_handler))
        .route("/devices/{id}", get(get_device_handler))
        .route("/users/{id}/permissions", get(user_permissions_handler))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = state
        .pool
        .execute(Statement::from_string(
            DatabaseBackend::Postgres,
            "SELECT 1".to_string(),
        ))
        .await
        .is_ok();
    Json(HealthResponse {
        ok: db_ok,
        db_ok,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    db_ok: bool,
    version: &'static str,
}

async fn lookup_imei_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(imei): Path<String>,
) -> HttpResult<Json<serde_json::Value>> {
    let caller = resolve_caller(&state, addr, &headers).await?;
    let principal = caller.principal();
    if !state.matrix.has_permission(principal, Operation::ReadImei) {
        return Err(HttpError::insufficient(Operation::ReadImei));
    }

    let record = imeis::Entity::find()
        .filter(imeis::Column::ImeiNumber.eq(imei.as_str()))
        .one(&state.pool)
        .await
        .map_err(|err| HttpError::internal(err.into()))?;
    let device = match &record {
        Some(row) => devices::Entity::find_by_id(row.device_id)
            .one(&state.pool)
            .await
            .map_err(|err| HttpError::internal(err.into()))?,
        None => None,
    };

    let decision = can_access_imei(principal, &imei, |_| {
        device.as_ref().map(|d| d.brand.clone())
    });
    audit::record_decision(
        &state.pool,
        principal.map(|p| p.id),
        "imei_lookup",
        &imei,
        &decision,
    )
    .await;
    if !decision.allowed {
        return Err(HttpError::denied(decision.reason.as_str()));
    }

    let search_logged = match principal {
        Some(p) => {
            let entry = search_history::ActiveModel {
                id: Set(Uuid::new_v4()),
                imei_number: Set(imei.clone()),
                user_id: Set(Some(p.id)),
                found: Set(record.is_some()),
                created_at: Set(Utc::now().into()),
            };
            match entry.insert(&state.pool).await {
                Ok(_) => true,
                Err(err) => {
                    warn!(%err, "failed to record search history");
                    false
                }
            }
        }
        None => false,
    };

    let payload = json!({
        "imei": imei,
        "found": record.is_some(),
        "status": record.as_ref().map(|r| r.status.clone()),
        "message": match &record {
            Some(_) => "IMEI registered",
            None => "IMEI not found in the register",
        },
        "device": device.as_ref().map(|d| json!({
            "brand": d.brand,
            "model": d.model,
        })),
        "search_logged": search_logged,
        "access": decision,
    });
    Ok(Json(redact(principal, ResourceKind::Imei, &payload)))
}

#[derive(Deserialize)]
struct StatusUpdate {
    status: String,
}

async fn update_imei_status_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(imei): Path<String>,
    Json(body): Json<StatusUpdate>,
) -> HttpResult<Json<serde_json::Value>> {
    let caller = resolve_caller(&state, addr, &headers).await?;
    let principal = caller
        .principal()
        .ok_or_else(HttpError::authentication_required)?;
    if !state
        .matrix
        .has_permission(Some(principal), Operation::UpdateImeiStatus)
    {
        return Err(HttpError::insufficient(Operation::UpdateImeiStatus));
    }

    let record = imeis::Entity::find()
        .filter(imeis::Column::ImeiNumber.eq(imei.as_str()))
        .one(&state.pool)
        .await
        .map_err(|err| HttpError::internal(err.into()))?
        .ok_or_else(|| HttpError::new(StatusCode::NOT_FOUND, "unknown IMEI"))?;
    let device = devices::Entity::find_by_id(record.device_id)
        .one(&state.pool)
        .await
        .map_err(|err| HttpError::internal(err.into()))?;

    let decision = can_access_imei(Some(principal), &imei, |_| {
        device.as_ref().map(|d| d.brand.clone())
    });
    audit::record_decision(
        &state.pool,
        Some(principal.id),
        "imei_status_update",
        &imei,
        &decision,
    )
    .await;
    if !decision.allowed {
        return Err(HttpError::denied(decision.reason.as_str()));
    }

    let mut update: imeis::ActiveModel = record.into();
    update.status = Set(body.status.clone());
    update.updated_at = Set(Utc::now().into());
    let updated = update
        .update(&state.pool)
        .await
        .map_err(|err| HttpError::internal(err.into()))?;

    Ok(Json(json!({
        "imei": updated.imei_number,
        "status": updated.status,
    })))
}

async fn list_devices_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> HttpResult<Json<Vec<serde_json::Value>>> {
    let caller = resolve_caller(&state, addr, &headers).await?;
    let principal = caller
        .principal()
        .ok_or_else(HttpError::authentication_required)?;
    if !state
        .matrix
        .has_permission(Some(principal), Operation::ReadDevice)
    {
        return Err(HttpError::insufficient(Operation::ReadDevice));
    }

    let scope = state.matrix.resolve_scope(Some(principal));
    let query = match &scope {
        // Range rules classify IMEIs, so the predicate lands on the joined
        // imeis table rather than on devices itself.
        ScopeFilter::Ranges { .. } => devices::Entity::find()
            .join(JoinType::InnerJoin, devices::Relation::Imeis.def())
            .filter(scope_condition(&scope, &DEVICE_COLUMNS))
            .distinct(),
        _ => devices::Entity::find().filter(scope_condition(&scope, &DEVICE_COLUMNS)),
    };
    let rows = query
        .all(&state.pool)
        .await
        .map_err(|err| HttpError::internal(err.into()))?;

    let body = rows
        .iter()
        .map(|row| {
            redact(
                Some(principal),
                ResourceKind::Device,
                &device_payload(row),
            )
        })
        .collect();
    Ok(Json(body))
}

async fn get_device_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> HttpResult<Json<serde_json::Value>> {
    let caller = resolve_caller(&state, addr, &headers).await?;
    let principal = caller.principal();

    let row = devices::Entity::find_by_id(id)
        .one(&state.pool)
        .await
        .map_err(|err| HttpError::internal(err.into()))?
        .ok_or_else(|| HttpError::new(StatusCode::NOT_FOUND, "unknown device"))?;

    let snapshot = DeviceSnapshot {
        owner_id: row.owner_id,
        brand: Some(row.brand.clone()),
        organization: row.organization.clone(),
    };
    let decision = can_access_device(principal, &snapshot);
    audit::record_decision(
        &state.pool,
        principal.map(|p| p.id),
        "device_read",
        &row.id.to_string(),
        &decision,
    )
    .await;
    if !decision.allowed {
        return Err(HttpError::denied(decision.reason.as_str()));
    }

    Ok(Json(redact(
        principal,
        ResourceKind::Device,
        &device_payload(&row),
    )))
}

async fn user_permissions_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> HttpResult<Json<serde_json::Value>> {
    let caller = resolve_caller(&state, addr, &headers).await?;
    let principal = caller
        .principal()
        .ok_or_else(HttpError::authentication_required)?;
    if !state
        .matrix
        .has_permission(Some(principal), Operation::ManagePermissions)
    {
        return Err(HttpError::insufficient(Operation::ManagePermissions));
    }

    let row = users::Entity::find_by_id(id)
        .one(&state.pool)
        .await
        .map_err(|err| HttpError::internal(err.into()))?
        .ok_or_else(|| HttpError::new(StatusCode::NOT_FOUND, "unknown user"))?;
    let subject = principal_from_model(&row);
    let summary = state.matrix.summarize(&subject);
    let body =
        serde_json::to_value(&summary).map_err(|err| HttpError::internal(err.into()))?;
    Ok(Json(body))
}

fn device_payload(row: &devices::Model) -> serde_json::Value {
    json!({
        "id": row.id,
        "brand": row.brand,
        "model": row.model,
        "owner_id": row.owner_id,
        "organization": row.organization,
        "created_at": row.created_at,
    })
}

async fn resolve_caller(
    state: &AppState,
    addr: SocketAddr,
    headers: &HeaderMap,
) -> HttpResult<RequestPrincipal> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    state
        .access
        .resolve(addr.ip(), bearer, &PrincipalRepo(&state.pool))
        .await
        .map_err(Into::into)
}

type HttpResult<T> = Result<T, HttpError>;

#[derive(Debug)]
struct HttpError {
    status: StatusCode,
    message: String,
    reason: Option<String>,
}

impl HttpError {
    fn new(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            reason: None,
        }
    }

    fn internal(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
            reason: None,
        }
    }

    fn authentication_required() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "authentication required")
    }

    fn insufficient(operation: Operation) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: format!(
                "insufficient permissions for operation {}",
                operation.as_str()
            ),
            reason: None,
        }
    }

    fn denied(reason: &str) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: "access denied".to_string(),
            reason: Some(reason.to_string()),
        }
    }
}

impl From<ContextError> for HttpError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::Throttled(inner) => {
                Self::new(StatusCode::TOO_MANY_REQUESTS, &inner.to_string())
            }
            ContextError::Store(inner) => Self::internal(inner),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.message,
            "reason": self.reason,
        });
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use platform_authn::RateExceeded;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn throttled_context_maps_to_429() {
        let err = HttpError::from(ContextError::Throttled(RateExceeded {
            limit: 10,
            window: std::time::Duration::from_secs(3600),
        }));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn denied_decision_carries_reason_token() {
        let response = HttpError::denied("brand-restricted").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["reason"], "brand-restricted");
        assert_eq!(body["error"], "access denied");
    }

    #[tokio::test]
    async fn insufficient_permission_names_the_operation() {
        let response = HttpError::insufficient(Operation::ManagePermissions).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert!(
            body["error"]
                .as_str()
                .expect("error string")
                .contains("manage_permissions")
        );
        assert_eq!(body["reason"], serde_json::Value::Null);
    }

    #[test]
    fn cors_layer_accepts_configured_origins() {
        // Must not panic on a well-formed origin list.
        let _ = cors_layer(&["http://localhost:5173".to_string()]);
        let _ = cors_layer(&[]);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
}
