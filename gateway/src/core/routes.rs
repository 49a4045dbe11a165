use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};

use common::error::ApiError;
use common::schemas::{FleetStatus, NodePair, Pin, RegisterRequest};
use common::trace_context::trace_context_middleware;
use common::url_utils::sanitize_url;

use crate::core::registry::Registration;
use crate::core::state::GatewayState;
use crate::core::upload::assemble;

// Room for multipart framing around a file of the maximum size.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn router(state: GatewayState) -> Router {
    let body_limit = state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/status", get(get_status))
        .route("/pins", get(list_pins))
        .route(
            "/add",
            post(add_file).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/file/{cid}", get(get_file))
        .route("/admin/nodes", get(list_nodes).post(register_node))
        .layer(middleware::from_fn(trace_context_middleware))
        .with_state(state)
}

// GET /status
#[tracing::instrument(name = "gateway.status", skip(ctx))]
pub async fn get_status(State(ctx): State<GatewayState>) -> Json<FleetStatus> {
    Json(ctx.dispatcher.fleet_status().await)
}

// GET /pins
#[tracing::instrument(name = "gateway.pins", skip(ctx))]
pub async fn list_pins(State(ctx): State<GatewayState>) -> Result<Json<Vec<Pin>>, ApiError> {
    let pins = ctx.dispatcher.get_pins(&ctx.cancel()).await?;
    Ok(Json(pins))
}

// POST /add
#[tracing::instrument(name = "gateway.add", skip(ctx, multipart))]
pub async fn add_file(
    State(ctx): State<GatewayState>,
    multipart: Multipart,
) -> Result<(StatusCode, String), ApiError> {
    let cancel = ctx.cancel();

    // Reading the upload counts against the request deadline too.
    let upload = tokio::select! {
        reason = cancel.cancelled() => return Err(ApiError::Cancelled(reason)),
        res = assemble(multipart, ctx.max_upload_bytes) => res?,
    };

    let added = ctx.dispatcher.add_file(&upload, &cancel).await?;
    Ok((StatusCode::CREATED, added.cid))
}

// GET /file/{cid}
#[tracing::instrument(name = "gateway.file", skip(ctx))]
pub async fn get_file(
    Path(cid): Path<String>,
    State(ctx): State<GatewayState>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = ctx.dispatcher.get_file(&cid, &ctx.cancel()).await?;
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    ))
}

// GET /admin/nodes
#[tracing::instrument(name = "gateway.admin.list_nodes", skip(ctx))]
pub async fn list_nodes(State(ctx): State<GatewayState>) -> Json<Vec<NodePair>> {
    Json(ctx.dispatcher.registry().snapshot())
}

// POST /admin/nodes
#[tracing::instrument(
    name = "gateway.admin.register_node",
    skip(ctx),
    fields(node_url = %req.node_url, cluster_url = %req.cluster_url)
)]
pub async fn register_node(
    State(ctx): State<GatewayState>,
    Json(req): Json<RegisterRequest>,
) -> Result<StatusCode, ApiError> {
    let node_url = sanitize_url(&req.node_url).map_err(ApiError::InvalidUrl)?;
    let cluster_url = sanitize_url(&req.cluster_url).map_err(ApiError::InvalidUrl)?;

    match ctx.dispatcher.register(&node_url, &cluster_url)? {
        Registration::Added => Ok(StatusCode::CREATED),
        Registration::AlreadyPresent => Ok(StatusCode::OK),
    }
}
