//! REST API for govchain
//!
//! Read endpoints are open; endpoints that change state require the shared
//! secret in the `X-API-Key` header.

use axum::{
    extract::{rejection::JsonRejection, Path, Request, State},
    http::{self, HeaderName, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::blockchain::Block;
use crate::error::{ChainError, IntegrityFault};
use crate::governance::{Proposal, ProposalId};
use crate::node::{Node, NodeState};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Shared state handed to every handler.
pub struct ApiContext {
    pub node: Node,
    pub api_key: String,
}

impl ApiContext {
    pub fn new(node: Node, api_key: impl Into<String>) -> Self {
        Self {
            node,
            api_key: api_key.into(),
        }
    }
}

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Chain(ChainError),
    InvalidInput(String),
    NotFound(String),
    Unauthorized,
}

fn status_for(err: &ChainError) -> StatusCode {
    match err {
        ChainError::ProposalNotFound(_) => StatusCode::NOT_FOUND,
        ChainError::AlreadyDecided(_) | ChainError::EmptyChain => StatusCode::CONFLICT,
        ChainError::InvalidReward(_)
        | ChainError::InvalidProposal(_)
        | ChainError::InvalidVote(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Chain(e) => (status_for(&e), e.to_string()),
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        ApiError::Chain(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {}", rejection);
        ApiError::InvalidInput("Invalid request body".to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct AddBlockRequest {
    pub data: String,
    pub miner: String,
    #[serde(default)]
    pub reward: f64,
}

#[derive(Deserialize)]
pub struct ProposeRequest {
    pub proposal: String,
}

#[derive(Deserialize)]
pub struct VoteRequest {
    #[serde(rename = "proposalID")]
    pub proposal_id: String,
    pub voter: String,
    pub approve: bool,
}

#[derive(Serialize)]
pub struct BlockResponse {
    pub message: String,
    pub block: Block,
    pub persisted: bool,
}

#[derive(Serialize)]
pub struct ProposalResponse {
    pub message: String,
    pub proposal: Proposal,
    pub persisted: bool,
}

#[derive(Serialize)]
pub struct FaultReport {
    pub index: u64,
    pub kind: IntegrityFault,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub length: usize,
    pub fault: Option<FaultReport>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_state: NodeState,
    pub height: usize,
    pub proposals: usize,
    pub timestamp: String,
}

// ============================================================================
// Middleware
// ============================================================================

/// Reject requests that do not carry the configured API key.
async fn require_api_key(
    State(ctx): State<Arc<ApiContext>>,
    req: Request,
    next: Next,
) -> Response {
    let provided = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    if provided != Some(ctx.api_key.as_str()) {
        tracing::warn!(path = %req.uri().path(), "api.unauthorized");
        return ApiError::Unauthorized.into_response();
    }

    next.run(req).await
}

/// Logs method, path, status and duration of every request.
async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Build the API router with all endpoints
pub fn build_api_router(ctx: Arc<ApiContext>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![
            http::header::CONTENT_TYPE,
            HeaderName::from_static(API_KEY_HEADER),
        ])
        .allow_credentials(true);

    let protected = Router::new()
        .route("/addBlock", post(add_block))
        .route("/propose", post(create_proposal))
        .route("/vote", post(cast_vote))
        .route_layer(middleware::from_fn_with_state(ctx.clone(), require_api_key));

    Router::new()
        // Ledger endpoints
        .route("/blocks", get(get_blocks))
        .route("/blocks/verify", get(verify_chain))
        .route("/blocks/:index", get(get_block))
        // Governance endpoints
        .route("/proposals", get(list_proposals))
        .route("/proposals/:id", get(get_proposal))
        // System endpoints
        .route("/health", get(health_check))
        .merge(protected)
        .layer(middleware::from_fn(logging_middleware))
        .with_state(ctx)
        .layer(cors)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}

/// Serve the API on `addr` until Ctrl-C.
pub async fn run_api_server(
    ctx: Arc<ApiContext>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_api_router(ctx);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn health_check(State(ctx): State<Arc<ApiContext>>) -> impl IntoResponse {
    let node_state = ctx.node.state().await;
    let (status, label) = match node_state {
        NodeState::Ready => (StatusCode::OK, "healthy"),
        NodeState::Degraded => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy"),
    };

    let body = HealthResponse {
        status: label.to_string(),
        node_state,
        height: ctx.node.height().await,
        proposals: ctx.node.governance().len(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    (status, Json(body))
}

async fn get_blocks(State(ctx): State<Arc<ApiContext>>) -> Json<Vec<Block>> {
    Json(ctx.node.blocks().await)
}

async fn get_block(
    State(ctx): State<Arc<ApiContext>>,
    Path(index): Path<u64>,
) -> Result<Json<Block>, ApiError> {
    ctx.node
        .block(index)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Block at index {} not found", index)))
}

/// Turn a verification outcome into the endpoint body. Only integrity faults
/// describe the chain; any other error means verification did not run.
fn verify_report(
    outcome: Result<(), ChainError>,
    length: usize,
) -> Result<VerifyResponse, ApiError> {
    let fault = match outcome {
        Ok(()) => None,
        Err(ChainError::ChainIntegrity { index, fault }) => Some(FaultReport { index, kind: fault }),
        Err(e) => {
            tracing::error!("Chain verification failed to run: {}", e);
            return Err(ApiError::Chain(e));
        }
    };

    Ok(VerifyResponse {
        valid: fault.is_none(),
        length,
        fault,
    })
}

async fn verify_chain(
    State(ctx): State<Arc<ApiContext>>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let length = ctx.node.height().await;
    verify_report(ctx.node.verify().await, length).map(Json)
}

async fn add_block(
    State(ctx): State<Arc<ApiContext>>,
    payload: Result<Json<AddBlockRequest>, JsonRejection>,
) -> Result<Json<BlockResponse>, ApiError> {
    let Json(req) = payload?;
    let committed = ctx.node.append_block(req.data, req.miner, req.reward).await?;

    Ok(Json(BlockResponse {
        message: "Block added successfully".to_string(),
        block: committed.value,
        persisted: committed.persisted,
    }))
}

async fn create_proposal(
    State(ctx): State<Arc<ApiContext>>,
    payload: Result<Json<ProposeRequest>, JsonRejection>,
) -> Result<Json<ProposalResponse>, ApiError> {
    let Json(req) = payload?;
    let committed = ctx.node.propose(req.proposal).await?;

    Ok(Json(ProposalResponse {
        message: "Proposal created successfully".to_string(),
        proposal: committed.value,
        persisted: committed.persisted,
    }))
}

async fn cast_vote(
    State(ctx): State<Arc<ApiContext>>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<Json<ProposalResponse>, ApiError> {
    let Json(req) = payload?;
    let id = ProposalId::from(req.proposal_id);
    let committed = ctx.node.cast_vote(&id, &req.voter, req.approve).await?;

    Ok(Json(ProposalResponse {
        message: "Vote recorded successfully".to_string(),
        proposal: committed.value,
        persisted: committed.persisted,
    }))
}

async fn list_proposals(State(ctx): State<Arc<ApiContext>>) -> Json<Vec<Proposal>> {
    Json(ctx.node.governance().list())
}

async fn get_proposal(
    State(ctx): State<Arc<ApiContext>>,
    Path(id): Path<String>,
) -> Result<Json<Proposal>, ApiError> {
    Ok(Json(ctx.node.proposal(&ProposalId::from(id))?))
}
