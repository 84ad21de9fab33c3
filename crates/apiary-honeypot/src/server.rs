use apiary_core::{ApiaryError, ApiaryResult, AttackKind};
use apiary_db::ApiaryDb;
use apiary_fake::{ChainSim, WalletForge};
use apiary_geo::GeoLocator;
use apiary_guard::{RateLimiter, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW};
use axum::{
    extract::{ConnectInfo, Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;

use crate::context::RequestContext;
use crate::logger::{AttackLogger, LogOverrides};
use crate::response;

#[derive(Debug, Clone, Copy)]
pub struct RatePolicy {
    pub max_requests: usize,
    pub window: Duration,
}

impl Default for RatePolicy {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window: DEFAULT_WINDOW,
        }
    }
}

/// Everything a handler needs, wired once at startup and passed down
/// explicitly. No ambient globals.
pub struct HoneypotState {
    pub db: ApiaryDb,
    pub logger: AttackLogger,
    pub forge: WalletForge,
    pub limiter: Arc<RateLimiter>,
    pub rate_policy: RatePolicy,
}

impl HoneypotState {
    pub fn new(db: ApiaryDb, geo: GeoLocator, forge: WalletForge) -> Self {
        Self {
            logger: AttackLogger::new(db.clone_handle(), geo),
            db,
            forge,
            limiter: Arc::new(RateLimiter::new()),
            rate_policy: RatePolicy::default(),
        }
    }

    pub fn with_rate_policy(mut self, policy: RatePolicy) -> Self {
        self.rate_policy = policy;
        self
    }

    /// Share a limiter owned elsewhere (the daemon keeps a handle for its
    /// periodic cleanup task).
    pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }
}

pub fn honeypot_router(state: Arc<HoneypotState>) -> Router {
    Router::new()
        .route("/api/wallet/create", post(create_wallet))
        .route("/api/wallet/import", post(import_wallet))
        .route("/api/wallet/balance", get(get_balance))
        .route("/api/wallet/list", get(list_wallets))
        .route("/api/wallet/{address}", get(wallet_detail).delete(remove_wallet))
        .route("/api/transfer", post(transfer))
        .route("/api/transaction/history", get(transaction_history))
        .route("/api/transaction/status", get(transaction_status))
        .route("/health", get(health))
        .layer(middleware::from_fn_with_state(state.clone(), admission))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Admission gate. Rejected requests are answered immediately and never
/// reach handlers, so they consume no logging or storage resources.
pub async fn admission(
    State(state): State<Arc<HoneypotState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    let key = peer.ip().to_string();
    if !state
        .limiter
        .is_allowed(&key, state.rate_policy.max_requests, state.rate_policy.window)
    {
        return response::fail(
            StatusCode::TOO_MANY_REQUESTS,
            "too many requests, try again later",
        );
    }
    next.run(req).await
}

async fn health() -> Response {
    response::ok(json!({"status": "healthy", "database": "connected"}))
}

async fn create_wallet(
    State(state): State<Arc<HoneypotState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request,
) -> Response {
    let ctx = RequestContext::capture(peer, req).await;
    unwrap_response(handle_create_wallet(&state, &ctx).await)
}

async fn handle_create_wallet(
    state: &HoneypotState,
    ctx: &RequestContext,
) -> ApiaryResult<Response> {
    state
        .logger
        .log_request(AttackKind::WalletCreation, ctx, LogOverrides::default())
        .await?;

    let wallet = state.forge.wallet(true);
    state.db.insert_wallet(&wallet)?;

    // key material is withheld here; only the other endpoints hand it out
    Ok(response::created(
        "wallet created",
        json!({
            "address": wallet.address,
            "balance": wallet.balance,
            "currency": wallet.currency,
        }),
    ))
}

async fn import_wallet(
    State(state): State<Arc<HoneypotState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request,
) -> Response {
    let ctx = RequestContext::capture(peer, req).await;
    unwrap_response(handle_import_wallet(&state, &ctx).await)
}

async fn handle_import_wallet(
    state: &HoneypotState,
    ctx: &RequestContext,
) -> ApiaryResult<Response> {
    // logged before validation so malformed probes are recorded too
    state
        .logger
        .log_request(AttackKind::WalletImport, ctx, LogOverrides::default())
        .await?;

    let seed_phrase = ctx
        .payload
        .as_ref()
        .and_then(|p| p.get("seed_phrase"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| ApiaryError::Validation("seed phrase is required".to_string()))?;

    let word_count = seed_phrase.split_whitespace().count();
    if word_count != 12 && word_count != 24 {
        return Err(ApiaryError::Validation(
            "seed phrase must be 12 or 24 words".to_string(),
        ));
    }

    let mut wallet = state.forge.wallet(true);
    wallet.seed_phrase = Some(seed_phrase.to_string());
    state.db.insert_wallet(&wallet)?;

    Ok(response::ok_with_message(
        "wallet imported",
        json!({
            "address": wallet.address,
            "balance": wallet.balance,
        }),
    ))
}

async fn get_balance(
    State(state): State<Arc<HoneypotState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request,
) -> Response {
    let ctx = RequestContext::capture(peer, req).await;
    unwrap_response(handle_get_balance(&state, &ctx).await)
}

async fn handle_get_balance(
    state: &HoneypotState,
    ctx: &RequestContext,
) -> ApiaryResult<Response> {
    state
        .logger
        .log_request(AttackKind::BalanceScan, ctx, LogOverrides::default())
        .await?;

    let address = ctx
        .query_params
        .get("address")
        .ok_or_else(|| ApiaryError::Validation("wallet address is required".to_string()))?;

    if !ChainSim::is_address(address) {
        return Err(ApiaryError::Validation("invalid wallet address".to_string()));
    }

    Ok(response::ok(json!({
        "address": address,
        "balance": ChainSim::fake_balance(address),
        "currency": "ETH",
    })))
}

async fn transfer(
    State(state): State<Arc<HoneypotState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request,
) -> Response {
    let ctx = RequestContext::capture(peer, req).await;
    unwrap_response(handle_transfer(&state, &ctx).await)
}

async fn handle_transfer(state: &HoneypotState, ctx: &RequestContext) -> ApiaryResult<Response> {
    state
        .logger
        .log_request(AttackKind::TransactionTest, ctx, LogOverrides::default())
        .await?;

    let payload = ctx.payload.clone().unwrap_or_else(|| json!({}));
    for field in ["from_address", "to_address", "amount"] {
        if payload.get(field).is_none() {
            return Err(ApiaryError::Validation(format!("missing field: {}", field)));
        }
    }

    let from_address = payload["from_address"].as_str().unwrap_or_default().to_string();
    let to_address = payload["to_address"].as_str().unwrap_or_default().to_string();

    if !ChainSim::is_address(&from_address) {
        return Err(ApiaryError::Validation("invalid sender address".to_string()));
    }
    if !ChainSim::is_address(&to_address) {
        return Err(ApiaryError::Validation("invalid recipient address".to_string()));
    }

    let amount = payload["amount"]
        .as_f64()
        .or_else(|| payload["amount"].as_str().and_then(|s| s.parse().ok()))
        .unwrap_or(0.0);

    let tx = ChainSim::fake_transaction(&from_address, &to_address, amount);
    let gas = ChainSim::estimate_gas(&tx);

    Ok(response::ok_with_message(
        "transaction is being processed",
        json!({
            "transaction_hash": tx.hash,
            "status": tx.status,
            "from": from_address,
            "to": to_address,
            "amount": payload["amount"],
            "gas": gas,
        }),
    ))
}

async fn transaction_history(
    State(state): State<Arc<HoneypotState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request,
) -> Response {
    let ctx = RequestContext::capture(peer, req).await;
    unwrap_response(handle_transaction_history(&state, &ctx).await)
}

async fn handle_transaction_history(
    state: &HoneypotState,
    ctx: &RequestContext,
) -> ApiaryResult<Response> {
    state
        .logger
        .log_request(AttackKind::HistoryScan, ctx, LogOverrides::default())
        .await?;

    let address = ctx
        .query_params
        .get("address")
        .ok_or_else(|| ApiaryError::Validation("wallet address is required".to_string()))?;

    let transactions = ChainSim::fake_history(address);
    let total = transactions.as_array().map(Vec::len).unwrap_or(0);

    Ok(response::ok(json!({
        "address": address,
        "transactions": transactions,
        "total": total,
    })))
}

async fn transaction_status(
    State(state): State<Arc<HoneypotState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request,
) -> Response {
    let ctx = RequestContext::capture(peer, req).await;
    unwrap_response(handle_transaction_status(&state, &ctx).await)
}

async fn handle_transaction_status(
    state: &HoneypotState,
    ctx: &RequestContext,
) -> ApiaryResult<Response> {
    state
        .logger
        .log_request(AttackKind::StatusCheck, ctx, LogOverrides::default())
        .await?;

    let hash = ctx
        .query_params
        .get("hash")
        .ok_or_else(|| ApiaryError::Validation("transaction hash is required".to_string()))?;

    let status = ChainSim::transaction_status(hash);
    Ok(response::ok(serde_json::to_value(status)?))
}

#[derive(Deserialize)]
struct PageParams {
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    skip: usize,
}

fn default_limit() -> usize {
    100
}

async fn list_wallets(
    State(state): State<Arc<HoneypotState>>,
    Query(params): Query<PageParams>,
) -> Response {
    let limit = params.limit.max(1);
    match state.db.list_wallets(limit, params.skip) {
        Ok((wallets, total)) => response::ok(json!({
            "wallets": wallets,
            "total": total,
            "page": params.skip / limit + 1,
            "per_page": limit,
        })),
        Err(e) => response::from_error(e),
    }
}

async fn wallet_detail(
    State(state): State<Arc<HoneypotState>>,
    Path(address): Path<String>,
) -> Response {
    match state.db.get_wallet(&address) {
        Ok(Some(wallet)) => match serde_json::to_value(&wallet) {
            Ok(data) => response::ok(data),
            Err(e) => response::from_error(e.into()),
        },
        Ok(None) => response::fail(StatusCode::NOT_FOUND, "wallet not found"),
        Err(e) => response::from_error(e),
    }
}

async fn remove_wallet(
    State(state): State<Arc<HoneypotState>>,
    Path(address): Path<String>,
) -> Response {
    match state.db.delete_wallet(&address) {
        Ok(true) => response::ok_with_message("wallet deleted", json!({"address": address})),
        Ok(false) => response::fail(StatusCode::NOT_FOUND, "wallet not found"),
        Err(e) => response::from_error(e),
    }
}

fn unwrap_response(result: ApiaryResult<Response>) -> Response {
    match result {
        Ok(resp) => resp,
        Err(e) => response::from_error(e),
    }
}
