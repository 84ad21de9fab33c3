use apiary_db::{ApiaryDb, EventFilter};
use apiary_detect::AttackAnalyzer;
use apiary_honeypot::response;
use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Read-side surface over the attack log. Separate from the lure endpoints;
/// nothing here writes events.
pub struct AnalyticsState {
    pub db: ApiaryDb,
    pub analyzer: AttackAnalyzer,
}

pub fn analytics_router(state: Arc<AnalyticsState>) -> Router {
    Router::new()
        .route("/api/analytics/stats", get(stats))
        .route("/api/analytics/attacks", get(attacks))
        .route("/api/analytics/top-ips", get(top_ips))
        .route("/api/analytics/attack-types", get(attack_types))
        .route("/api/analytics/timeline", get(timeline))
        .route("/api/analytics/ip-analysis/{address}", get(ip_analysis))
        .route("/api/analytics/trends", get(trends))
        .route("/api/analytics/tools", get(tools))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn json_ok<T: serde::Serialize>(value: &T) -> Response {
    match serde_json::to_value(value) {
        Ok(v) => response::ok(v),
        Err(e) => response::from_error(e.into()),
    }
}

async fn stats(State(state): State<Arc<AnalyticsState>>) -> Response {
    match state.db.stats() {
        Ok(stats) => json_ok(&stats),
        Err(e) => response::from_error(e),
    }
}

#[derive(Deserialize)]
struct AttackParams {
    #[serde(default = "default_page")]
    page: usize,
    #[serde(default = "default_per_page")]
    per_page: usize,
    attack_type: Option<String>,
    ip: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

fn default_page() -> usize {
    1
}

fn default_per_page() -> usize {
    20
}

async fn attacks(
    State(state): State<Arc<AnalyticsState>>,
    Query(params): Query<AttackParams>,
) -> Response {
    let per_page = params.per_page.max(1);
    let skip = (params.page.max(1) - 1) * per_page;

    // unparseable dates are ignored rather than rejected
    let filter = EventFilter {
        source_addr: params.ip,
        attack_kind: params.attack_type,
        start: params
            .start_date
            .as_deref()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        end: params
            .end_date
            .as_deref()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
    };

    match state.db.query_events(&filter, per_page, skip) {
        Ok((events, total)) => response::ok(json!({
            "logs": events,
            "total": total,
            "page": skip / per_page + 1,
            "per_page": per_page,
        })),
        Err(e) => response::from_error(e),
    }
}

#[derive(Deserialize)]
struct LimitParams {
    #[serde(default = "default_top_limit")]
    limit: usize,
}

fn default_top_limit() -> usize {
    10
}

async fn top_ips(
    State(state): State<Arc<AnalyticsState>>,
    Query(params): Query<LimitParams>,
) -> Response {
    match state.db.top_sources(params.limit) {
        Ok(sources) => json_ok(&sources),
        Err(e) => response::from_error(e),
    }
}

async fn attack_types(State(state): State<Arc<AnalyticsState>>) -> Response {
    match state.db.kind_counts() {
        Ok(kinds) => json_ok(&kinds),
        Err(e) => response::from_error(e),
    }
}

#[derive(Deserialize)]
struct DaysParams {
    #[serde(default = "default_days")]
    days: i64,
}

fn default_days() -> i64 {
    7
}

async fn timeline(
    State(state): State<Arc<AnalyticsState>>,
    Query(params): Query<DaysParams>,
) -> Response {
    match state.db.timeline(params.days) {
        Ok(buckets) => json_ok(&buckets),
        Err(e) => response::from_error(e),
    }
}

#[derive(Deserialize)]
struct HoursParams {
    #[serde(default = "default_hours")]
    hours: i64,
}

fn default_hours() -> i64 {
    24
}

async fn ip_analysis(
    State(state): State<Arc<AnalyticsState>>,
    Path(address): Path<String>,
    Query(params): Query<HoursParams>,
) -> Response {
    match state.analyzer.analyze_ip_behavior(&address, params.hours) {
        Ok(report) => json_ok(&report),
        Err(e) => response::from_error(e),
    }
}

async fn trends(
    State(state): State<Arc<AnalyticsState>>,
    Query(params): Query<DaysParams>,
) -> Response {
    match state.analyzer.attack_trends(params.days) {
        Ok(report) => json_ok(&report),
        Err(e) => response::from_error(e),
    }
}

async fn tools(State(state): State<Arc<AnalyticsState>>) -> Response {
    match state.analyzer.tool_usage() {
        Ok(usage) => json_ok(&usage),
        Err(e) => response::from_error(e),
    }
}
