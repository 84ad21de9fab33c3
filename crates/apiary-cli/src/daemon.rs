use crate::api::{analytics_router, AnalyticsState};
use crate::config::ApiaryConfig;
use apiary_db::ApiaryDb;
use apiary_detect::AttackAnalyzer;
use apiary_fake::WalletForge;
use apiary_geo::GeoLocator;
use apiary_guard::RateLimiter;
use apiary_honeypot::server::{honeypot_router, HoneypotState, RatePolicy};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

pub async fn run_daemon(config: ApiaryConfig) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = std::path::Path::new(&config.db.path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db = ApiaryDb::open(&config.db.path)?;
    info!(path = %config.db.path, "attack store opened");

    let geo = GeoLocator::new()
        .with_endpoint(config.geo.endpoint.clone())
        .with_timeout(config.geo.timeout_secs);
    let forge = WalletForge::new(config.wallets.balance_min, config.wallets.balance_max);
    let limiter = Arc::new(RateLimiter::new());

    let honeypot_state = Arc::new(
        HoneypotState::new(db.clone_handle(), geo, forge)
            .with_limiter(limiter.clone())
            .with_rate_policy(RatePolicy {
                max_requests: config.rate_limit.max_requests,
                window: Duration::from_secs(config.rate_limit.window_secs),
            }),
    );

    let analytics_state = Arc::new(AnalyticsState {
        analyzer: AttackAnalyzer::new(db.clone_handle()),
        db: db.clone_handle(),
    });

    let app = honeypot_router(honeypot_state).merge(analytics_router(analytics_state));

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("honeypot listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        {
            error!("server error: {}", e);
        }
    });

    let cleanup_limiter = limiter.clone();
    let cleanup_interval_secs = config.rate_limit.cleanup_interval_secs;
    let cleanup_handle = tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(cleanup_interval_secs));
        loop {
            tick.tick().await;
            cleanup_limiter.cleanup();
            debug!(
                sources = cleanup_limiter.tracked_sources(),
                "rate window sweep complete"
            );
        }
    });

    let sweep_db = db.clone_handle();
    let retention_days = config.retention.log_retention_days;
    let sweep_interval_secs = config.retention.sweep_interval_secs;
    let sweep_handle = tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(sweep_interval_secs));
        loop {
            tick.tick().await;
            match sweep_db.delete_events_older_than(retention_days) {
                Ok(0) => {}
                Ok(n) => info!(deleted = n, days = retention_days, "retention sweep removed old events"),
                Err(e) => warn!(error = %e, "retention sweep failed"),
            }
        }
    });

    let stats = db.stats()?;
    info!(
        attacks = stats.total_attacks,
        wallets = stats.fake_wallets,
        "daemon running, honeypot + analytics + housekeeping active"
    );

    tokio::select! {
        _ = server_handle => error!("server task exited"),
        _ = cleanup_handle => error!("rate window cleanup task exited"),
        _ = sweep_handle => error!("retention sweep task exited"),
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
        }
    }

    info!("daemon stopped");
    Ok(())
}
