use apiary_core::{ApiaryResult, AttackEvent, AttackKind};
use apiary_db::ApiaryDb;
use apiary_geo::GeoLocator;
use chrono::Utc;
use tracing::info;

use crate::context::RequestContext;

/// Caller-supplied fields that win over what the logger derives from the
/// request itself.
#[derive(Debug, Clone, Default)]
pub struct LogOverrides {
    pub attack_kind: Option<AttackKind>,
    pub response_status: Option<u16>,
    pub payload: Option<serde_json::Value>,
}

/// Turns raw request contexts into persisted attack events. Geolocation
/// failures degrade to defaults; only store failures propagate.
pub struct AttackLogger {
    db: ApiaryDb,
    geo: GeoLocator,
}

impl AttackLogger {
    pub fn new(db: ApiaryDb, geo: GeoLocator) -> Self {
        Self { db, geo }
    }

    /// Appends exactly one event and returns its store id.
    pub async fn log_request(
        &self,
        attack_kind: AttackKind,
        ctx: &RequestContext,
        overrides: LogOverrides,
    ) -> ApiaryResult<String> {
        let source_addr = ctx.source_address();
        let geolocation = self.geo.resolve(&source_addr).await;

        let event = AttackEvent {
            timestamp: Utc::now(),
            source_addr,
            method: ctx.method.clone(),
            endpoint: ctx.path.clone(),
            headers: ctx.headers.clone(),
            payload: overrides.payload.or_else(|| ctx.payload.clone()),
            query_params: ctx.query_params.clone(),
            response_status: overrides.response_status.unwrap_or(200),
            attack_kind: overrides.attack_kind.unwrap_or(attack_kind),
            user_agent: ctx.user_agent(),
            geolocation,
        };

        let id = self.db.append_event(&event)?;
        info!(
            id = %id,
            addr = %event.source_addr,
            kind = %event.attack_kind,
            endpoint = %event.endpoint,
            "attack logged"
        );
        Ok(id)
    }

    /// Secondary heuristic classification, independent of the kind the
    /// endpoint passes explicitly. Rules run in a fixed order; the first
    /// match wins.
    pub fn classify(ctx: &RequestContext) -> AttackKind {
        CLASSIFY_RULES
            .iter()
            .find(|(matches, _)| matches(ctx))
            .map(|(_, kind)| *kind)
            .unwrap_or(AttackKind::Unknown)
    }
}

type ClassifyRule = (fn(&RequestContext) -> bool, AttackKind);

const CLASSIFY_RULES: &[ClassifyRule] = &[
    (payload_mentions_key_material, AttackKind::BruteForce),
    (uses_mutating_method, AttackKind::ApiExploit),
    (touches_transaction_paths, AttackKind::TransactionTest),
    (probes_balances, AttackKind::BalanceScan),
];

fn payload_mentions_key_material(ctx: &RequestContext) -> bool {
    ctx.payload
        .as_ref()
        .map(|p| {
            let raw = p.to_string();
            raw.contains("private_key") || raw.contains("seed")
        })
        .unwrap_or(false)
}

fn uses_mutating_method(ctx: &RequestContext) -> bool {
    matches!(ctx.method.as_str(), "PUT" | "DELETE" | "PATCH")
}

fn touches_transaction_paths(ctx: &RequestContext) -> bool {
    ctx.path.contains("transfer") || ctx.path.contains("transaction")
}

fn probes_balances(ctx: &RequestContext) -> bool {
    ctx.method == "GET" && ctx.path.contains("balance")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn ctx(method: &str, path: &str, payload: Option<serde_json::Value>) -> RequestContext {
        RequestContext {
            method: method.to_string(),
            path: path.to_string(),
            headers: HashMap::new(),
            query_params: HashMap::new(),
            payload,
            peer_addr: "127.0.0.1".to_string(),
        }
    }

    #[test]
    fn key_material_in_payload_is_brute_force() {
        let context = ctx(
            "POST",
            "/api/wallet/import",
            Some(serde_json::json!({"private_key": "0xabc"})),
        );
        assert_eq!(AttackLogger::classify(&context), AttackKind::BruteForce);

        let context = ctx(
            "POST",
            "/api/wallet/import",
            Some(serde_json::json!({"seed_phrase": "a b c"})),
        );
        assert_eq!(AttackLogger::classify(&context), AttackKind::BruteForce);
    }

    #[test]
    fn mutating_methods_are_api_exploit() {
        assert_eq!(
            AttackLogger::classify(&ctx("PUT", "/api/wallet/list", None)),
            AttackKind::ApiExploit
        );
        assert_eq!(
            AttackLogger::classify(&ctx("DELETE", "/api/wallet/0xabc", None)),
            AttackKind::ApiExploit
        );
        assert_eq!(
            AttackLogger::classify(&ctx("PATCH", "/api/wallet/0xabc", None)),
            AttackKind::ApiExploit
        );
    }

    #[test]
    fn transaction_paths_are_transaction_test() {
        assert_eq!(
            AttackLogger::classify(&ctx("POST", "/api/transfer", None)),
            AttackKind::TransactionTest
        );
        assert_eq!(
            AttackLogger::classify(&ctx("GET", "/api/transaction/history", None)),
            AttackKind::TransactionTest
        );
    }

    #[test]
    fn balance_reads_are_balance_scan() {
        assert_eq!(
            AttackLogger::classify(&ctx("GET", "/api/wallet/balance", None)),
            AttackKind::BalanceScan
        );
        // only GETs count as scans
        assert_eq!(
            AttackLogger::classify(&ctx("POST", "/api/wallet/balance", None)),
            AttackKind::Unknown
        );
    }

    #[test]
    fn rule_order_puts_payload_inspection_first() {
        // a DELETE whose payload mentions a seed is brute force, not exploit
        let context = ctx(
            "DELETE",
            "/api/wallet/0xabc",
            Some(serde_json::json!({"seed": "x"})),
        );
        assert_eq!(AttackLogger::classify(&context), AttackKind::BruteForce);
    }

    #[test]
    fn everything_else_is_unknown() {
        assert_eq!(
            AttackLogger::classify(&ctx("GET", "/", None)),
            AttackKind::Unknown
        );
    }

    #[tokio::test]
    async fn log_request_persists_one_event_with_overrides() {
        let db = ApiaryDb::open_in_memory().unwrap();
        let logger = AttackLogger::new(db.clone_handle(), GeoLocator::new());

        let context = ctx("POST", "/api/wallet/create", None);
        let id = logger
            .log_request(
                AttackKind::WalletCreation,
                &context,
                LogOverrides {
                    response_status: Some(201),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!id.is_empty());

        let (events, total) = db
            .query_events(&apiary_db::EventFilter::default(), 10, 0)
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(events[0].attack_kind, AttackKind::WalletCreation);
        assert_eq!(events[0].response_status, 201);
        assert_eq!(events[0].user_agent, "Unknown");
        // loopback peer short-circuits geolocation to defaults
        assert_eq!(events[0].geolocation.country, "Unknown");
    }
}
