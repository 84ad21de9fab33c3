use apiary_core::{ApiaryResult, IpBehaviorReport, ToolCount, TrendReport};
use apiary_db::{ApiaryDb, EventFilter};
use chrono::{Duration, Utc};
use std::collections::HashMap;

/// Hard bound on how many events a single analysis call will scan.
const SCAN_CAP: usize = 1000;

/// Read-only analysis over the attack log. Every verdict is recomputed
/// from the store on each call; nothing here is cached or persisted.
pub struct AttackAnalyzer {
    db: ApiaryDb,
}

impl AttackAnalyzer {
    pub fn new(db: ApiaryDb) -> Self {
        Self { db }
    }

    /// Behavioral verdict for one source address over a trailing window.
    /// The three suspicion rules are evaluated independently; reasons
    /// accumulate in rule order.
    pub fn analyze_ip_behavior(
        &self,
        source_addr: &str,
        hours: i64,
    ) -> ApiaryResult<IpBehaviorReport> {
        let filter = EventFilter {
            source_addr: Some(source_addr.to_string()),
            start: Some(Utc::now() - Duration::hours(hours)),
            ..Default::default()
        };
        let (events, _) = self.db.query_events(&filter, SCAN_CAP, 0)?;

        if events.is_empty() {
            return Ok(IpBehaviorReport {
                source_addr: source_addr.to_string(),
                total_requests: 0,
                unique_endpoints: 0,
                attack_kinds: HashMap::new(),
                methods: HashMap::new(),
                most_targeted_endpoint: None,
                is_suspicious: false,
                suspicious_reasons: Vec::new(),
                window_hours: hours,
            });
        }

        let total = events.len() as u64;
        let mut endpoints: HashMap<String, u64> = HashMap::new();
        let mut kinds: HashMap<String, u64> = HashMap::new();
        let mut methods: HashMap<String, u64> = HashMap::new();
        for event in &events {
            *endpoints.entry(event.endpoint.clone()).or_default() += 1;
            *kinds
                .entry(event.attack_kind.as_str().to_string())
                .or_default() += 1;
            *methods.entry(event.method.clone()).or_default() += 1;
        }

        let (top_endpoint, top_count) = endpoints
            .iter()
            .max_by_key(|(_, n)| **n)
            .map(|(endpoint, n)| (endpoint.clone(), *n))
            .unwrap_or_default();

        let mut reasons = Vec::new();
        if total > 100 {
            reasons.push(format!("too many requests: {} in {}h", total, hours));
        }
        if kinds.len() > 3 {
            reasons.push(format!("attempted many attack kinds: {}", kinds.len()));
        }
        if top_count > 50 {
            reasons.push(format!("endpoint spam: {} ({} times)", top_endpoint, top_count));
        }

        Ok(IpBehaviorReport {
            source_addr: source_addr.to_string(),
            total_requests: total,
            unique_endpoints: endpoints.len(),
            attack_kinds: kinds,
            methods,
            most_targeted_endpoint: Some(top_endpoint),
            is_suspicious: !reasons.is_empty(),
            suspicious_reasons: reasons,
            window_hours: hours,
        })
    }

    pub fn attack_trends(&self, days: i64) -> ApiaryResult<TrendReport> {
        let timeline = self.db.timeline(days)?;
        Ok(crate::trends::trend_from_timeline(days, timeline))
    }

    /// Histogram of client tooling over recent events, busiest tool first.
    pub fn tool_usage(&self) -> ApiaryResult<Vec<ToolCount>> {
        let (events, _) = self.db.query_events(&EventFilter::default(), SCAN_CAP, 0)?;

        let mut counts: HashMap<&'static str, u64> = HashMap::new();
        for event in &events {
            *counts
                .entry(crate::tools::identify_tool(&event.user_agent))
                .or_default() += 1;
        }

        let mut usage: Vec<ToolCount> = counts
            .into_iter()
            .map(|(tool, count)| ToolCount {
                tool: tool.to_string(),
                count,
            })
            .collect();
        usage.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(usage)
    }
}
