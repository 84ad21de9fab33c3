use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    WalletCreation,
    WalletImport,
    BalanceScan,
    TransactionTest,
    HistoryScan,
    StatusCheck,
    BruteForce,
    ApiExploit,
    Unknown,
}

impl AttackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttackKind::WalletCreation => "wallet_creation",
            AttackKind::WalletImport => "wallet_import",
            AttackKind::BalanceScan => "balance_scan",
            AttackKind::TransactionTest => "transaction_test",
            AttackKind::HistoryScan => "history_scan",
            AttackKind::StatusCheck => "status_check",
            AttackKind::BruteForce => "brute_force",
            AttackKind::ApiExploit => "api_exploit",
            AttackKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AttackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttackKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wallet_creation" => Ok(AttackKind::WalletCreation),
            "wallet_import" => Ok(AttackKind::WalletImport),
            "balance_scan" => Ok(AttackKind::BalanceScan),
            "transaction_test" => Ok(AttackKind::TransactionTest),
            "history_scan" => Ok(AttackKind::HistoryScan),
            "status_check" => Ok(AttackKind::StatusCheck),
            "brute_force" => Ok(AttackKind::BruteForce),
            "api_exploit" => Ok(AttackKind::ApiExploit),
            "unknown" => Ok(AttackKind::Unknown),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Geolocation {
    pub country: String,
    pub country_code: String,
    pub region: String,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    pub isp: String,
}

impl Default for Geolocation {
    fn default() -> Self {
        Self {
            country: "Unknown".to_string(),
            country_code: "Unknown".to_string(),
            region: "Unknown".to_string(),
            city: "Unknown".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            timezone: "Unknown".to_string(),
            isp: "Unknown".to_string(),
        }
    }
}

/// One logged honeypot interaction. Written once by the attack logger,
/// never updated, removed only by the retention sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackEvent {
    pub timestamp: DateTime<Utc>,
    pub source_addr: String,
    pub method: String,
    pub endpoint: String,
    pub headers: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    pub query_params: HashMap<String, String>,
    pub response_status: u16,
    pub attack_kind: AttackKind,
    pub user_agent: String,
    pub geolocation: Geolocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FakeWallet {
    pub address: String,
    pub private_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_phrase: Option<String>,
    pub balance: f64,
    pub currency: String,
    pub is_fake: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FakeTransaction {
    pub hash: String,
    #[serde(rename = "from")]
    pub from_addr: String,
    #[serde(rename = "to")]
    pub to_addr: String,
    pub value: f64,
    pub status: String,
    pub block_number: Option<u64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub is_fake: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasEstimate {
    pub gas: u64,
    #[serde(rename = "gasPrice")]
    pub gas_price: u64,
    #[serde(rename = "estimatedCost")]
    pub estimated_cost: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxStatus {
    pub hash: String,
    pub status: String,
    pub confirmations: u32,
    pub is_fake: bool,
}

/// Per-source behavioral verdict. Derived fresh on every call, never
/// persisted or cached.
#[derive(Debug, Clone, Serialize)]
pub struct IpBehaviorReport {
    pub source_addr: String,
    pub total_requests: u64,
    pub unique_endpoints: usize,
    pub attack_kinds: HashMap<String, u64>,
    pub methods: HashMap<String, u64>,
    pub most_targeted_endpoint: Option<String>,
    pub is_suspicious: bool,
    pub suspicious_reasons: Vec<String>,
    pub window_hours: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayBucket {
    pub date: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendReport {
    pub trend: TrendDirection,
    pub average_per_day: f64,
    pub total_attacks: u64,
    pub days_analyzed: i64,
    pub timeline: Vec<DayBucket>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolCount {
    pub tool: String,
    pub count: u64,
}
