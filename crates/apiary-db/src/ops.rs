use apiary_core::{
    ApiaryError, ApiaryResult, AttackEvent, AttackKind, DayBucket, FakeWallet,
};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, params_from_iter, Connection};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

pub struct ApiaryDb {
    conn: Arc<Mutex<Connection>>,
}

/// Filter for attack-event queries. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub source_addr: Option<String>,
    pub attack_kind: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl EventFilter {
    fn where_clause(&self) -> (String, Vec<String>) {
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(ref addr) = self.source_addr {
            clauses.push("source_addr = ?");
            args.push(addr.clone());
        }
        if let Some(ref kind) = self.attack_kind {
            clauses.push("attack_kind = ?");
            args.push(kind.clone());
        }
        if let Some(start) = self.start {
            clauses.push("timestamp >= ?");
            args.push(start.to_rfc3339());
        }
        if let Some(end) = self.end {
            clauses.push("timestamp <= ?");
            args.push(end.to_rfc3339());
        }

        if clauses.is_empty() {
            (String::new(), args)
        } else {
            (format!(" WHERE {}", clauses.join(" AND ")), args)
        }
    }
}

impl ApiaryDb {
    pub fn open(path: &str) -> ApiaryResult<Self> {
        let conn = Connection::open(path).map_err(|e| ApiaryError::Store(e.to_string()))?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA busy_timeout=5000;",
        )
        .map_err(|e| ApiaryError::Store(e.to_string()))?;
        crate::schema::run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> ApiaryResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| ApiaryError::Store(e.to_string()))?;
        crate::schema::run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn clone_handle(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }

    fn with_conn<F, T>(&self, f: F) -> ApiaryResult<T>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ApiaryError::Store(e.to_string()))?;
        f(&conn).map_err(|e| ApiaryError::Store(e.to_string()))
    }

    pub fn append_event(&self, event: &AttackEvent) -> ApiaryResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let headers_json = serde_json::to_string(&event.headers)
            .map_err(|e| ApiaryError::Store(e.to_string()))?;
        let payload_json = match &event.payload {
            Some(v) => {
                Some(serde_json::to_string(v).map_err(|e| ApiaryError::Store(e.to_string()))?)
            }
            None => None,
        };
        let query_json = serde_json::to_string(&event.query_params)
            .map_err(|e| ApiaryError::Store(e.to_string()))?;
        let geo_json = serde_json::to_string(&event.geolocation)
            .map_err(|e| ApiaryError::Store(e.to_string()))?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO attack_events (id, timestamp, source_addr, method, endpoint, headers_json, payload_json, query_json, response_status, attack_kind, user_agent, geo_json) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    id,
                    event.timestamp.to_rfc3339(),
                    event.source_addr,
                    event.method,
                    event.endpoint,
                    headers_json,
                    payload_json,
                    query_json,
                    event.response_status,
                    event.attack_kind.as_str(),
                    event.user_agent,
                    geo_json,
                ],
            )?;
            Ok(id)
        })
    }

    pub fn query_events(
        &self,
        filter: &EventFilter,
        limit: usize,
        offset: usize,
    ) -> ApiaryResult<(Vec<AttackEvent>, u64)> {
        let (where_sql, args) = filter.where_clause();
        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM attack_events{}", where_sql),
                params_from_iter(args.iter()),
                |r| r.get(0),
            )?;

            let sql = format!(
                "SELECT timestamp, source_addr, method, endpoint, headers_json, payload_json, query_json, response_status, attack_kind, user_agent, geo_json FROM attack_events{} ORDER BY timestamp DESC LIMIT {} OFFSET {}",
                where_sql, limit as i64, offset as i64
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(args.iter()), row_to_event)?;
            let events = rows.collect::<Result<Vec<_>, _>>()?;
            Ok((events, total as u64))
        })
    }

    pub fn top_sources(&self, limit: usize) -> ApiaryResult<Vec<SourceCount>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT source_addr, COUNT(*) AS n FROM attack_events GROUP BY source_addr ORDER BY n DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit as i64], |row| {
                Ok(SourceCount {
                    source_addr: row.get(0)?,
                    count: row.get::<_, i64>(1)? as u64,
                })
            })?;
            rows.collect()
        })
    }

    pub fn kind_counts(&self) -> ApiaryResult<Vec<KindCount>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT attack_kind, COUNT(*) AS n FROM attack_events GROUP BY attack_kind ORDER BY n DESC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(KindCount {
                    attack_kind: row.get(0)?,
                    count: row.get::<_, i64>(1)? as u64,
                })
            })?;
            rows.collect()
        })
    }

    /// Daily event counts for the trailing window, oldest day first.
    /// Days without events produce no bucket.
    pub fn timeline(&self, days: i64) -> ApiaryResult<Vec<DayBucket>> {
        let start = (Utc::now() - Duration::days(days)).to_rfc3339();
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT strftime('%Y-%m-%d', timestamp) AS day, COUNT(*) FROM attack_events WHERE timestamp >= ?1 GROUP BY day ORDER BY day ASC",
            )?;
            let rows = stmt.query_map(params![start], |row| {
                Ok(DayBucket {
                    date: row.get(0)?,
                    count: row.get::<_, i64>(1)? as u64,
                })
            })?;
            rows.collect()
        })
    }

    pub fn delete_events_older_than(&self, days: i64) -> ApiaryResult<u64> {
        let cutoff = (Utc::now() - Duration::days(days)).to_rfc3339();
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM attack_events WHERE timestamp < ?1",
                params![cutoff],
            )?;
            Ok(deleted as u64)
        })
    }

    pub fn wipe(&self) -> ApiaryResult<()> {
        self.with_conn(|conn| {
            conn.execute_batch("DELETE FROM attack_events; DELETE FROM fake_wallets;")?;
            Ok(())
        })
    }

    pub fn stats(&self) -> ApiaryResult<StoreStats> {
        let top_sources = self.top_sources(10)?;
        let attack_kinds = self.kind_counts()?;
        let today_start = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc()
            .to_rfc3339();
        self.with_conn(|conn| {
            let total: i64 = conn.query_row("SELECT COUNT(*) FROM attack_events", [], |r| r.get(0))?;
            let today: i64 = conn.query_row(
                "SELECT COUNT(*) FROM attack_events WHERE timestamp >= ?1",
                params![today_start],
                |r| r.get(0),
            )?;
            let wallets: i64 =
                conn.query_row("SELECT COUNT(*) FROM fake_wallets", [], |r| r.get(0))?;
            Ok(StoreStats {
                total_attacks: total as u64,
                today_attacks: today as u64,
                fake_wallets: wallets as u64,
                top_sources,
                attack_kinds,
            })
        })
    }

    pub fn insert_wallet(&self, wallet: &FakeWallet) -> ApiaryResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO fake_wallets (address, private_key, seed_phrase, balance, currency, is_fake, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    wallet.address,
                    wallet.private_key,
                    wallet.seed_phrase,
                    wallet.balance,
                    wallet.currency,
                    wallet.is_fake as i32,
                    wallet.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn wallet_exists(&self, address: &str) -> ApiaryResult<bool> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM fake_wallets WHERE address = ?1",
                params![address],
                |r| r.get(0),
            )?;
            Ok(n > 0)
        })
    }

    pub fn get_wallet(&self, address: &str) -> ApiaryResult<Option<FakeWallet>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT address, private_key, seed_phrase, balance, currency, is_fake, created_at FROM fake_wallets WHERE address = ?1",
            )?;
            let mut rows = stmt.query_map(params![address], row_to_wallet)?;
            rows.next().transpose()
        })
    }

    pub fn list_wallets(
        &self,
        limit: usize,
        offset: usize,
    ) -> ApiaryResult<(Vec<FakeWallet>, u64)> {
        self.with_conn(|conn| {
            let total: i64 =
                conn.query_row("SELECT COUNT(*) FROM fake_wallets", [], |r| r.get(0))?;
            let mut stmt = conn.prepare(
                "SELECT address, private_key, seed_phrase, balance, currency, is_fake, created_at FROM fake_wallets ORDER BY created_at DESC LIMIT ?1 OFFSET ?2",
            )?;
            let rows = stmt.query_map(params![limit as i64, offset as i64], row_to_wallet)?;
            let wallets = rows.collect::<Result<Vec<_>, _>>()?;
            Ok((wallets, total as u64))
        })
    }

    pub fn update_wallet_balance(&self, address: &str, balance: f64) -> ApiaryResult<bool> {
        let now = Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE fake_wallets SET balance = ?1, updated_at = ?2 WHERE address = ?3",
                params![balance, now, address],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_wallet(&self, address: &str) -> ApiaryResult<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM fake_wallets WHERE address = ?1",
                params![address],
            )?;
            Ok(changed > 0)
        })
    }
}

fn row_to_event(row: &rusqlite::Row<'_>) -> Result<AttackEvent, rusqlite::Error> {
    let ts_str: String = row.get(0)?;
    let headers_str: String = row.get(4)?;
    let payload_str: Option<String> = row.get(5)?;
    let query_str: String = row.get(6)?;
    let kind_str: String = row.get(8)?;
    let geo_str: String = row.get(10)?;
    Ok(AttackEvent {
        timestamp: chrono::DateTime::parse_from_rfc3339(&ts_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        source_addr: row.get(1)?,
        method: row.get(2)?,
        endpoint: row.get(3)?,
        headers: serde_json::from_str(&headers_str).unwrap_or_default(),
        payload: payload_str.and_then(|s| serde_json::from_str(&s).ok()),
        query_params: serde_json::from_str(&query_str).unwrap_or_default(),
        response_status: row.get::<_, i64>(7)? as u16,
        attack_kind: AttackKind::from_str(&kind_str).unwrap_or(AttackKind::Unknown),
        user_agent: row.get(9)?,
        geolocation: serde_json::from_str(&geo_str).unwrap_or_default(),
    })
}

fn row_to_wallet(row: &rusqlite::Row<'_>) -> Result<FakeWallet, rusqlite::Error> {
    let is_fake: i32 = row.get(5)?;
    let created_str: String = row.get(6)?;
    Ok(FakeWallet {
        address: row.get(0)?,
        private_key: row.get(1)?,
        seed_phrase: row.get(2)?,
        balance: row.get(3)?,
        currency: row.get(4)?,
        is_fake: is_fake != 0,
        created_at: chrono::DateTime::parse_from_rfc3339(&created_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreStats {
    pub total_attacks: u64,
    pub today_attacks: u64,
    pub fake_wallets: u64,
    pub top_sources: Vec<SourceCount>,
    pub attack_kinds: Vec<KindCount>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SourceCount {
    pub source_addr: String,
    pub count: u64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct KindCount {
    pub attack_kind: String,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn event_at(ts: DateTime<Utc>, source: &str, kind: AttackKind, endpoint: &str) -> AttackEvent {
        AttackEvent {
            timestamp: ts,
            source_addr: source.to_string(),
            method: "GET".to_string(),
            endpoint: endpoint.to_string(),
            headers: HashMap::new(),
            payload: None,
            query_params: HashMap::new(),
            response_status: 200,
            attack_kind: kind,
            user_agent: "curl/8.0".to_string(),
            geolocation: Default::default(),
        }
    }

    #[test]
    fn append_and_query_roundtrip() {
        let db = ApiaryDb::open_in_memory().unwrap();
        let mut event = event_at(Utc::now(), "203.0.113.9", AttackKind::BalanceScan, "/api/wallet/balance");
        event.payload = Some(serde_json::json!({"address": "0xabc"}));
        event
            .headers
            .insert("user-agent".to_string(), "curl/8.0".to_string());

        let id = db.append_event(&event).unwrap();
        assert!(!id.is_empty());

        let (events, total) = db.query_events(&EventFilter::default(), 10, 0).unwrap();
        assert_eq!(total, 1);
        assert_eq!(events.len(), 1);
        let got = &events[0];
        assert_eq!(got.source_addr, "203.0.113.9");
        assert_eq!(got.attack_kind, AttackKind::BalanceScan);
        assert_eq!(got.payload, Some(serde_json::json!({"address": "0xabc"})));
        assert_eq!(got.headers.get("user-agent").unwrap(), "curl/8.0");
    }

    #[test]
    fn filters_by_source_and_kind() {
        let db = ApiaryDb::open_in_memory().unwrap();
        let now = Utc::now();
        db.append_event(&event_at(now, "198.51.100.1", AttackKind::BruteForce, "/api/wallet/import"))
            .unwrap();
        db.append_event(&event_at(now, "198.51.100.2", AttackKind::BalanceScan, "/api/wallet/balance"))
            .unwrap();
        db.append_event(&event_at(now, "198.51.100.1", AttackKind::BalanceScan, "/api/wallet/balance"))
            .unwrap();

        let filter = EventFilter {
            source_addr: Some("198.51.100.1".to_string()),
            ..Default::default()
        };
        let (_, total) = db.query_events(&filter, 100, 0).unwrap();
        assert_eq!(total, 2);

        let filter = EventFilter {
            source_addr: Some("198.51.100.1".to_string()),
            attack_kind: Some("brute_force".to_string()),
            ..Default::default()
        };
        let (events, total) = db.query_events(&filter, 100, 0).unwrap();
        assert_eq!(total, 1);
        assert_eq!(events[0].attack_kind, AttackKind::BruteForce);
    }

    #[test]
    fn time_range_filter_excludes_old_events() {
        let db = ApiaryDb::open_in_memory().unwrap();
        let now = Utc::now();
        db.append_event(&event_at(now - Duration::hours(48), "198.51.100.7", AttackKind::Unknown, "/"))
            .unwrap();
        db.append_event(&event_at(now, "198.51.100.7", AttackKind::Unknown, "/"))
            .unwrap();

        let filter = EventFilter {
            start: Some(now - Duration::hours(24)),
            ..Default::default()
        };
        let (_, total) = db.query_events(&filter, 100, 0).unwrap();
        assert_eq!(total, 1);
    }

    #[test]
    fn timeline_buckets_by_day_ascending() {
        let db = ApiaryDb::open_in_memory().unwrap();
        let now = Utc::now();
        for _ in 0..3 {
            db.append_event(&event_at(now, "192.0.2.1", AttackKind::Unknown, "/"))
                .unwrap();
        }
        for _ in 0..2 {
            db.append_event(&event_at(now - Duration::days(2), "192.0.2.1", AttackKind::Unknown, "/"))
                .unwrap();
        }

        let timeline = db.timeline(7).unwrap();
        assert_eq!(timeline.len(), 2);
        assert!(timeline[0].date < timeline[1].date);
        assert_eq!(timeline[0].count, 2);
        assert_eq!(timeline[1].count, 3);
    }

    #[test]
    fn retention_sweep_deletes_only_old_events() {
        let db = ApiaryDb::open_in_memory().unwrap();
        let now = Utc::now();
        db.append_event(&event_at(now - Duration::days(120), "192.0.2.5", AttackKind::Unknown, "/"))
            .unwrap();
        db.append_event(&event_at(now, "192.0.2.5", AttackKind::Unknown, "/"))
            .unwrap();

        let deleted = db.delete_events_older_than(90).unwrap();
        assert_eq!(deleted, 1);
        let (_, total) = db.query_events(&EventFilter::default(), 10, 0).unwrap();
        assert_eq!(total, 1);
    }

    #[test]
    fn wallet_crud() {
        let db = ApiaryDb::open_in_memory().unwrap();
        let wallet = FakeWallet {
            address: "0xAb5801a7D398351b8bE11C439e05C5B3259aeC9B".to_string(),
            private_key: format!("0x{}", "11".repeat(32)),
            seed_phrase: Some("abandon ability able about above absent absorb abstract absurd abuse access accident".to_string()),
            balance: 1.25,
            currency: "ETH".to_string(),
            is_fake: true,
            created_at: Utc::now(),
        };

        assert!(!db.wallet_exists(&wallet.address).unwrap());
        db.insert_wallet(&wallet).unwrap();
        assert!(db.wallet_exists(&wallet.address).unwrap());

        let got = db.get_wallet(&wallet.address).unwrap().unwrap();
        assert_eq!(got.balance, 1.25);
        assert!(got.is_fake);

        assert!(db.update_wallet_balance(&wallet.address, 2.5).unwrap());
        let got = db.get_wallet(&wallet.address).unwrap().unwrap();
        assert_eq!(got.balance, 2.5);

        let (wallets, total) = db.list_wallets(10, 0).unwrap();
        assert_eq!(total, 1);
        assert_eq!(wallets.len(), 1);

        assert!(db.delete_wallet(&wallet.address).unwrap());
        assert!(!db.delete_wallet(&wallet.address).unwrap());
        assert!(db.get_wallet(&wallet.address).unwrap().is_none());
    }
}
