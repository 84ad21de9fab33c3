use apiary_core::ApiaryResult;
use rusqlite::Connection;

pub fn run_migrations(conn: &Connection) -> ApiaryResult<()> {
    conn.execute_batch(SCHEMA_V1)
        .map_err(|e| apiary_core::ApiaryError::Store(e.to_string()))?;
    Ok(())
}

const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS attack_events (
    id TEXT PRIMARY KEY,
    timestamp TEXT NOT NULL,
    source_addr TEXT NOT NULL,
    method TEXT NOT NULL,
    endpoint TEXT NOT NULL,
    headers_json TEXT NOT NULL,
    payload_json TEXT,
    query_json TEXT NOT NULL,
    response_status INTEGER NOT NULL,
    attack_kind TEXT NOT NULL,
    user_agent TEXT NOT NULL,
    geo_json TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS fake_wallets (
    address TEXT PRIMARY KEY,
    private_key TEXT NOT NULL,
    seed_phrase TEXT,
    balance REAL NOT NULL DEFAULT 0.0,
    currency TEXT NOT NULL DEFAULT 'ETH',
    is_fake INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_events_ts ON attack_events(timestamp);
CREATE INDEX IF NOT EXISTS idx_events_source ON attack_events(source_addr);
CREATE INDEX IF NOT EXISTS idx_events_kind ON attack_events(attack_kind);
CREATE INDEX IF NOT EXISTS idx_wallets_created ON fake_wallets(created_at);
"#;
