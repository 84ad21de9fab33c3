use serde::Deserialize;

#[derive(Deserialize, Default)]
pub struct ApiaryConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub wallets: WalletConfig,
    #[serde(default)]
    pub geo: GeoConfig,
}

#[derive(Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Deserialize)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

#[derive(Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_retention_days")]
    pub log_retention_days: i64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

#[derive(Deserialize)]
pub struct WalletConfig {
    #[serde(default = "default_seed_count")]
    pub seed_count: usize,
    #[serde(default = "default_balance_min")]
    pub balance_min: f64,
    #[serde(default = "default_balance_max")]
    pub balance_max: f64,
}

#[derive(Deserialize)]
pub struct GeoConfig {
    #[serde(default = "default_geo_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_geo_timeout")]
    pub timeout_secs: u64,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_db_path() -> String {
    "./apiary-data/apiary.db".to_string()
}
fn default_max_requests() -> usize {
    100
}
fn default_window_secs() -> u64 {
    60
}
fn default_cleanup_interval() -> u64 {
    60
}
fn default_retention_days() -> i64 {
    90
}
fn default_sweep_interval() -> u64 {
    3600
}
fn default_seed_count() -> usize {
    10
}
fn default_balance_min() -> f64 {
    0.1
}
fn default_balance_max() -> f64 {
    5.0
}
fn default_geo_endpoint() -> String {
    "http://ip-api.com/json".to_string()
}
fn default_geo_timeout() -> u64 {
    5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            log_retention_days: default_retention_days(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            seed_count: default_seed_count(),
            balance_min: default_balance_min(),
            balance_max: default_balance_max(),
        }
    }
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            endpoint: default_geo_endpoint(),
            timeout_secs: default_geo_timeout(),
        }
    }
}

impl ApiaryConfig {
    /// Missing file falls back to full defaults; a present but malformed
    /// file is an error.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        if !std::path::Path::new(path).exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}
