use apiary_core::{ApiaryError, ApiaryResult, Geolocation};
use serde_json::Value;
use std::net::IpAddr;
use std::time::Duration;
use tracing::warn;

const DEFAULT_ENDPOINT: &str = "http://ip-api.com/json";
const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Client for the external IP-to-location service. Lookups are bounded by
/// a short timeout and any failure degrades to the all-"Unknown" default;
/// a slow or broken lookup must never stall or fail request handling.
pub struct GeoLocator {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl Default for GeoLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl GeoLocator {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Loopback, private, and unparseable-but-local addresses short-circuit
    /// without a network call.
    pub async fn resolve(&self, address: &str) -> Geolocation {
        if is_local_or_private(address) {
            return Geolocation::default();
        }

        match self.lookup(address).await {
            Ok(geo) => geo,
            Err(e) => {
                warn!(addr = %address, error = %e, "geolocation lookup failed");
                Geolocation::default()
            }
        }
    }

    async fn lookup(&self, address: &str) -> ApiaryResult<Geolocation> {
        let url = format!("{}/{}", self.endpoint, address);
        let resp = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ApiaryError::Geo(format!(
                "lookup returned {}",
                resp.status()
            )));
        }

        let body: Value = resp.json().await?;
        from_response(&body)
    }
}

fn from_response(body: &Value) -> ApiaryResult<Geolocation> {
    if body.get("status").and_then(|s| s.as_str()) != Some("success") {
        return Err(ApiaryError::Geo("lookup reported failure".to_string()));
    }

    Ok(Geolocation {
        country: field_or_unknown(body, "country"),
        country_code: field_or_unknown(body, "countryCode"),
        region: field_or_unknown(body, "regionName"),
        city: field_or_unknown(body, "city"),
        latitude: body.get("lat").and_then(Value::as_f64).unwrap_or(0.0),
        longitude: body.get("lon").and_then(Value::as_f64).unwrap_or(0.0),
        timezone: field_or_unknown(body, "timezone"),
        isp: field_or_unknown(body, "isp"),
    })
}

fn field_or_unknown(body: &Value, key: &str) -> String {
    body.get(key)
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_string()
}

fn is_local_or_private(address: &str) -> bool {
    if address.is_empty() || address == "localhost" || address == "unknown" {
        return true;
    }
    match address.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => {
            v4.is_loopback() || v4.is_private() || v4.is_unspecified() || v4.is_link_local()
        }
        Ok(IpAddr::V6(v6)) => v6.is_loopback() || v6.is_unspecified(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_and_private_addresses_short_circuit() {
        assert!(is_local_or_private("127.0.0.1"));
        assert!(is_local_or_private("localhost"));
        assert!(is_local_or_private("10.0.0.4"));
        assert!(is_local_or_private("192.168.1.20"));
        assert!(is_local_or_private("172.16.0.1"));
        assert!(is_local_or_private("::1"));
        assert!(is_local_or_private(""));
        assert!(!is_local_or_private("8.8.8.8"));
        assert!(!is_local_or_private("203.0.113.9"));
    }

    #[tokio::test]
    async fn loopback_resolves_to_defaults_without_network() {
        let geo = GeoLocator::new().resolve("127.0.0.1").await;
        assert_eq!(geo.country, "Unknown");
        assert_eq!(geo.latitude, 0.0);
    }

    #[test]
    fn successful_body_maps_all_fields() {
        let body = serde_json::json!({
            "status": "success",
            "country": "Germany",
            "countryCode": "DE",
            "regionName": "Berlin",
            "city": "Berlin",
            "lat": 52.52,
            "lon": 13.405,
            "timezone": "Europe/Berlin",
            "isp": "Example Carrier"
        });
        let geo = from_response(&body).unwrap();
        assert_eq!(geo.country, "Germany");
        assert_eq!(geo.country_code, "DE");
        assert_eq!(geo.latitude, 52.52);
        assert_eq!(geo.isp, "Example Carrier");
    }

    #[test]
    fn failed_body_is_an_error() {
        let body = serde_json::json!({"status": "fail", "message": "private range"});
        assert!(from_response(&body).is_err());
    }

    #[test]
    fn missing_fields_default_to_unknown() {
        let body = serde_json::json!({"status": "success", "country": "France"});
        let geo = from_response(&body).unwrap();
        assert_eq!(geo.country, "France");
        assert_eq!(geo.city, "Unknown");
        assert_eq!(geo.longitude, 0.0);
    }
}
