use axum::extract::Request;
use axum::http::HeaderMap;
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;

/// Largest request body worth capturing into the attack log.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// One normalized view of an inbound request, captured once per handler so
/// the logger and the classifier see identical data.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub query_params: HashMap<String, String>,
    pub payload: Option<Value>,
    pub peer_addr: String,
}

impl RequestContext {
    pub async fn capture(peer: SocketAddr, req: Request) -> Self {
        let (parts, body) = req.into_parts();
        let method = parts.method.to_string();
        let path = parts.uri.path().to_string();
        let headers = headers_to_map(&parts.headers);
        let query_params = parts
            .uri
            .query()
            .map(parse_pairs)
            .unwrap_or_default();

        // a body that fails to read is logged as absent, never an error
        let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .unwrap_or_default();
        let content_type = headers.get("content-type").cloned().unwrap_or_default();
        let payload = extract_payload(&content_type, &bytes);

        Self {
            method,
            path,
            headers,
            query_params,
            payload,
            peer_addr: peer.ip().to_string(),
        }
    }

    /// Source address with reverse-proxy precedence: first X-Forwarded-For
    /// entry, then X-Real-IP, then the transport peer. The forwarded value
    /// is client-supplied; a spoofed one still gets logged as-is.
    pub fn source_address(&self) -> String {
        self.headers
            .get("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| self.headers.get("x-real-ip").cloned())
            .unwrap_or_else(|| self.peer_addr.clone())
    }

    pub fn user_agent(&self) -> String {
        self.headers
            .get("user-agent")
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

fn headers_to_map(headers: &HeaderMap) -> HashMap<String, String> {
    // duplicate header names collapse last-wins
    headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|val| (k.to_string(), val.to_string())))
        .collect()
}

fn parse_pairs(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// JSON bodies win over form bodies; anything else is treated as absent so
/// malformed probes still log cleanly.
fn extract_payload(content_type: &str, bytes: &[u8]) -> Option<Value> {
    if bytes.is_empty() {
        return None;
    }
    if content_type.contains("application/json") {
        return serde_json::from_slice(bytes).ok();
    }
    if content_type.contains("application/x-www-form-urlencoded") {
        let map: serde_json::Map<String, Value> = url::form_urlencoded::parse(bytes)
            .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
            .collect();
        if map.is_empty() {
            return None;
        }
        return Some(Value::Object(map));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with_headers(pairs: &[(&str, &str)]) -> RequestContext {
        RequestContext {
            method: "GET".to_string(),
            path: "/".to_string(),
            headers: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            query_params: HashMap::new(),
            payload: None,
            peer_addr: "192.0.2.10".to_string(),
        }
    }

    #[test]
    fn forwarded_for_wins_over_everything() {
        let ctx = ctx_with_headers(&[
            ("x-forwarded-for", "203.0.113.7, 10.0.0.1"),
            ("x-real-ip", "198.51.100.9"),
        ]);
        assert_eq!(ctx.source_address(), "203.0.113.7");
    }

    #[test]
    fn forwarded_for_first_entry_is_trimmed() {
        let ctx = ctx_with_headers(&[("x-forwarded-for", "  203.0.113.8 , 10.0.0.1")]);
        assert_eq!(ctx.source_address(), "203.0.113.8");
    }

    #[test]
    fn real_ip_beats_peer_address() {
        let ctx = ctx_with_headers(&[("x-real-ip", "198.51.100.9")]);
        assert_eq!(ctx.source_address(), "198.51.100.9");
    }

    #[test]
    fn peer_address_is_the_fallback() {
        let ctx = ctx_with_headers(&[]);
        assert_eq!(ctx.source_address(), "192.0.2.10");
    }

    #[test]
    fn missing_user_agent_defaults_to_unknown() {
        let ctx = ctx_with_headers(&[]);
        assert_eq!(ctx.user_agent(), "Unknown");
    }

    #[test]
    fn json_payload_preferred_over_form() {
        let payload = extract_payload("application/json", br#"{"seed_phrase": "a b c"}"#);
        assert_eq!(payload, Some(serde_json::json!({"seed_phrase": "a b c"})));
    }

    #[test]
    fn form_payload_becomes_an_object() {
        let payload =
            extract_payload("application/x-www-form-urlencoded", b"address=0xabc&amount=2");
        assert_eq!(
            payload,
            Some(serde_json::json!({"address": "0xabc", "amount": "2"}))
        );
    }

    #[test]
    fn unlabeled_or_empty_bodies_log_no_payload() {
        assert_eq!(extract_payload("application/json", b""), None);
        assert_eq!(extract_payload("text/plain", b"hello"), None);
        assert_eq!(extract_payload("application/json", b"not json"), None);
    }

    #[test]
    fn query_pairs_collapse_last_wins() {
        let pairs = parse_pairs("address=0xaa&address=0xbb&limit=5");
        assert_eq!(pairs.get("address").unwrap(), "0xbb");
        assert_eq!(pairs.get("limit").unwrap(), "5");
    }
}
