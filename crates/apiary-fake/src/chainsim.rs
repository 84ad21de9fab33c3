use apiary_core::{FakeTransaction, GasEstimate, TxStatus};
use chrono::{Duration, Utc};
use rand::Rng;
use serde_json::{json, Value};

use crate::generator::uniform_balance;

/// Stand-in for a real chain client. Every answer is fabricated; the only
/// genuine work is keeping the shapes plausible enough to survive casual
/// inspection by wallet tooling.
pub struct ChainSim;

impl ChainSim {
    /// Deliberately shallow: 0x plus 40 hex digits, casing unchecked.
    pub fn is_address(address: &str) -> bool {
        match address.strip_prefix("0x") {
            Some(body) => body.len() == 40 && body.chars().all(|c| c.is_ascii_hexdigit()),
            None => false,
        }
    }

    pub fn is_private_key(key: &str) -> bool {
        let body = key.strip_prefix("0x").unwrap_or(key);
        body.len() == 64 && body.chars().all(|c| c.is_ascii_hexdigit())
    }

    pub fn fake_balance(_address: &str) -> f64 {
        uniform_balance(0.1, 5.0)
    }

    /// A transfer that will sit in "pending" forever. No block number, no
    /// timestamp, nothing to look up on any real chain.
    pub fn fake_transaction(from_addr: &str, to_addr: &str, amount: f64) -> FakeTransaction {
        FakeTransaction {
            hash: random_tx_hash(),
            from_addr: from_addr.to_string(),
            to_addr: to_addr.to_string(),
            value: amount,
            status: "pending".to_string(),
            block_number: None,
            timestamp: None,
            is_fake: true,
        }
    }

    pub fn estimate_gas(_tx: &FakeTransaction) -> GasEstimate {
        GasEstimate {
            gas: 21_000,
            gas_price: 20_000_000_000,
            estimated_cost: "0.00042".to_string(),
        }
    }

    /// Never reports final success; a polled transaction stays pending.
    pub fn transaction_status(hash: &str) -> TxStatus {
        TxStatus {
            hash: hash.to_string(),
            status: "pending".to_string(),
            confirmations: 0,
            is_fake: true,
        }
    }

    /// 3 to 10 invented past transfers around the given address.
    pub fn fake_history(address: &str) -> Value {
        let mut rng = rand::thread_rng();
        let count = rng.gen_range(3..=10);
        let entries: Vec<Value> = (0..count)
            .map(|_| {
                let from_addr = if rng.gen_bool(0.5) {
                    address.to_string()
                } else {
                    random_plain_address(&mut rng)
                };
                let to_addr = if rng.gen_bool(0.5) {
                    random_plain_address(&mut rng)
                } else {
                    address.to_string()
                };
                let value =
                    (rng.gen_range(0.01..=1.0_f64) * 1_000_000.0).round() / 1_000_000.0;
                let age_days = rng.gen_range(1..=30);
                json!({
                    "hash": random_tx_hash(),
                    "from": from_addr,
                    "to": to_addr,
                    "value": value,
                    "timestamp": (Utc::now() - Duration::days(age_days)).to_rfc3339(),
                    "status": "success",
                })
            })
            .collect();
        Value::Array(entries)
    }
}

fn random_tx_hash() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    format!("0x{}", hex::encode(bytes))
}

fn random_plain_address(rng: &mut impl Rng) -> String {
    let bytes: [u8; 20] = rng.gen();
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shallow_address_validation() {
        assert!(ChainSim::is_address(
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        ));
        // casing is not verified, only shape
        assert!(ChainSim::is_address(&format!("0x{}", "ab".repeat(20))));
        assert!(!ChainSim::is_address("5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
        assert!(!ChainSim::is_address("0x1234"));
        assert!(!ChainSim::is_address(&format!("0x{}", "zz".repeat(20))));
    }

    #[test]
    fn private_key_validation_accepts_bare_hex() {
        assert!(ChainSim::is_private_key(&format!("0x{}", "ab".repeat(32))));
        assert!(ChainSim::is_private_key(&"ab".repeat(32)));
        assert!(!ChainSim::is_private_key("0x1234"));
        assert!(!ChainSim::is_private_key(&format!("0x{}", "zz".repeat(32))));
    }

    #[test]
    fn transfers_are_pending_and_unanchored() {
        let tx = ChainSim::fake_transaction("0xaa", "0xbb", 1.5);
        assert_eq!(tx.status, "pending");
        assert!(tx.block_number.is_none());
        assert!(tx.is_fake);
        assert_eq!(tx.hash.len(), 66);
    }

    #[test]
    fn status_never_reports_success() {
        for _ in 0..20 {
            let status = ChainSim::transaction_status("0xdeadbeef");
            assert_ne!(status.status, "success");
            assert_eq!(status.confirmations, 0);
        }
    }

    #[test]
    fn gas_estimate_is_fixed() {
        let tx = ChainSim::fake_transaction("0xaa", "0xbb", 0.2);
        let gas = ChainSim::estimate_gas(&tx);
        assert_eq!(gas.gas, 21_000);
        assert_eq!(gas.gas_price, 20_000_000_000);
        assert_eq!(gas.estimated_cost, "0.00042");
    }

    #[test]
    fn history_has_between_3_and_10_entries() {
        for _ in 0..10 {
            let history = ChainSim::fake_history("0xabc");
            let entries = history.as_array().unwrap();
            assert!((3..=10).contains(&entries.len()));
            for entry in entries {
                assert_eq!(entry["status"], "success");
                assert!(entry["hash"].as_str().unwrap().starts_with("0x"));
            }
        }
    }
}
