use apiary_core::FakeWallet;
use chrono::Utc;
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use sha3::{Digest, Keccak256};

use crate::wordlist::SEED_WORDS;

/// Produces wallet material that passes superficial format checks but has
/// no cryptographic relationship between its parts: the private key, the
/// address, and the seed phrase are all independent random draws.
pub struct WalletForge {
    balance_min: f64,
    balance_max: f64,
}

impl Default for WalletForge {
    fn default() -> Self {
        Self::new(0.1, 5.0)
    }
}

impl WalletForge {
    pub fn new(balance_min: f64, balance_max: f64) -> Self {
        Self {
            balance_min,
            balance_max,
        }
    }

    /// 32 bytes from the OS entropy source, 0x-prefixed. This value is
    /// shown to attackers, so it must not leak a seedable PRNG state.
    pub fn private_key(&self) -> String {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        format!("0x{}", hex::encode(bytes))
    }

    /// 20 random bytes rendered in the mixed-case checksum form, so
    /// client-side address validators accept it.
    pub fn address(&self) -> String {
        let mut bytes = [0u8; 20];
        OsRng.fill_bytes(&mut bytes);
        to_checksum_address(&bytes)
    }

    /// Words drawn with replacement. Counts other than 12 or 24 fall back
    /// to 12 rather than erroring.
    pub fn seed_phrase(&self, word_count: usize) -> String {
        let count = if word_count == 12 || word_count == 24 {
            word_count
        } else {
            12
        };
        let mut rng = rand::thread_rng();
        let words: Vec<&str> = (0..count)
            .map(|_| *SEED_WORDS.choose(&mut rng).unwrap_or(&SEED_WORDS[0]))
            .collect();
        words.join(" ")
    }

    pub fn wallet(&self, include_seed: bool) -> FakeWallet {
        FakeWallet {
            address: self.address(),
            private_key: self.private_key(),
            seed_phrase: include_seed.then(|| self.seed_phrase(12)),
            balance: uniform_balance(self.balance_min, self.balance_max),
            currency: "ETH".to_string(),
            is_fake: true,
            created_at: Utc::now(),
        }
    }

    pub fn wallets(&self, count: usize) -> Vec<FakeWallet> {
        (0..count).map(|_| self.wallet(true)).collect()
    }
}

/// Uniform sample in `[min, max]`, rounded to 6 decimal places.
pub fn uniform_balance(min: f64, max: f64) -> f64 {
    let raw = rand::thread_rng().gen_range(min..=max);
    (raw * 1_000_000.0).round() / 1_000_000.0
}

/// Mixed-case checksum rendering of a 20-byte account id: a hex letter is
/// uppercased when the matching nibble of Keccak-256(lowercase hex) is >= 8.
pub fn to_checksum_address(bytes: &[u8; 20]) -> String {
    let lower = hex::encode(bytes);
    let mut hasher = Keccak256::new();
    hasher.update(lower.as_bytes());
    let hash = hasher.finalize();

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, ch) in lower.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            hash[i / 2] >> 4
        } else {
            hash[i / 2] & 0x0f
        };
        if ch.is_ascii_alphabetic() && nibble >= 8 {
            out.push(ch.to_ascii_uppercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_key_is_66_hex_chars() {
        let forge = WalletForge::default();
        let key = forge.private_key();
        assert!(key.starts_with("0x"));
        assert_eq!(key.len(), 66);
        assert!(key[2..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn address_is_42_chars_with_valid_checksum() {
        let forge = WalletForge::default();
        let address = forge.address();
        assert!(address.starts_with("0x"));
        assert_eq!(address.len(), 42);

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(address[2..].to_lowercase(), &mut bytes).unwrap();
        assert_eq!(to_checksum_address(&bytes), address);
    }

    #[test]
    fn checksum_matches_known_vector() {
        let mut bytes = [0u8; 20];
        hex::decode_to_slice("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed", &mut bytes).unwrap();
        assert_eq!(
            to_checksum_address(&bytes),
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
    }

    #[test]
    fn seed_phrase_word_counts() {
        let forge = WalletForge::default();
        assert_eq!(forge.seed_phrase(12).split_whitespace().count(), 12);
        assert_eq!(forge.seed_phrase(24).split_whitespace().count(), 24);
        // anything else falls back to 12
        assert_eq!(forge.seed_phrase(13).split_whitespace().count(), 12);
        assert_eq!(forge.seed_phrase(0).split_whitespace().count(), 12);
    }

    #[test]
    fn seed_phrase_uses_fixed_wordlist() {
        let forge = WalletForge::default();
        for word in forge.seed_phrase(24).split_whitespace() {
            assert!(crate::wordlist::SEED_WORDS.contains(&word));
        }
    }

    #[test]
    fn balance_stays_in_range_at_6_decimals() {
        for _ in 0..100 {
            let balance = uniform_balance(0.1, 5.0);
            assert!((0.1..=5.0).contains(&balance));
            let scaled = balance * 1_000_000.0;
            assert!((scaled - scaled.round()).abs() < 1e-6);
        }
    }

    #[test]
    fn wallet_composition() {
        let forge = WalletForge::default();
        let wallet = forge.wallet(true);
        assert_eq!(wallet.currency, "ETH");
        assert!(wallet.is_fake);
        assert!(wallet.seed_phrase.is_some());
        assert!((0.1..=5.0).contains(&wallet.balance));

        let bare = forge.wallet(false);
        assert!(bare.seed_phrase.is_none());
    }

    #[test]
    fn bulk_wallets_are_distinct() {
        let forge = WalletForge::default();
        let wallets = forge.wallets(5);
        assert_eq!(wallets.len(), 5);
        let mut addresses: Vec<&str> = wallets.iter().map(|w| w.address.as_str()).collect();
        addresses.sort();
        addresses.dedup();
        assert_eq!(addresses.len(), 5);
    }
}
