//! Content-addressed identity for offers.
//!
//! Only the fields that say *which* offer this is (subject, market, details)
//! go into the hash. Odds are excluded so a re-priced offer keeps its identity.

use sha2::{Digest, Sha256};

use crate::models::{Fingerprint, FingerprintAlgorithm, Item};

const UNIT_SEPARATOR: &[u8] = b"\x1f";

/// Computes offer fingerprints with a fixed algorithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct FingerprintGenerator {
    algorithm: FingerprintAlgorithm,
}

impl FingerprintGenerator {
    pub fn new(algorithm: FingerprintAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Fingerprint of raw identity fields.
    pub fn fingerprint(&self, subject: &str, market: &str, details: &str) -> Fingerprint {
        let hex = match self.algorithm {
            FingerprintAlgorithm::LegacyMd5 => {
                let input = format!("{subject}|{market}|{details}");
                format!("{:x}", md5::compute(input.as_bytes()))
            }
            FingerprintAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(subject.as_bytes());
                hasher.update(UNIT_SEPARATOR);
                hasher.update(market.as_bytes());
                hasher.update(UNIT_SEPARATOR);
                hasher.update(details.as_bytes());
                hex::encode(hasher.finalize())
            }
        };
        Fingerprint::from_hex(hex)
    }

    /// Fingerprint of an item's identity fields.
    pub fn of(&self, item: &Item) -> Fingerprint {
        self.fingerprint(&item.subject, &item.market, &item.details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(old_value: &str, new_value: &str) -> Item {
        Item {
            subject: "A vs B".to_string(),
            market: "Winner".to_string(),
            details: "Boost".to_string(),
            old_value: old_value.to_string(),
            new_value: new_value.to_string(),
            ..Item::default()
        }
    }

    #[test]
    fn test_legacy_md5_matches_known_digest() {
        let generator = FingerprintGenerator::default();
        let fp = generator.fingerprint("A vs B", "Winner", "Boost");
        assert_eq!(fp.as_str(), "41f1775b7d0ed2017c214a2e9e679be2");
    }

    #[test]
    fn test_sha256_matches_known_digest() {
        let generator = FingerprintGenerator::new(FingerprintAlgorithm::Sha256);
        let fp = generator.fingerprint("A vs B", "Winner", "Boost");
        assert_eq!(
            fp.as_str(),
            "dd7748792642f2cfa3b3b942402d0cf69dfd381b9e8d61477f2c3972b98be333"
        );
    }

    #[test]
    fn test_value_fields_do_not_affect_identity() {
        let generator = FingerprintGenerator::default();
        assert_eq!(
            generator.of(&item("1,50", "1,80")),
            generator.of(&item("1,60", "2,10"))
        );
    }

    #[test]
    fn test_identity_fields_do() {
        let generator = FingerprintGenerator::default();
        let a = generator.fingerprint("A vs B", "Winner", "Boost");
        let b = generator.fingerprint("A vs B", "Winner", "Boost 2");
        assert_ne!(a, b);
    }

    #[test]
    fn test_sha256_separator_is_unambiguous() {
        let generator = FingerprintGenerator::new(FingerprintAlgorithm::Sha256);
        let a = generator.fingerprint("A|B", "C", "D");
        let b = generator.fingerprint("A", "B|C", "D");
        assert_ne!(a, b);
    }

    #[test]
    fn test_stable_across_calls() {
        let generator = FingerprintGenerator::new(FingerprintAlgorithm::Sha256);
        let first = generator.of(&item("1", "2"));
        for _ in 0..3 {
            assert_eq!(generator.of(&item("1", "2")), first);
        }
    }
}
