use sha3::{Digest, Keccak256};

/// Keccak256 digest of raw bytes.
pub fn keccak256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Keccak256 digest as a 0x-prefixed hex string.
pub fn keccak256_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(keccak256(data)))
}

/// Commitment over a ciphertext set and the vault address. Recomputed in the
/// oracle callback to detect batch mutation between request and fulfillment.
pub fn commitment_hash(ciphertexts: &[String], vault_address: &str) -> String {
    let mut hasher = Keccak256::new();
    for ct in ciphertexts {
        hasher.update(ct.as_bytes());
    }
    hasher.update(vault_address.as_bytes());
    format!("0x{}", hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak256_hex_matches_empty_string_vector() {
        let digest = keccak256_hex(b"");
        assert_eq!(
            digest,
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
        assert_eq!(digest.len(), 66);
    }

    #[test]
    fn commitment_changes_with_ciphertext_set() {
        let a = commitment_hash(&["0x01".to_string(), "0x02".to_string()], "0xvault");
        let b = commitment_hash(&["0x01".to_string(), "0x03".to_string()], "0xvault");
        let c = commitment_hash(&["0x01".to_string(), "0x02".to_string()], "0xother");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn commitment_is_order_sensitive() {
        let a = commitment_hash(&["0x01".to_string(), "0x02".to_string()], "0xvault");
        let b = commitment_hash(&["0x02".to_string(), "0x01".to_string()], "0xvault");
        assert_ne!(a, b);
    }
}
