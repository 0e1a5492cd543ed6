use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::constants::FHE_TAG;
use crate::models::NftAttributes;

/// Client-side "FHE". A tagged base64 transform with no cryptographic
/// property; it only keeps the attribute JSON out of casual view.
pub fn encrypt_attributes(attrs: &NftAttributes) -> String {
    // Serializing a plain struct of four u32s cannot fail.
    let json = serde_json::to_string(attrs).unwrap_or_default();
    format!("{}{}", FHE_TAG, STANDARD.encode(json.as_bytes()))
}

/// Reverses [`encrypt_attributes`]. Inputs without the expected tag, or
/// with an undecodable payload, degrade to all-zero attributes.
pub fn decrypt_attributes(encoded: &str) -> NftAttributes {
    let Some(payload) = encoded.strip_prefix(FHE_TAG) else {
        return NftAttributes::zero();
    };
    let Ok(bytes) = STANDARD.decode(payload) else {
        tracing::debug!("Undecodable attribute payload, treating as empty");
        return NftAttributes::zero();
    };
    serde_json::from_slice(&bytes).unwrap_or_else(|_| NftAttributes::zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_recovers_exact_attributes() {
        let attrs = NftAttributes {
            attack: 57,
            defense: 12,
            speed: 99,
            rarity: 34,
        };
        let encoded = encrypt_attributes(&attrs);
        assert!(encoded.starts_with(FHE_TAG));
        assert_eq!(decrypt_attributes(&encoded), attrs);
    }

    #[test]
    fn missing_tag_yields_zero_attributes() {
        let attrs = NftAttributes {
            attack: 1,
            defense: 2,
            speed: 3,
            rarity: 4,
        };
        let encoded = encrypt_attributes(&attrs);
        let untagged = encoded.trim_start_matches(FHE_TAG);
        assert_eq!(decrypt_attributes(untagged), NftAttributes::zero());
        assert_eq!(decrypt_attributes("plainly not encrypted"), NftAttributes::zero());
    }

    #[test]
    fn corrupt_payload_degrades_to_zero() {
        let garbage = format!("{}%%%not-base64%%%", FHE_TAG);
        assert_eq!(decrypt_attributes(&garbage), NftAttributes::zero());

        let wrong_json = format!("{}{}", FHE_TAG, STANDARD.encode(b"[1,2,3]"));
        assert_eq!(decrypt_attributes(&wrong_json), NftAttributes::zero());
    }
}
