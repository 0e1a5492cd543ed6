use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==================== ATTRIBUTES ====================

/// Plaintext NFT attributes. Ephemeral on the client side: generated per
/// fusion, never persisted in the clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NftAttributes {
    pub attack: u32,
    pub defense: u32,
    pub speed: u32,
    pub rarity: u32,
}

impl NftAttributes {
    pub fn zero() -> Self {
        Self::default()
    }
}

// ==================== FUSION RECORD ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputNft {
    pub name: String,
    pub image_url: String,
    /// Tagged base64 blob produced by the client cipher.
    pub encrypted_attributes: String,
}

/// One fusion, persisted as JSON under `fusion_{id}` and immutable
/// thereafter. Ids are discoverable via the `fusion_keys` index list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionRecord {
    pub id: String,
    pub input_nft_a: String,
    pub input_nft_b: String,
    pub output: OutputNft,
    pub timestamp: DateTime<Utc>,
    pub owner: String,
    pub cost: Decimal,
}

// ==================== FUSION API ====================

#[derive(Debug, Deserialize)]
pub struct FuseRequest {
    pub input_nft_a: String,
    pub input_nft_b: String,
}

#[derive(Debug, Serialize)]
pub struct FuseResponse {
    pub record: FusionRecord,
}

#[derive(Debug, Serialize)]
pub struct DecryptPrepareResponse {
    pub nonce: String,
    pub message: String,
    pub expires_in: u64,
}

#[derive(Debug, Deserialize)]
pub struct DecryptRequest {
    pub record_id: String,
    pub nonce: String,
    pub signature: String,
}

#[derive(Debug, Serialize)]
pub struct DecryptResponse {
    pub record_id: String,
    pub attributes: NftAttributes,
}

// ==================== VAULT API ====================

#[derive(Debug, Deserialize)]
pub struct SubmitNftRequest {
    pub batch_id: u64,
    /// Encrypted (attack, defense, speed) handles.
    pub ciphertexts: [String; 3],
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub batch_id: u64,
}

#[derive(Debug, Deserialize)]
pub struct ProviderRequest {
    pub provider: String,
}

#[derive(Debug, Serialize)]
pub struct RequestFusionResponse {
    pub request_id: u64,
    pub batch_id: u64,
    pub commitment: String,
}
