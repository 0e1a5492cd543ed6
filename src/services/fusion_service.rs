use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;

use crate::constants::{
    ATTRIBUTE_MAX, ATTRIBUTE_MIN, FUSION_COST_ETH, RARITY_DAMPENER_DEN, RARITY_DAMPENER_NUM,
    STORAGE_KEY_INDEX, STORAGE_KEY_RECORD_PREFIX,
};
use crate::crypto::cipher;
use crate::db::Database;
use crate::error::Result;
use crate::models::{FusionRecord, NftAttributes, OutputNft};

/// Client-side fusion flow: generate attributes, fuse with jitter, encode,
/// persist through the generic storage surface.
pub struct FusionService {
    db: Database,
}

impl FusionService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Fuse two NFTs for `owner`. Writes the record under `fusion_{id}` and
    /// appends the id to the `fusion_keys` index list. The index update is
    /// read-modify-write over the storage surface: concurrent fusions can
    /// lose an index entry (last write wins), matching the surface's
    /// contract.
    pub async fn fuse(&self, owner: &str, input_a: &str, input_b: &str) -> Result<FusionRecord> {
        let parent_a = generate_attributes();
        let parent_b = generate_attributes();
        let fused = fuse_attributes(&parent_a, &parent_b);

        let id = new_record_id();
        let record = FusionRecord {
            id: id.clone(),
            input_nft_a: input_a.to_string(),
            input_nft_b: input_b.to_string(),
            output: OutputNft {
                name: format!("Fused #{}", id),
                image_url: format!("https://img.fusionlab.dev/nft/{}.png", id),
                encrypted_attributes: cipher::encrypt_attributes(&fused),
            },
            timestamp: Utc::now(),
            owner: owner.to_string(),
            cost: FUSION_COST_ETH.parse::<Decimal>().unwrap_or_default(),
        };

        let payload = serde_json::to_vec(&record)
            .map_err(|e| crate::error::AppError::Internal(format!("Record encode error: {}", e)))?;
        self.db
            .set_data(&format!("{}{}", STORAGE_KEY_RECORD_PREFIX, id), &payload)
            .await?;

        let mut index = self.load_index().await;
        index.push(id.clone());
        let index_payload = serde_json::to_vec(&index).map_err(|e| {
            crate::error::AppError::Internal(format!("Index encode error: {}", e))
        })?;
        self.db.set_data(STORAGE_KEY_INDEX, &index_payload).await?;

        tracing::info!("Fusion {} recorded for {}", record.id, owner);
        Ok(record)
    }

    /// Load every discoverable record. Storage and parse failures degrade
    /// to "no data".
    pub async fn load_records(&self) -> Result<Vec<FusionRecord>> {
        if !self.db.is_available().await {
            tracing::warn!("Storage unavailable, returning no records");
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for id in self.load_index().await {
            match self.get_record(&id).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => tracing::debug!("Indexed record {} missing", id),
                Err(e) => tracing::warn!("Failed to load record {}: {}", id, e),
            }
        }
        Ok(records)
    }

    pub async fn get_record(&self, id: &str) -> Result<Option<FusionRecord>> {
        let key = format!("{}{}", STORAGE_KEY_RECORD_PREFIX, id);
        let Some(bytes) = self.db.get_data(&key).await? else {
            return Ok(None);
        };
        match serde_json::from_slice(&bytes) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!("Unparseable record under {}: {}", key, e);
                Ok(None)
            }
        }
    }

    async fn load_index(&self) -> Vec<String> {
        match self.db.get_data(STORAGE_KEY_INDEX).await {
            Ok(Some(bytes)) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!("Unparseable fusion index: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read fusion index: {}", e);
                Vec::new()
            }
        }
    }
}

fn new_record_id() -> String {
    let suffix: [u8; 4] = rand::random();
    format!("{}_{}", Utc::now().timestamp_millis(), hex::encode(suffix))
}

/// Random attribute set for a parent NFT.
pub fn generate_attributes() -> NftAttributes {
    let mut rng = rand::rng();
    NftAttributes {
        attack: rng.random_range(ATTRIBUTE_MIN..=ATTRIBUTE_MAX),
        defense: rng.random_range(ATTRIBUTE_MIN..=ATTRIBUTE_MAX),
        speed: rng.random_range(ATTRIBUTE_MIN..=ATTRIBUTE_MAX),
        rarity: rng.random_range(ATTRIBUTE_MIN..=ATTRIBUTE_MAX),
    }
}

/// Non-deterministic fusion: per-attribute jitter around the mean, with a
/// dampener on rarity.
pub fn fuse_attributes(a: &NftAttributes, b: &NftAttributes) -> NftAttributes {
    let mut rng = rand::rng();
    let jitter = [
        rng.random_range(0.8..=1.2),
        rng.random_range(0.8..=1.2),
        rng.random_range(0.8..=1.2),
        rng.random_range(0.8..=1.2),
    ];
    fuse_with_jitter(a, b, jitter)
}

fn fuse_with_jitter(a: &NftAttributes, b: &NftAttributes, jitter: [f64; 4]) -> NftAttributes {
    let blend = |x: u32, y: u32, j: f64| ((x + y) as f64 / 2.0 * j) as u32;
    let rarity_base = blend(a.rarity, b.rarity, jitter[3]);
    NftAttributes {
        attack: blend(a.attack, b.attack, jitter[0]),
        defense: blend(a.defense, b.defense, jitter[1]),
        speed: blend(a.speed, b.speed, jitter[2]),
        rarity: rarity_base * RARITY_DAMPENER_NUM / RARITY_DAMPENER_DEN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_attributes_stay_in_range() {
        for _ in 0..50 {
            let attrs = generate_attributes();
            for value in [attrs.attack, attrs.defense, attrs.speed, attrs.rarity] {
                assert!((ATTRIBUTE_MIN..=ATTRIBUTE_MAX).contains(&value));
            }
        }
    }

    #[test]
    fn unit_jitter_is_the_truncated_mean() {
        let a = NftAttributes {
            attack: 10,
            defense: 21,
            speed: 30,
            rarity: 40,
        };
        let b = NftAttributes {
            attack: 20,
            defense: 30,
            speed: 41,
            rarity: 50,
        };
        let fused = fuse_with_jitter(&a, &b, [1.0; 4]);
        assert_eq!(fused.attack, 15);
        assert_eq!(fused.defense, 25);
        assert_eq!(fused.speed, 35);
        // rarity mean 45, dampened by 0.7
        assert_eq!(fused.rarity, 31);
    }

    #[test]
    fn fused_attributes_stay_within_jitter_envelope() {
        let a = NftAttributes {
            attack: 50,
            defense: 60,
            speed: 70,
            rarity: 80,
        };
        let b = a;
        for _ in 0..50 {
            let fused = fuse_attributes(&a, &b);
            assert!((40..=60).contains(&fused.attack));
            assert!((48..=72).contains(&fused.defense));
            assert!((56..=84).contains(&fused.speed));
            // 80 * [0.8, 1.2] * 0.7, truncating twice
            assert!((44..=67).contains(&fused.rarity));
        }
    }
}
