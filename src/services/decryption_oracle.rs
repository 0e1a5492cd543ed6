use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use sha3::{Digest, Keccak256};

use crate::db::Database;
use crate::error::AppError;
use crate::services::fhe_engine::FheEngine;
use crate::services::fusion_vault::{FusionCompleted, FusionVault};

/// Oracle proof over a decryption result: keccak256 of the shared signing
/// secret, the request id, and the plaintexts. The vault verifies by
/// recomputation.
pub fn decryption_proof(secret: &str, request_id: u64, values: &[u64; 3]) -> String {
    let mut hasher = Keccak256::new();
    hasher.update(secret.as_bytes());
    hasher.update(request_id.to_be_bytes());
    for value in values {
        hasher.update(value.to_be_bytes());
    }
    format!("0x{}", hex::encode(hasher.finalize()))
}

/// The off-ledger decryption service. It is the only component holding a
/// reference that can resolve ciphertext handles to plaintexts.
pub struct DecryptionOracle {
    engine: Arc<FheEngine>,
    vault: Arc<FusionVault>,
    signing_secret: String,
    /// Requests the vault rejected terminally. Batches are append-only, so
    /// a commitment that stopped matching can never match again; retrying
    /// such a request every tick would never terminate.
    abandoned: RwLock<HashSet<u64>>,
}

impl DecryptionOracle {
    pub fn new(engine: Arc<FheEngine>, vault: Arc<FusionVault>, signing_secret: String) -> Self {
        Self {
            engine,
            vault,
            signing_secret,
            abandoned: RwLock::new(HashSet::new()),
        }
    }

    /// Service every pending request once: decrypt, sign, call back.
    /// Requests whose callback rejects transiently stay pending and are
    /// retried on the next tick; replay and state-mismatch rejections are
    /// terminal.
    pub fn process_pending(&self) -> Vec<FusionCompleted> {
        let mut completed = Vec::new();
        for (request_id, ciphertexts) in self.vault.pending_requests() {
            if self.is_abandoned(request_id) {
                continue;
            }
            let values = match self.reveal_triple(&ciphertexts) {
                Ok(values) => values,
                Err(e) => {
                    tracing::error!("Oracle cannot decrypt request {}: {}", request_id, e);
                    continue;
                }
            };
            let proof = decryption_proof(&self.signing_secret, request_id, &values);
            match self.vault.fulfill_fusion(request_id, values, &proof) {
                Ok(event) => {
                    tracing::info!(
                        "Oracle fulfilled request {} -> token {}",
                        request_id,
                        event.token_id
                    );
                    completed.push(event);
                }
                Err(AppError::ReplayAttempt) => {
                    tracing::debug!("Request {} already processed", request_id);
                }
                Err(AppError::StateMismatch) => {
                    tracing::warn!("Request {} abandoned: batch state changed", request_id);
                    self.abandon(request_id);
                }
                Err(e) => {
                    tracing::warn!("Callback for request {} rejected: {}", request_id, e);
                }
            }
        }
        completed
    }

    fn is_abandoned(&self, request_id: u64) -> bool {
        self.abandoned
            .read()
            .expect("abandoned set poisoned")
            .contains(&request_id)
    }

    fn abandon(&self, request_id: u64) {
        self.abandoned
            .write()
            .expect("abandoned set poisoned")
            .insert(request_id);
    }

    /// Background worker in the executor-loop style: poll, fulfill, notify.
    pub async fn start_worker(self: Arc<Self>, db: Database) {
        tokio::spawn(async move {
            loop {
                for event in self.process_pending() {
                    self.notify_batch_owners(&db, &event).await;
                }
                tokio::time::sleep(tokio::time::Duration::from_secs(
                    crate::constants::ORACLE_WORKER_INTERVAL_SECS,
                ))
                .await;
            }
        });
    }

    async fn notify_batch_owners(&self, db: &Database, event: &FusionCompleted) {
        let Ok(batch) = self.vault.get_batch(event.batch_id) else {
            return;
        };
        let mut owners = batch.owners;
        owners.sort();
        owners.dedup();
        for owner in owners {
            let result = db
                .create_notification(
                    &owner,
                    "fusion.completed",
                    "Fusion completed",
                    &format!(
                        "Batch {} fused into token {} ({}/{}/{})",
                        event.batch_id, event.token_id, event.attack, event.defense, event.speed
                    ),
                    Some(serde_json::json!({
                        "request_id": event.request_id,
                        "token_id": event.token_id,
                    })),
                )
                .await;
            if let Err(e) = result {
                tracing::warn!("Failed to notify {}: {}", owner, e);
            }
        }
    }

    fn reveal_triple(&self, ciphertexts: &[String; 3]) -> crate::error::Result<[u64; 3]> {
        Ok([
            self.engine.reveal(&ciphertexts[0])?,
            self.engine.reveal(&ciphertexts[1])?,
            self.engine.reveal(&ciphertexts[2])?,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: &str = "0xowner";

    fn setup() -> (Arc<FheEngine>, Arc<FusionVault>, DecryptionOracle) {
        let engine = Arc::new(FheEngine::new());
        let vault = Arc::new(FusionVault::new(
            engine.clone(),
            "0xvault",
            OWNER,
            "oracle-secret",
            0,
            0,
        ));
        let oracle = DecryptionOracle::new(engine.clone(), vault.clone(), "oracle-secret".into());
        (engine, vault, oracle)
    }

    #[test]
    fn proof_depends_on_every_input() {
        let base = decryption_proof("s", 1, &[1, 2, 3]);
        assert_ne!(base, decryption_proof("t", 1, &[1, 2, 3]));
        assert_ne!(base, decryption_proof("s", 2, &[1, 2, 3]));
        assert_ne!(base, decryption_proof("s", 1, &[1, 2, 4]));
    }

    #[test]
    fn worker_pass_fulfills_pending_requests() {
        let (engine, vault, oracle) = setup();
        vault.add_provider(OWNER, "0xp1").unwrap();
        vault.add_provider(OWNER, "0xp2").unwrap();
        let batch_id = vault.open_batch(OWNER).unwrap();
        vault
            .submit_nft(
                "0xp1",
                batch_id,
                [engine.encrypt(10), engine.encrypt(20), engine.encrypt(30)],
            )
            .unwrap();
        vault
            .submit_nft(
                "0xp2",
                batch_id,
                [engine.encrypt(30), engine.encrypt(40), engine.encrypt(50)],
            )
            .unwrap();
        let request = vault.request_fusion("0xp1", batch_id).unwrap();

        let events = oracle.process_pending();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].request_id, request.request_id);
        assert_eq!(
            (events[0].attack, events[0].defense, events[0].speed),
            (20, 30, 40)
        );

        // Second pass finds nothing to do
        assert!(oracle.process_pending().is_empty());
        assert!(vault.get_request(request.request_id).unwrap().processed);
    }

    #[test]
    fn state_mismatch_is_terminal_for_the_worker() {
        let (engine, vault, oracle) = setup();
        vault.add_provider(OWNER, "0xp1").unwrap();
        vault.add_provider(OWNER, "0xp2").unwrap();
        let batch_id = vault.open_batch(OWNER).unwrap();
        vault
            .submit_nft(
                "0xp1",
                batch_id,
                [engine.encrypt(10), engine.encrypt(20), engine.encrypt(30)],
            )
            .unwrap();
        vault
            .submit_nft(
                "0xp2",
                batch_id,
                [engine.encrypt(30), engine.encrypt(40), engine.encrypt(50)],
            )
            .unwrap();
        let request = vault.request_fusion("0xp1", batch_id).unwrap();

        // Batch grows between the request and the worker tick, so the
        // recomputed commitment can never match again
        vault
            .submit_nft(
                "0xp2",
                batch_id,
                [engine.encrypt(50), engine.encrypt(60), engine.encrypt(70)],
            )
            .unwrap();

        assert!(oracle.process_pending().is_empty());
        assert!(oracle.is_abandoned(request.request_id));

        // The vault still lists the request as pending, but the worker
        // skips it on later ticks instead of retrying it forever
        assert_eq!(vault.pending_requests().len(), 1);
        assert!(oracle.process_pending().is_empty());
        assert!(!vault.get_request(request.request_id).unwrap().processed);
    }
}
