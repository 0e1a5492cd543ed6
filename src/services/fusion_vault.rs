use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::crypto::hash::commitment_hash;
use crate::error::{AppError, Result};
use crate::services::decryption_oracle::decryption_proof;
use crate::services::fhe_engine::{FheEngine, Handle};

/// One submitted NFT: the submitting provider and its encrypted
/// (attack, defense, speed) triple.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub owner: String,
    pub ciphertexts: [Handle; 3],
}

/// Owner-opened collection of submitted encrypted attribute triples.
/// Append-only while open.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub open: bool,
    pub entries: Vec<BatchEntry>,
}

/// Links an oracle request id to the batch and the ciphertext commitment
/// taken at request time. Flips to processed exactly once.
#[derive(Debug, Clone)]
pub struct DecryptionContext {
    pub batch_id: u64,
    pub commitment: String,
    pub ciphertexts: [Handle; 3],
    pub processed: bool,
}

/// Payload of the terminal event for a fusion request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FusionCompleted {
    pub request_id: u64,
    pub batch_id: u64,
    pub token_id: u64,
    pub attack: u64,
    pub defense: u64,
    pub speed: u64,
}

#[derive(Debug, Serialize)]
pub struct BatchView {
    pub batch_id: u64,
    pub open: bool,
    pub count: usize,
    pub owners: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RequestView {
    pub request_id: u64,
    pub batch_id: u64,
    pub commitment: String,
    pub processed: bool,
}

#[derive(Debug, Serialize)]
pub struct VaultStatus {
    pub paused: bool,
    pub providers: Vec<String>,
    pub batches: usize,
    pub requests: usize,
    pub pending_requests: usize,
    pub last_token_id: u64,
}

#[derive(Default)]
struct VaultState {
    paused: bool,
    providers: HashSet<String>,
    batches: BTreeMap<u64, Batch>,
    next_batch_id: u64,
    requests: BTreeMap<u64, DecryptionContext>,
    next_request_id: u64,
    last_token_id: u64,
    last_submission: HashMap<String, DateTime<Utc>>,
    last_fusion: HashMap<String, DateTime<Utc>>,
}

/// The batch/oracle fusion ledger.
///
/// Every operation takes the single state lock for its whole duration, so
/// calls are single-threaded by construction: a call either rejects before
/// touching state or commits entirely. The only asynchrony in the design is
/// the gap between [`FusionVault::request_fusion`] and
/// [`FusionVault::fulfill_fusion`], which the commitment recheck covers.
pub struct FusionVault {
    engine: Arc<FheEngine>,
    address: String,
    owner: String,
    proof_key: String,
    submission_cooldown_secs: i64,
    fusion_cooldown_secs: i64,
    state: RwLock<VaultState>,
}

impl FusionVault {
    pub fn new(
        engine: Arc<FheEngine>,
        address: impl Into<String>,
        owner: impl Into<String>,
        proof_key: impl Into<String>,
        submission_cooldown_secs: i64,
        fusion_cooldown_secs: i64,
    ) -> Self {
        Self {
            engine,
            address: address.into(),
            owner: owner.into(),
            proof_key: proof_key.into(),
            submission_cooldown_secs,
            fusion_cooldown_secs,
            state: RwLock::new(VaultState::default()),
        }
    }

    // ==================== OWNER OPS ====================

    pub fn open_batch(&self, caller: &str) -> Result<u64> {
        self.require_owner(caller)?;
        let mut state = self.write_state();
        state.next_batch_id += 1;
        let batch_id = state.next_batch_id;
        state.batches.insert(
            batch_id,
            Batch {
                open: true,
                entries: Vec::new(),
            },
        );
        tracing::info!("Batch {} opened", batch_id);
        Ok(batch_id)
    }

    pub fn close_batch(&self, caller: &str, batch_id: u64) -> Result<()> {
        self.require_owner(caller)?;
        let mut state = self.write_state();
        let batch = state
            .batches
            .get_mut(&batch_id)
            .ok_or(AppError::InvalidBatch)?;
        if !batch.open {
            return Err(AppError::BatchClosed);
        }
        batch.open = false;
        tracing::info!("Batch {} closed with {} entries", batch_id, batch.entries.len());
        Ok(())
    }

    pub fn add_provider(&self, caller: &str, provider: &str) -> Result<()> {
        self.require_owner(caller)?;
        self.write_state().providers.insert(provider.to_string());
        tracing::info!("Provider {} registered", provider);
        Ok(())
    }

    pub fn remove_provider(&self, caller: &str, provider: &str) -> Result<()> {
        self.require_owner(caller)?;
        self.write_state().providers.remove(provider);
        tracing::info!("Provider {} removed", provider);
        Ok(())
    }

    pub fn pause(&self, caller: &str) -> Result<()> {
        self.require_owner(caller)?;
        self.write_state().paused = true;
        tracing::warn!("Vault paused");
        Ok(())
    }

    pub fn unpause(&self, caller: &str) -> Result<()> {
        self.require_owner(caller)?;
        self.write_state().paused = false;
        tracing::info!("Vault unpaused");
        Ok(())
    }

    // ==================== PROVIDER OPS ====================

    /// Append an encrypted attribute triple to an open batch.
    pub fn submit_nft(
        &self,
        caller: &str,
        batch_id: u64,
        ciphertexts: [Handle; 3],
    ) -> Result<usize> {
        let mut state = self.write_state();
        if state.paused {
            return Err(AppError::Paused);
        }
        if !state.providers.contains(caller) {
            return Err(AppError::NotProvider);
        }
        let now = Utc::now();
        check_cooldown(
            state.last_submission.get(caller),
            now,
            self.submission_cooldown_secs,
        )?;
        for ct in &ciphertexts {
            if !FheEngine::is_handle(ct) || !self.engine.knows(ct) {
                return Err(AppError::InvalidNFT);
            }
        }
        let batch = state
            .batches
            .get_mut(&batch_id)
            .ok_or(AppError::InvalidBatch)?;
        if !batch.open {
            return Err(AppError::BatchClosed);
        }

        batch.entries.push(BatchEntry {
            owner: caller.to_string(),
            ciphertexts,
        });
        let index = batch.entries.len() - 1;
        state.last_submission.insert(caller.to_string(), now);
        tracing::info!("Batch {} entry {} submitted by {}", batch_id, index, caller);
        Ok(index)
    }

    /// Average the batch homomorphically, commit to the result ciphertexts,
    /// and park a decryption context for the oracle. Open and closed batches
    /// are both eligible.
    pub fn request_fusion(&self, caller: &str, batch_id: u64) -> Result<RequestView> {
        let mut state = self.write_state();
        if state.paused {
            return Err(AppError::Paused);
        }
        if !state.providers.contains(caller) {
            return Err(AppError::NotProvider);
        }
        let now = Utc::now();
        check_cooldown(state.last_fusion.get(caller), now, self.fusion_cooldown_secs)?;
        let batch = state.batches.get(&batch_id).ok_or(AppError::InvalidBatch)?;
        if batch.entries.len() < crate::constants::MIN_BATCH_ENTRIES {
            return Err(AppError::NotEnoughNFTs);
        }

        let ciphertexts = self.average_batch(batch)?;
        let commitment = commitment_hash(&ciphertexts, &self.address);

        state.next_request_id += 1;
        let request_id = state.next_request_id;
        state.requests.insert(
            request_id,
            DecryptionContext {
                batch_id,
                commitment: commitment.clone(),
                ciphertexts,
                processed: false,
            },
        );
        state.last_fusion.insert(caller.to_string(), now);
        tracing::info!(
            "Fusion request {} for batch {} committed as {}",
            request_id,
            batch_id,
            commitment
        );

        Ok(RequestView {
            request_id,
            batch_id,
            commitment,
            processed: false,
        })
    }

    // ==================== ORACLE CALLBACK ====================

    /// The decryption oracle's callback. State integrity is checked before
    /// the proof, so a corrupted batch rejects regardless of proof validity.
    pub fn fulfill_fusion(
        &self,
        request_id: u64,
        plaintexts: [u64; 3],
        proof: &str,
    ) -> Result<FusionCompleted> {
        let mut state = self.write_state();
        let context = state
            .requests
            .get(&request_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Decryption request {}", request_id)))?;

        if context.processed {
            return Err(AppError::ReplayAttempt);
        }

        // Recompute the average and the commitment from current batch state.
        // A batch mutated (or dropped) between request and fulfillment no
        // longer hashes to the stored commitment.
        let recomputed = match state.batches.get(&context.batch_id) {
            Some(batch) if batch.entries.len() >= crate::constants::MIN_BATCH_ENTRIES => {
                self.average_batch(batch)?
            }
            _ => return Err(AppError::StateMismatch),
        };
        if commitment_hash(&recomputed, &self.address) != context.commitment {
            return Err(AppError::StateMismatch);
        }

        let expected = decryption_proof(&self.proof_key, request_id, &plaintexts);
        if proof != expected {
            return Err(AppError::InvalidProof);
        }

        state.last_token_id += 1;
        let token_id = state.last_token_id;
        let context = state
            .requests
            .get_mut(&request_id)
            .ok_or_else(|| AppError::NotFound(format!("Decryption request {}", request_id)))?;
        context.processed = true;
        let batch_id = context.batch_id;

        let event = FusionCompleted {
            request_id,
            batch_id,
            token_id,
            attack: plaintexts[0],
            defense: plaintexts[1],
            speed: plaintexts[2],
        };
        tracing::info!(
            "FusionCompleted request={} batch={} token={} attrs=({},{},{})",
            request_id,
            batch_id,
            token_id,
            event.attack,
            event.defense,
            event.speed
        );
        Ok(event)
    }

    // ==================== READS ====================

    pub fn get_batch(&self, batch_id: u64) -> Result<BatchView> {
        let state = self.read_state();
        let batch = state.batches.get(&batch_id).ok_or(AppError::InvalidBatch)?;
        Ok(BatchView {
            batch_id,
            open: batch.open,
            count: batch.entries.len(),
            owners: batch.entries.iter().map(|e| e.owner.clone()).collect(),
        })
    }

    pub fn get_request(&self, request_id: u64) -> Result<RequestView> {
        let state = self.read_state();
        let context = state
            .requests
            .get(&request_id)
            .ok_or_else(|| AppError::NotFound(format!("Decryption request {}", request_id)))?;
        Ok(RequestView {
            request_id,
            batch_id: context.batch_id,
            commitment: context.commitment.clone(),
            processed: context.processed,
        })
    }

    pub fn status(&self) -> VaultStatus {
        let state = self.read_state();
        let pending = state.requests.values().filter(|c| !c.processed).count();
        let mut providers: Vec<String> = state.providers.iter().cloned().collect();
        providers.sort();
        VaultStatus {
            paused: state.paused,
            providers,
            batches: state.batches.len(),
            requests: state.requests.len(),
            pending_requests: pending,
            last_token_id: state.last_token_id,
        }
    }

    /// Unprocessed requests with their ciphertext triples, for the oracle
    /// worker.
    pub fn pending_requests(&self) -> Vec<(u64, [Handle; 3])> {
        self.read_state()
            .requests
            .iter()
            .filter(|(_, c)| !c.processed)
            .map(|(id, c)| (*id, c.ciphertexts.clone()))
            .collect()
    }

    // ==================== INTERNAL ====================

    fn require_owner(&self, caller: &str) -> Result<()> {
        if caller != self.owner {
            return Err(AppError::NotOwner);
        }
        Ok(())
    }

    /// Elementwise homomorphic average of the three attributes across all
    /// batch entries. Integer division, truncating.
    fn average_batch(&self, batch: &Batch) -> Result<[Handle; 3]> {
        let count = batch.entries.len() as u64;
        let mut averaged: Vec<Handle> = Vec::with_capacity(3);
        for attr in 0..3 {
            let mut acc = batch.entries[0].ciphertexts[attr].clone();
            for entry in &batch.entries[1..] {
                acc = self.engine.add(&acc, &entry.ciphertexts[attr])?;
            }
            averaged.push(self.engine.div_plain(&acc, count)?);
        }
        averaged
            .try_into()
            .map_err(|_| AppError::Internal("Averaging produced a malformed triple".into()))
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, VaultState> {
        self.state.read().expect("vault state poisoned")
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, VaultState> {
        self.state.write().expect("vault state poisoned")
    }
}

fn check_cooldown(
    last: Option<&DateTime<Utc>>,
    now: DateTime<Utc>,
    cooldown_secs: i64,
) -> Result<()> {
    if cooldown_secs <= 0 {
        return Ok(());
    }
    if let Some(last) = last {
        let elapsed = (now - *last).num_seconds();
        if elapsed < cooldown_secs {
            return Err(AppError::CooldownActive(cooldown_secs - elapsed));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: &str = "0xowner";
    const PROV_A: &str = "0xprov_a";
    const PROV_B: &str = "0xprov_b";

    fn vault() -> (Arc<FheEngine>, FusionVault) {
        let engine = Arc::new(FheEngine::new());
        let vault = FusionVault::new(engine.clone(), "0xvault", OWNER, "proof-key", 0, 0);
        vault.add_provider(OWNER, PROV_A).unwrap();
        vault.add_provider(OWNER, PROV_B).unwrap();
        (engine, vault)
    }

    fn triple(engine: &FheEngine, attack: u64, defense: u64, speed: u64) -> [Handle; 3] {
        [
            engine.encrypt(attack),
            engine.encrypt(defense),
            engine.encrypt(speed),
        ]
    }

    fn decrypt_request(
        engine: &FheEngine,
        vault: &FusionVault,
        request_id: u64,
    ) -> ([u64; 3], String) {
        let pending = vault.pending_requests();
        let (_, cts) = pending
            .iter()
            .find(|(id, _)| *id == request_id)
            .expect("request pending");
        let values = [
            engine.reveal(&cts[0]).unwrap(),
            engine.reveal(&cts[1]).unwrap(),
            engine.reveal(&cts[2]).unwrap(),
        ];
        let proof = decryption_proof("proof-key", request_id, &values);
        (values, proof)
    }

    #[test]
    fn only_owner_manages_batches_and_providers() {
        let (_, vault) = vault();
        assert!(matches!(vault.open_batch(PROV_A), Err(AppError::NotOwner)));
        let batch_id = vault.open_batch(OWNER).unwrap();
        assert!(matches!(
            vault.close_batch(PROV_A, batch_id),
            Err(AppError::NotOwner)
        ));
        assert!(matches!(
            vault.add_provider(PROV_A, "0xnew"),
            Err(AppError::NotOwner)
        ));
        vault.close_batch(OWNER, batch_id).unwrap();
        assert!(matches!(
            vault.close_batch(OWNER, batch_id),
            Err(AppError::BatchClosed)
        ));
    }

    #[test]
    fn submission_guards_fire_in_order() {
        let (engine, vault) = vault();
        let batch_id = vault.open_batch(OWNER).unwrap();
        let cts = triple(&engine, 10, 20, 30);

        assert!(matches!(
            vault.submit_nft("0xstranger", batch_id, cts.clone()),
            Err(AppError::NotProvider)
        ));
        assert!(matches!(
            vault.submit_nft(PROV_A, 999, cts.clone()),
            Err(AppError::InvalidBatch)
        ));

        let bogus = [
            format!("0x{}", "0".repeat(64)),
            format!("0x{}", "1".repeat(64)),
            format!("0x{}", "2".repeat(64)),
        ];
        assert!(matches!(
            vault.submit_nft(PROV_A, batch_id, bogus),
            Err(AppError::InvalidNFT)
        ));

        assert_eq!(vault.submit_nft(PROV_A, batch_id, cts).unwrap(), 0);

        vault.close_batch(OWNER, batch_id).unwrap();
        let more = triple(&engine, 1, 2, 3);
        assert!(matches!(
            vault.submit_nft(PROV_B, batch_id, more),
            Err(AppError::BatchClosed)
        ));
    }

    #[test]
    fn paused_vault_rejects_submissions_and_requests() {
        let (engine, vault) = vault();
        let batch_id = vault.open_batch(OWNER).unwrap();
        vault.pause(OWNER).unwrap();

        let cts = triple(&engine, 10, 20, 30);
        assert!(matches!(
            vault.submit_nft(PROV_A, batch_id, cts),
            Err(AppError::Paused)
        ));
        assert!(matches!(
            vault.request_fusion(PROV_A, batch_id),
            Err(AppError::Paused)
        ));

        vault.unpause(OWNER).unwrap();
        let cts = triple(&engine, 10, 20, 30);
        assert!(vault.submit_nft(PROV_A, batch_id, cts).is_ok());
    }

    #[test]
    fn submission_cooldown_applies_per_caller() {
        let engine = Arc::new(FheEngine::new());
        let vault = FusionVault::new(engine.clone(), "0xvault", OWNER, "proof-key", 3600, 0);
        vault.add_provider(OWNER, PROV_A).unwrap();
        vault.add_provider(OWNER, PROV_B).unwrap();
        let batch_id = vault.open_batch(OWNER).unwrap();

        let cts = triple(&engine, 1, 2, 3);
        vault.submit_nft(PROV_A, batch_id, cts).unwrap();

        let cts = triple(&engine, 4, 5, 6);
        assert!(matches!(
            vault.submit_nft(PROV_A, batch_id, cts),
            Err(AppError::CooldownActive(_))
        ));

        // Independent clock for a different caller
        let cts = triple(&engine, 4, 5, 6);
        assert!(vault.submit_nft(PROV_B, batch_id, cts).is_ok());
    }

    #[test]
    fn fusion_cooldown_is_per_caller_and_separate_from_submissions() {
        let engine = Arc::new(FheEngine::new());
        let vault = FusionVault::new(engine.clone(), "0xvault", OWNER, "proof-key", 0, 3600);
        vault.add_provider(OWNER, PROV_A).unwrap();
        vault.add_provider(OWNER, PROV_B).unwrap();
        let batch_id = vault.open_batch(OWNER).unwrap();
        vault
            .submit_nft(PROV_A, batch_id, triple(&engine, 10, 20, 30))
            .unwrap();
        vault
            .submit_nft(PROV_B, batch_id, triple(&engine, 20, 30, 40))
            .unwrap();

        vault.request_fusion(PROV_A, batch_id).unwrap();
        assert!(matches!(
            vault.request_fusion(PROV_A, batch_id),
            Err(AppError::CooldownActive(_))
        ));

        // The fusion clock does not gate submissions by the same caller
        vault
            .submit_nft(PROV_A, batch_id, triple(&engine, 30, 40, 50))
            .unwrap();

        // Nor does it gate fusion requests by a different caller
        assert!(vault.request_fusion(PROV_B, batch_id).is_ok());
    }

    #[test]
    fn fusion_requires_two_entries() {
        let (engine, vault) = vault();
        let batch_id = vault.open_batch(OWNER).unwrap();

        assert!(matches!(
            vault.request_fusion(PROV_A, batch_id),
            Err(AppError::NotEnoughNFTs)
        ));
        assert!(matches!(
            vault.request_fusion(PROV_A, 999),
            Err(AppError::InvalidBatch)
        ));

        let cts = triple(&engine, 10, 20, 30);
        vault.submit_nft(PROV_A, batch_id, cts).unwrap();
        assert!(matches!(
            vault.request_fusion(PROV_A, batch_id),
            Err(AppError::NotEnoughNFTs)
        ));

        let cts = triple(&engine, 40, 50, 60);
        vault.submit_nft(PROV_B, batch_id, cts).unwrap();
        assert!(vault.request_fusion(PROV_A, batch_id).is_ok());
    }

    #[test]
    fn averaging_truncates_integer_mean() {
        let (engine, vault) = vault();
        let batch_id = vault.open_batch(OWNER).unwrap();
        vault
            .submit_nft(PROV_A, batch_id, triple(&engine, 11, 20, 95))
            .unwrap();
        vault
            .submit_nft(PROV_B, batch_id, triple(&engine, 20, 21, 96))
            .unwrap();
        vault
            .submit_nft(OWNER, batch_id, triple(&engine, 30, 22, 97))
            .unwrap_err(); // owner is not a provider
        vault.add_provider(OWNER, OWNER).unwrap();
        vault
            .submit_nft(OWNER, batch_id, triple(&engine, 30, 22, 97))
            .unwrap();

        let request = vault.request_fusion(PROV_A, batch_id).unwrap();
        let (values, proof) = decrypt_request(&engine, &vault, request.request_id);
        // (11+20+30)/3 = 20, (20+21+22)/3 = 21, (95+96+97)/3 = 96
        assert_eq!(values, [20, 21, 96]);

        let event = vault
            .fulfill_fusion(request.request_id, values, &proof)
            .unwrap();
        assert_eq!(event.token_id, 1);
        assert_eq!((event.attack, event.defense, event.speed), (20, 21, 96));
    }

    #[test]
    fn replayed_callback_rejects() {
        let (engine, vault) = vault();
        let batch_id = vault.open_batch(OWNER).unwrap();
        vault
            .submit_nft(PROV_A, batch_id, triple(&engine, 10, 20, 30))
            .unwrap();
        vault
            .submit_nft(PROV_B, batch_id, triple(&engine, 20, 30, 40))
            .unwrap();

        let request = vault.request_fusion(PROV_A, batch_id).unwrap();
        let (values, proof) = decrypt_request(&engine, &vault, request.request_id);
        vault
            .fulfill_fusion(request.request_id, values, &proof)
            .unwrap();

        assert!(matches!(
            vault.fulfill_fusion(request.request_id, values, &proof),
            Err(AppError::ReplayAttempt)
        ));
    }

    #[test]
    fn mutated_batch_rejects_even_with_valid_proof() {
        let (engine, vault) = vault();
        let batch_id = vault.open_batch(OWNER).unwrap();
        vault
            .submit_nft(PROV_A, batch_id, triple(&engine, 10, 20, 30))
            .unwrap();
        vault
            .submit_nft(PROV_B, batch_id, triple(&engine, 20, 30, 40))
            .unwrap();

        let request = vault.request_fusion(PROV_A, batch_id).unwrap();
        let (values, proof) = decrypt_request(&engine, &vault, request.request_id);

        // Batch grows between request and fulfillment
        vault.add_provider(OWNER, "0xlate").unwrap();
        vault
            .submit_nft("0xlate", batch_id, triple(&engine, 50, 60, 70))
            .unwrap();

        assert!(matches!(
            vault.fulfill_fusion(request.request_id, values, &proof),
            Err(AppError::StateMismatch)
        ));
    }

    #[test]
    fn bad_proof_rejects_after_state_check() {
        let (engine, vault) = vault();
        let batch_id = vault.open_batch(OWNER).unwrap();
        vault
            .submit_nft(PROV_A, batch_id, triple(&engine, 10, 20, 30))
            .unwrap();
        vault
            .submit_nft(PROV_B, batch_id, triple(&engine, 20, 30, 40))
            .unwrap();

        let request = vault.request_fusion(PROV_A, batch_id).unwrap();
        let (values, _) = decrypt_request(&engine, &vault, request.request_id);
        let forged = decryption_proof("wrong-key", request.request_id, &values);

        assert!(matches!(
            vault.fulfill_fusion(request.request_id, values, &forged),
            Err(AppError::InvalidProof)
        ));

        // Tampered plaintexts also fail the proof check
        let (_, proof) = decrypt_request(&engine, &vault, request.request_id);
        assert!(matches!(
            vault.fulfill_fusion(request.request_id, [1, 2, 3], &proof),
            Err(AppError::InvalidProof)
        ));
    }

    #[test]
    fn end_to_end_fusion_flow() {
        let (engine, vault) = vault();
        let batch_id = vault.open_batch(OWNER).unwrap();
        vault
            .submit_nft(PROV_A, batch_id, triple(&engine, 30, 44, 58))
            .unwrap();
        vault
            .submit_nft(PROV_B, batch_id, triple(&engine, 41, 45, 61))
            .unwrap();

        let before = vault.status().last_token_id;
        let request = vault.request_fusion(PROV_A, batch_id).unwrap();
        assert!(!request.processed);

        let (values, proof) = decrypt_request(&engine, &vault, request.request_id);
        let event = vault
            .fulfill_fusion(request.request_id, values, &proof)
            .unwrap();

        assert_eq!(event.token_id, before + 1);
        assert_eq!((event.attack, event.defense, event.speed), (35, 44, 59));
        assert!(vault.get_request(request.request_id).unwrap().processed);
        assert!(vault.pending_requests().is_empty());

        assert!(matches!(
            vault.fulfill_fusion(request.request_id, values, &proof),
            Err(AppError::ReplayAttempt)
        ));
    }

    #[test]
    fn closed_batches_remain_fusable() {
        let (engine, vault) = vault();
        let batch_id = vault.open_batch(OWNER).unwrap();
        vault
            .submit_nft(PROV_A, batch_id, triple(&engine, 10, 10, 10))
            .unwrap();
        vault
            .submit_nft(PROV_B, batch_id, triple(&engine, 20, 20, 20))
            .unwrap();
        vault.close_batch(OWNER, batch_id).unwrap();

        let request = vault.request_fusion(PROV_A, batch_id).unwrap();
        let (values, proof) = decrypt_request(&engine, &vault, request.request_id);
        let event = vault
            .fulfill_fusion(request.request_id, values, &proof)
            .unwrap();
        assert_eq!((event.attack, event.defense, event.speed), (15, 15, 15));
    }
}
