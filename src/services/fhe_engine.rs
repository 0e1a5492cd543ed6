use std::collections::HashMap;
use std::sync::RwLock;

use sha3::{Digest, Keccak256};

use crate::constants::HANDLE_HEX_LEN;
use crate::crypto::hash::keccak256_hex;
use crate::error::{AppError, Result};

/// Opaque ciphertext handle, a 0x-prefixed keccak digest.
pub type Handle = String;

/// Handle-based encrypted-integer engine.
///
/// Works like an FHE coprocessor: encrypting registers the plaintext under a
/// fresh random handle, while homomorphic ops derive the result handle
/// deterministically from the operand handles and register the computed
/// plaintext under it. The deterministic derivation is what lets the vault
/// re-run an averaging pipeline in the oracle callback and land on the same
/// ciphertexts, and to notice when the batch changed underneath it.
///
/// Only the oracle side holds a reference that calls [`FheEngine::reveal`].
pub struct FheEngine {
    plaintexts: RwLock<HashMap<Handle, u64>>,
}

impl Default for FheEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FheEngine {
    pub fn new() -> Self {
        Self {
            plaintexts: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_handle(value: &str) -> bool {
        value.len() == HANDLE_HEX_LEN
            && value.starts_with("0x")
            && value[2..].chars().all(|c| c.is_ascii_hexdigit())
    }

    /// Encrypt a plaintext under a fresh handle.
    pub fn encrypt(&self, value: u64) -> Handle {
        let salt: [u8; 32] = rand::random();
        let mut hasher = Keccak256::new();
        hasher.update(b"enc");
        hasher.update(salt);
        hasher.update(value.to_be_bytes());
        let handle = format!("0x{}", hex::encode(hasher.finalize()));

        self.plaintexts
            .write()
            .expect("fhe plaintext store poisoned")
            .insert(handle.clone(), value);
        handle
    }

    /// Whether a handle is registered with the engine.
    pub fn knows(&self, handle: &str) -> bool {
        self.plaintexts
            .read()
            .expect("fhe plaintext store poisoned")
            .contains_key(handle)
    }

    /// Homomorphic addition.
    pub fn add(&self, a: &str, b: &str) -> Result<Handle> {
        let handle = derive_handle("add", &[a, b]);
        let mut store = self
            .plaintexts
            .write()
            .expect("fhe plaintext store poisoned");
        let lhs = *store
            .get(a)
            .ok_or_else(|| AppError::Internal(format!("Unknown ciphertext handle {}", a)))?;
        let rhs = *store
            .get(b)
            .ok_or_else(|| AppError::Internal(format!("Unknown ciphertext handle {}", b)))?;
        store.insert(handle.clone(), lhs.wrapping_add(rhs));
        Ok(handle)
    }

    /// Homomorphic division by a public divisor, truncating.
    pub fn div_plain(&self, a: &str, divisor: u64) -> Result<Handle> {
        if divisor == 0 {
            return Err(AppError::Internal("Division by zero".into()));
        }
        let divisor_hex = format!("{:x}", divisor);
        let handle = derive_handle("div", &[a, &divisor_hex]);
        let mut store = self
            .plaintexts
            .write()
            .expect("fhe plaintext store poisoned");
        let lhs = *store
            .get(a)
            .ok_or_else(|| AppError::Internal(format!("Unknown ciphertext handle {}", a)))?;
        store.insert(handle.clone(), lhs / divisor);
        Ok(handle)
    }

    /// Decrypt a handle. Oracle-side only.
    pub fn reveal(&self, handle: &str) -> Result<u64> {
        self.plaintexts
            .read()
            .expect("fhe plaintext store poisoned")
            .get(handle)
            .copied()
            .ok_or_else(|| AppError::Internal(format!("Unknown ciphertext handle {}", handle)))
    }
}

fn derive_handle(op: &str, operands: &[&str]) -> Handle {
    let mut preimage = Vec::from(op.as_bytes());
    for operand in operands {
        preimage.extend_from_slice(operand.as_bytes());
    }
    keccak256_hex(&preimage)
}
