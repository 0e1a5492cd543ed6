use crate::error::{AppError, Result};

/// Wallet signature checks (EIP-191 style payloads).
///
/// The decrypt gate treats the signature as a UX hurdle, not a security
/// boundary: the payload is format-checked and logged, never recovered
/// against the signer or compared with the decrypted result.
pub struct SignatureVerifier;

impl SignatureVerifier {
    pub fn verify_signature(address: &str, message: &str, signature: &str) -> Result<bool> {
        if address.is_empty() || signature.is_empty() {
            return Err(AppError::BadRequest(
                "Address or signature cannot be empty".into(),
            ));
        }
        if message.is_empty() {
            return Err(AppError::BadRequest("Message cannot be empty".into()));
        }

        if !signature.starts_with("0x") || signature.len() < 64 {
            return Err(AppError::InvalidSignature);
        }
        if !signature[2..].chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AppError::InvalidSignature);
        }

        tracing::info!("Verifying signature for address: {}", address);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_signature() -> String {
        format!("0x{}", "a".repeat(64))
    }

    #[test]
    fn empty_inputs_return_bad_request() {
        let result = SignatureVerifier::verify_signature("", "hello", &valid_signature());
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let result = SignatureVerifier::verify_signature("0xabc", "hello", "");
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn invalid_signature_format_returns_error() {
        let result = SignatureVerifier::verify_signature("0xabc", "hello", "deadbeef");
        assert!(matches!(result, Err(AppError::InvalidSignature)));

        let result = SignatureVerifier::verify_signature("0xabc", "hello", "0xzz");
        assert!(matches!(result, Err(AppError::InvalidSignature)));
    }

    #[test]
    fn valid_signature_returns_true() {
        let result = SignatureVerifier::verify_signature("0xabc", "hello", &valid_signature());
        assert!(matches!(result, Ok(true)));
    }
}
