//! Ed25519 verification of interaction webhooks.
//!
//! Every request carries `X-Signature-Ed25519` (hex) and
//! `X-Signature-Timestamp`; the signed message is `timestamp || body`.

use ed25519_dalek::{Signature, VerifyingKey};

pub const HEADER_SIGNATURE: &str = "x-signature-ed25519";
pub const HEADER_TIMESTAMP: &str = "x-signature-timestamp";

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid public key: {0}")]
    InvalidKey(String),
    #[error("malformed signature: {0}")]
    Malformed(String),
    #[error("signature does not match")]
    Mismatch,
}

/// Verifies requests against the application's public key.
#[derive(Debug, Clone)]
pub struct Verifier {
    key: VerifyingKey,
}

impl Verifier {
    pub fn from_hex(public_key: &str) -> Result<Self, SignatureError> {
        let bytes = hex::decode(public_key.trim())
            .map_err(|e| SignatureError::InvalidKey(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| SignatureError::InvalidKey("expected 32 bytes".into()))?;
        let key = VerifyingKey::from_bytes(&bytes)
            .map_err(|e| SignatureError::InvalidKey(e.to_string()))?;
        Ok(Self { key })
    }

    pub fn verify(&self, signature: &str, timestamp: &str, body: &[u8]) -> Result<(), SignatureError> {
        let sig = hex::decode(signature.trim())
            .map_err(|e| SignatureError::Malformed(e.to_string()))?;
        let sig: [u8; 64] = sig
            .try_into()
            .map_err(|_| SignatureError::Malformed("expected 64 bytes".into()))?;
        let sig = Signature::from_bytes(&sig);

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.key
            .verify_strict(&message, &sig)
            .map_err(|_| SignatureError::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn signed(key: &SigningKey, ts: &str, body: &str) -> String {
        let msg = format!("{ts}{body}");
        hex::encode(key.sign(msg.as_bytes()).to_bytes())
    }

    #[test]
    fn accepts_valid_signature() {
        let key = SigningKey::from_bytes(&[7u8; 32]);
        let verifier = Verifier::from_hex(&hex::encode(key.verifying_key().to_bytes())).unwrap();
        let sig = signed(&key, "1700000000", r#"{"type":1}"#);
        verifier.verify(&sig, "1700000000", br#"{"type":1}"#).unwrap();
    }

    #[test]
    fn rejects_tampered_body_and_timestamp() {
        let key = SigningKey::from_bytes(&[7u8; 32]);
        let verifier = Verifier::from_hex(&hex::encode(key.verifying_key().to_bytes())).unwrap();
        let sig = signed(&key, "1700000000", r#"{"type":1}"#);
        assert!(matches!(
            verifier.verify(&sig, "1700000000", br#"{"type":2}"#),
            Err(SignatureError::Mismatch)
        ));
        assert!(matches!(
            verifier.verify(&sig, "1700000001", br#"{"type":1}"#),
            Err(SignatureError::Mismatch)
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(Verifier::from_hex("zz").is_err());
        assert!(Verifier::from_hex("abcd").is_err());

        let key = SigningKey::from_bytes(&[1u8; 32]);
        let verifier = Verifier::from_hex(&hex::encode(key.verifying_key().to_bytes())).unwrap();
        assert!(matches!(
            verifier.verify("not-hex", "1", b"{}"),
            Err(SignatureError::Malformed(_))
        ));
        assert!(matches!(
            verifier.verify("abcd", "1", b"{}"),
            Err(SignatureError::Malformed(_))
        ));
    }
}
