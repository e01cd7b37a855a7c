use std::sync::OnceLock;

use ed25519_dalek::{Signer as _, SigningKey, Verifier as _, VerifyingKey};
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};

/// Process-wide Ed25519 key pair, lazily initialized from configuration on
/// first signing attempt. Never mutated after init.
static SERVER_KEY: OnceLock<SigningKey> = OnceLock::new();

/// Configure the process-wide signing key. Call once at startup; a later
/// call is a no-op if the key is already initialized. Eager init lets a
/// bad key surface at boot instead of on the first write.
pub fn init_signing_key(raw: &str) -> Result<()> {
    if SERVER_KEY.get().is_some() {
        return Ok(());
    }
    let key = decode_private_key(raw)?;
    // `set` fails only on a lost init race; either writer's key is
    // equivalent since both decoded the same configuration.
    let _ = SERVER_KEY.set(key);
    Ok(())
}

fn signing_key() -> Result<&'static SigningKey> {
    SERVER_KEY
        .get()
        .ok_or_else(|| Error::Signing("ED25519_PRIVATE_KEY is not configured".to_string()))
}

fn decode_private_key(raw: &str) -> Result<SigningKey> {
    let trimmed = raw.trim();
    if trimmed.starts_with("-----BEGIN") {
        return decode_pem_private_key(trimmed);
    }
    decode_hex_private_key(trimmed)
}

fn decode_pem_private_key(pem: &str) -> Result<SigningKey> {
    use ed25519_dalek::pkcs8::DecodePrivateKey;
    SigningKey::from_pkcs8_pem(pem).map_err(|e| Error::Signing(format!("invalid PEM private key: {e}")))
}

fn decode_hex_private_key(hex_str: &str) -> Result<SigningKey> {
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    let bytes = hex::decode(hex_str).map_err(|e| Error::Signing(format!("invalid hex private key: {e}")))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| Error::Signing("private key must be 32 bytes".to_string()))?;
    Ok(SigningKey::from_bytes(&bytes))
}

/// Produce the canonical byte form of a resource's non-signature fields:
/// `serde_json` encoding in declared field order (the struct's `Serialize`
/// impl already emits fields in declaration order) with a trailing newline.
///
/// This ad-hoc `JSON.stringify + "\n"` canonicalization is preserved rather
/// than switched to JCS/RFC 8785: whether already-deployed verifiers depend
/// on the legacy byte form is not something to guess at (see DESIGN.md).
#[must_use]
pub fn canonicalize(without_signature: &JsonValue) -> Vec<u8> {
    let mut bytes = serde_json::to_vec(without_signature).expect("JsonValue always serializes");
    bytes.push(b'\n');
    bytes
}

/// Sign the canonical bytes of a resource, returning `ed25519:0x<hex>`.
pub fn sign(without_signature: &JsonValue) -> Result<String> {
    let key = signing_key()?;
    let bytes = canonicalize(without_signature);
    let signature = key.sign(&bytes);
    Ok(format!("ed25519:0x{}", hex::encode(signature.to_bytes())))
}

/// Verify a `ed25519:0x<hex>` signature against the canonical bytes of
/// `without_signature`, using the process-wide public key.
pub fn verify(signature: &str, without_signature: &JsonValue) -> Result<bool> {
    let key = signing_key()?;
    let verifying_key: VerifyingKey = key.verifying_key();
    let Some(hex_sig) = signature.strip_prefix("ed25519:0x") else {
        return Ok(false);
    };
    let Ok(sig_bytes) = hex::decode(hex_sig) else {
        return Ok(false);
    };
    let Ok(sig_bytes): std::result::Result<[u8; 64], _> = sig_bytes.try_into() else {
        return Ok(false);
    };
    let signature = ed25519_dalek::Signature::from_bytes(&sig_bytes);
    let bytes = canonicalize(without_signature);
    Ok(verifying_key.verify(&bytes, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Once;

    static INIT: Once = Once::new();

    fn ensure_key() {
        INIT.call_once(|| {
            let key_bytes = [7u8; 32];
            init_signing_key(&hex::encode(key_bytes)).unwrap();
        });
    }

    #[test]
    fn signature_is_stable_across_repeated_signings_of_equal_content() {
        ensure_key();
        let body = serde_json::json!({"a": 1, "b": "two"});
        let sig1 = sign(&body).unwrap();
        let sig2 = sign(&body).unwrap();
        assert_eq!(sig1, sig2);
        assert!(sig1.starts_with("ed25519:0x"));
    }

    #[test]
    fn verify_round_trips_a_fresh_signature() {
        ensure_key();
        let body = serde_json::json!({"title": "hello", "items": [1, 2, 3]});
        let sig = sign(&body).unwrap();
        assert!(verify(&sig, &body).unwrap());
    }

    #[test]
    fn verify_rejects_mutated_content() {
        ensure_key();
        let body = serde_json::json!({"title": "hello"});
        let sig = sign(&body).unwrap();
        let mutated = serde_json::json!({"title": "goodbye"});
        assert!(!verify(&sig, &mutated).unwrap());
    }

    #[test]
    fn canonicalize_ends_with_trailing_newline() {
        let body = serde_json::json!({"x": 1});
        let bytes = canonicalize(&body);
        assert_eq!(bytes.last().copied(), Some(b'\n'));
    }
}
