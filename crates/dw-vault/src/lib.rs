//! Per-document secret encryption (spec.md §5 "per-document secrets are
//! decrypted per call from the repository ciphertext; no long-lived
//! plaintext cache"). Keyed by a single process-wide master key, mirroring
//! `mqk-config::secrets`'s "resolve once, pass down" discipline but adding
//! an actual at-rest encryption boundary since here the secret travels
//! through the repository rather than staying in the environment.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key};
use dw_schemas::DocSecrets;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("ciphertext blob is truncated or malformed")]
    Malformed,
    #[error("decryption failed: wrong master key or corrupted blob")]
    DecryptFailed,
    #[error("serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

const NONCE_LEN: usize = 12;

/// Process-wide master key, immutable after startup (spec.md §9 "global
/// mutable state"). Never `Debug`-printed with the raw key visible.
#[derive(Clone)]
pub struct MasterKey {
    key_bytes: [u8; 32],
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey").field("key_bytes", &"<REDACTED>").finish()
    }
}

impl MasterKey {
    /// Derives a 256-bit AES key from the configured master key string via
    /// SHA-256, so operators can supply a passphrase of any length.
    pub fn derive(raw: &str) -> MasterKey {
        let mut hasher = Sha256::new();
        hasher.update(raw.as_bytes());
        let digest = hasher.finalize();
        let mut key_bytes = [0u8; 32];
        key_bytes.copy_from_slice(&digest);
        MasterKey { key_bytes }
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key_bytes))
    }

    /// Encrypts a document's decrypted secrets into an opaque blob suitable
    /// for storage in `dw-repo`. Layout: `nonce (12 bytes) || ciphertext`.
    pub fn encrypt(&self, secrets: &DocSecrets) -> Result<Vec<u8>, VaultError> {
        let plaintext = serde_json::to_vec(secrets)?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher()
            .encrypt(&nonce, plaintext.as_ref())
            .map_err(|_| VaultError::DecryptFailed)?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(nonce.as_slice());
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    /// Decrypts a blob produced by [`Self::encrypt`]. Never caches the
    /// plaintext beyond the caller's stack frame.
    pub fn decrypt(&self, blob: &[u8]) -> Result<DocSecrets, VaultError> {
        if blob.len() <= NONCE_LEN {
            return Err(VaultError::Malformed);
        }
        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
        let plaintext = self
            .cipher()
            .decrypt(nonce_bytes.into(), ciphertext)
            .map_err(|_| VaultError::DecryptFailed)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dw_schemas::ChainKeypair;

    fn sample_secrets() -> DocSecrets {
        DocSecrets {
            chain_a: ChainKeypair {
                address: "0xabc".to_string(),
                private_key: "super-secret".to_string(),
            },
            chain_b: None,
        }
    }

    #[test]
    fn round_trips_through_encrypt_decrypt() {
        let key = MasterKey::derive("correct-horse-battery-staple");
        let secrets = sample_secrets();
        let blob = key.encrypt(&secrets).unwrap();
        let decrypted = key.decrypt(&blob).unwrap();
        assert_eq!(decrypted.chain_a.address, secrets.chain_a.address);
        assert_eq!(decrypted.chain_a.private_key, secrets.chain_a.private_key);
    }

    #[test]
    fn wrong_master_key_fails_to_decrypt() {
        let key_a = MasterKey::derive("key-a");
        let key_b = MasterKey::derive("key-b");
        let blob = key_a.encrypt(&sample_secrets()).unwrap();
        assert!(matches!(key_b.decrypt(&blob), Err(VaultError::DecryptFailed)));
    }

    #[test]
    fn truncated_blob_is_rejected() {
        let key = MasterKey::derive("key-a");
        assert!(matches!(key.decrypt(&[0u8; 4]), Err(VaultError::Malformed)));
    }

    #[test]
    fn two_encryptions_of_the_same_secrets_differ() {
        let key = MasterKey::derive("key-a");
        let secrets = sample_secrets();
        let blob1 = key.encrypt(&secrets).unwrap();
        let blob2 = key.encrypt(&secrets).unwrap();
        assert_ne!(blob1, blob2, "nonce must be fresh per encryption");
    }
}
