//! Signature verification functionality.

use crate::error::{Result, SignError};
use crate::hash::DocumentHash;
use crate::keys::{KeyStore, ALGORITHM_ID};
use crate::payload::BapbPayload;
use crate::signature::SignatureRecord;
use crate::store::KeyValueStore;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Result of verifying a single signature.
#[derive(Debug, Clone)]
pub struct SignatureResult {
    /// The index of this signature in the document's sequence.
    pub index: usize,

    /// Whether the signature is valid.
    pub valid: bool,

    /// The claimed signer.
    pub signer: String,

    /// When the signature claims to have been made.
    pub created_at: DateTime<Utc>,

    /// Error message if the record could not be checked at all.
    pub error: Option<String>,
}

/// Result of verifying all signatures on a document.
#[derive(Debug)]
pub struct VerificationResult {
    /// Whether there is at least one signature and all of them are valid.
    pub all_valid: bool,

    /// The document hash that was verified.
    pub document_hash: DocumentHash,

    /// Results for each individual signature, in sequence order.
    pub signatures: Vec<SignatureResult>,
}

impl VerificationResult {
    /// Get the number of valid signatures.
    pub fn valid_count(&self) -> usize {
        self.signatures.iter().filter(|s| s.valid).count()
    }

    /// Get the number of invalid signatures.
    pub fn invalid_count(&self) -> usize {
        self.signatures.iter().filter(|s| !s.valid).count()
    }

    /// Get the signers whose signatures verified.
    pub fn valid_signers(&self) -> Vec<String> {
        self.signatures
            .iter()
            .filter(|s| s.valid)
            .map(|s| s.signer.clone())
            .collect()
    }
}

/// Checks signature records against public keys held by a [`KeyStore`].
pub struct Verifier<'a, S: KeyValueStore> {
    keys: &'a KeyStore<S>,
}

impl<'a, S: KeyValueStore> Verifier<'a, S> {
    /// Create a verifier borrowing the given key store.
    pub fn new(keys: &'a KeyStore<S>) -> Self {
        Self { keys }
    }

    /// Verify `record` as a signature over `hash`.
    ///
    /// Returns `Ok(false)` for every cryptographic negative: unknown signer,
    /// unreadable stored key, foreign algorithm, undecodable or wrong
    /// signature. Errors are reserved for a structurally invalid record
    /// ([`SignError::MalformedSignature`]) and a failing key store backend.
    pub async fn verify(&self, hash: &DocumentHash, record: &SignatureRecord) -> Result<bool> {
        record.validate()?;

        if record.algorithm != ALGORITHM_ID {
            debug!(signer = %record.signer, alg = %record.algorithm, "unsupported algorithm");
            return Ok(false);
        }

        let public_key = match self.keys.get_public_key(&record.signer).await {
            Ok(Some(key)) => key,
            Ok(None) => {
                debug!(signer = %record.signer, "no keys for claimed signer");
                return Ok(false);
            }
            Err(SignError::InvalidKey(reason)) => {
                warn!(signer = %record.signer, %reason, "cannot verify against stored key");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        let Ok(signature) = record.signature_bytes() else {
            debug!(signer = %record.signer, "signature is not valid base64");
            return Ok(false);
        };

        let valid = public_key.verify(hash.as_bytes(), &signature);
        debug!(signer = %record.signer, hash = %hash, valid, "signature checked");
        Ok(valid)
    }

    /// Verify `record` against the canonical hash of `payload`.
    pub async fn verify_payload(
        &self,
        payload: &BapbPayload,
        record: &SignatureRecord,
    ) -> Result<bool> {
        let hash = payload.compute_hash()?;
        self.verify(&hash, record).await
    }

    /// Quick check that never fails: errors count as invalid.
    pub async fn is_valid(&self, hash: &DocumentHash, record: &SignatureRecord) -> bool {
        self.verify(hash, record).await.unwrap_or(false)
    }

    /// Verify every record of a document's signature sequence against `hash`.
    pub async fn verify_all(
        &self,
        hash: &DocumentHash,
        records: &[SignatureRecord],
    ) -> VerificationResult {
        let mut results = Vec::with_capacity(records.len());
        let mut all_valid = !records.is_empty();

        for (index, record) in records.iter().enumerate() {
            let (valid, error) = match self.verify(hash, record).await {
                Ok(valid) => (valid, None),
                Err(e) => (false, Some(e.to_string())),
            };
            all_valid &= valid;

            results.push(SignatureResult {
                index,
                valid,
                signer: record.signer.clone(),
                created_at: record.created_at,
                error,
            });
        }

        VerificationResult {
            all_valid,
            document_hash: *hash,
            signatures: results,
        }
    }
}

/// Convenience function to verify a single record.
pub async fn verify<S: KeyValueStore>(
    keys: &KeyStore<S>,
    hash: &DocumentHash,
    record: &SignatureRecord,
) -> Result<bool> {
    Verifier::new(keys).verify(hash, record).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_bytes;
    use crate::signer::Signer;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    async fn store_with(principals: &[&str]) -> KeyStore<MemoryStore> {
        let keys = KeyStore::new(Arc::new(MemoryStore::new()));
        for principal in principals {
            keys.ensure_keys(principal).await.unwrap();
        }
        keys
    }

    #[tokio::test]
    async fn test_verify_valid_signature() {
        let keys = store_with(&["alice@example.com"]).await;
        let hash = hash_bytes(b"Test document content");

        let record = Signer::new(&keys).sign("alice@example.com", &hash).await.unwrap();

        assert!(Verifier::new(&keys).verify(&hash, &record).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_wrong_hash() {
        let keys = store_with(&["alice@example.com"]).await;
        let hash = hash_bytes(b"Original content");
        let other = hash_bytes(b"Tampered content");

        let record = Signer::new(&keys).sign("alice@example.com", &hash).await.unwrap();

        assert!(!Verifier::new(&keys).verify(&other, &record).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_unknown_signer() {
        let keys = store_with(&["alice@example.com"]).await;
        let hash = hash_bytes(b"doc");
        let mut record = Signer::new(&keys).sign("alice@example.com", &hash).await.unwrap();
        record.signer = "ghost@example.com".to_string();

        assert!(!verify(&keys, &hash, &record).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_garbled_record_is_false() {
        let keys = store_with(&["alice@example.com"]).await;
        let hash = hash_bytes(b"doc");
        let record = Signer::new(&keys).sign("alice@example.com", &hash).await.unwrap();
        let verifier = Verifier::new(&keys);

        let mut bad_base64 = record.clone();
        bad_base64.signature = "***".to_string();
        assert!(!verifier.verify(&hash, &bad_base64).await.unwrap());

        let mut truncated = record.clone();
        truncated.signature = "AAEC".to_string();
        assert!(!verifier.verify(&hash, &truncated).await.unwrap());

        let mut foreign = record.clone();
        foreign.algorithm = "Ed25519".to_string();
        assert!(!verifier.verify(&hash, &foreign).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_malformed_record_is_error() {
        let keys = store_with(&[]).await;
        let hash = hash_bytes(b"doc");
        let record = SignatureRecord::new("", &[1, 2, 3], hash);

        let result = Verifier::new(&keys).verify(&hash, &record).await;
        assert!(matches!(result, Err(SignError::MalformedSignature(_))));
        assert!(!Verifier::new(&keys).is_valid(&hash, &record).await);
    }

    #[tokio::test]
    async fn test_verify_all() {
        let keys = store_with(&["alice@example.com", "bob@example.com"]).await;
        let hash = hash_bytes(b"Test document content");
        let signer = Signer::new(&keys);

        let mut records = vec![
            signer.sign("alice@example.com", &hash).await.unwrap(),
            signer.sign("bob@example.com", &hash).await.unwrap(),
        ];

        let result = Verifier::new(&keys).verify_all(&hash, &records).await;
        assert!(result.all_valid);
        assert_eq!(result.valid_count(), 2);
        assert_eq!(
            result.valid_signers(),
            vec!["alice@example.com".to_string(), "bob@example.com".to_string()]
        );

        records[1].signer = "alice@example.com".to_string();
        records.push(SignatureRecord::new("", &[], hash));
        let result = Verifier::new(&keys).verify_all(&hash, &records).await;
        assert!(!result.all_valid);
        assert_eq!(result.valid_count(), 1);
        assert_eq!(result.invalid_count(), 2);
        assert!(result.signatures[1].error.is_none());
        assert!(result.signatures[2].error.is_some());
    }

    #[tokio::test]
    async fn test_verify_all_empty() {
        let keys = store_with(&[]).await;
        let result = Verifier::new(&keys).verify_all(&hash_bytes(b"doc"), &[]).await;

        assert!(!result.all_valid);
        assert_eq!(result.valid_count(), 0);
    }
}
