//! Signing document hashes with a principal's stored key.

use crate::error::{Result, SignError};
use crate::hash::DocumentHash;
use crate::keys::KeyStore;
use crate::payload::BapbPayload;
use crate::signature::SignatureRecord;
use crate::store::KeyValueStore;
use tracing::{debug, warn};

/// Produces signature records using keys held by a [`KeyStore`].
///
/// Signing never creates keys: a principal without keys gets
/// [`SignError::KeyNotFound`] and must go through identity setup first.
pub struct Signer<'a, S: KeyValueStore> {
    keys: &'a KeyStore<S>,
}

impl<'a, S: KeyValueStore> Signer<'a, S> {
    /// Create a signer borrowing the given key store.
    pub fn new(keys: &'a KeyStore<S>) -> Self {
        Self { keys }
    }

    /// Sign the raw bytes of `hash` as `principal`.
    ///
    /// The returned record is not persisted anywhere; appending it to the
    /// document's signatures is up to the caller.
    pub async fn sign(&self, principal: &str, hash: &DocumentHash) -> Result<SignatureRecord> {
        let Some(keypair) = self.keys.get_keys(principal).await? else {
            warn!(principal, "signing refused: no keys");
            return Err(SignError::KeyNotFound(principal.to_string()));
        };

        let signature_bytes = keypair.sign(hash.as_bytes())?;
        debug!(principal, hash = %hash, "document hash signed");
        Ok(SignatureRecord::new(principal, &signature_bytes, *hash))
    }

    /// Hash a payload canonically and sign the result.
    pub async fn sign_payload(
        &self,
        principal: &str,
        payload: &BapbPayload,
    ) -> Result<SignatureRecord> {
        let hash = payload.compute_hash()?;
        self.sign(principal, &hash).await
    }
}

/// Convenience function to sign a hash as `principal`.
pub async fn sign<S: KeyValueStore>(
    keys: &KeyStore<S>,
    principal: &str,
    hash: &DocumentHash,
) -> Result<SignatureRecord> {
    Signer::new(keys).sign(principal, hash).await
}
