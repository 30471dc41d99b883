//! RSA-PSS key pairs and the per-principal key store.

use crate::config::Config;
use crate::error::{Result, SignError};
use crate::store::KeyValueStore;
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::pss::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Algorithm identifier carried by every signature record.
///
/// Consumers branch on this literal to pick a verification algorithm.
pub const ALGORITHM_ID: &str = "RSA-PSS/SHA-256";

/// PSS salt length in bytes, used for both signing and verification.
pub const SALT_LEN: usize = 32;

/// An RSA key pair for signing document hashes.
pub struct KeyPair {
    private_key: RsaPrivateKey,
}

impl KeyPair {
    /// Generate a new random key pair with a modulus of `bits` bits.
    pub fn generate(bits: usize) -> Result<Self> {
        let private_key = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| SignError::KeyGeneration(e.to_string()))?;
        Ok(Self { private_key })
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            key: self.private_key.to_public_key(),
        }
    }

    /// Sign a message with RSA-PSS over SHA-256.
    ///
    /// Each call draws a fresh salt, so repeated signatures differ.
    pub(crate) fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let signing_key = SigningKey::<Sha256>::new_with_salt_len(self.private_key.clone(), SALT_LEN);
        let signature = signing_key
            .try_sign_with_rng(&mut OsRng, message)
            .map_err(|e| SignError::Signing(e.to_string()))?;
        Ok(signature.to_vec())
    }

    fn to_encoded(&self) -> Result<EncodedKeyPair> {
        let private_pem = self
            .private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| SignError::KeyGeneration(e.to_string()))?;
        Ok(EncodedKeyPair {
            public_key: self.public_key().to_pem()?,
            private_key: private_pem.as_str().to_owned(),
        })
    }

    fn from_encoded(encoded: &EncodedKeyPair) -> Result<Self> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(&encoded.private_key)
            .map_err(|e| SignError::InvalidKey(e.to_string()))?;
        let public_key = PublicKey::from_pem(&encoded.public_key)?;
        if private_key.to_public_key() != public_key.key {
            return Err(SignError::InvalidKey(
                "stored public key does not match private key".to_string(),
            ));
        }
        Ok(Self { private_key })
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// An RSA public key for verifying signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    key: RsaPublicKey,
}

impl PublicKey {
    /// Encode as an SPKI PEM document.
    pub fn to_pem(&self) -> Result<String> {
        self.key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| SignError::InvalidKey(e.to_string()))
    }

    /// Decode from an SPKI PEM document.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let key = RsaPublicKey::from_public_key_pem(pem)
            .map_err(|e| SignError::InvalidKey(e.to_string()))?;
        Ok(Self { key })
    }

    /// Check an RSA-PSS/SHA-256 signature on a message.
    ///
    /// Any malformed or mismatched signature yields `false`.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let Ok(signature) = Signature::try_from(signature) else {
            return false;
        };
        VerifyingKey::<Sha256>::new_with_salt_len(self.key.clone(), SALT_LEN)
            .verify(message, &signature)
            .is_ok()
    }
}

/// Stored form of a key pair: both halves as PEM text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EncodedKeyPair {
    public_key: String,
    private_key: String,
}

/// Per-principal key pairs persisted in a keyed store.
///
/// Each principal owns at most one key pair, stored under
/// `config.key_prefix + principal`. Private key material never leaves this
/// type except to sign inside the crate.
pub struct KeyStore<S: KeyValueStore> {
    store: Arc<S>,
    config: Config,
}

impl<S: KeyValueStore> Clone for KeyStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: KeyValueStore> KeyStore<S> {
    /// Create a key store with the default configuration.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, Config::default())
    }

    /// Create a key store with a custom configuration.
    pub fn with_config(store: Arc<S>, config: Config) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The backing keyed store.
    pub fn backend(&self) -> &Arc<S> {
        &self.store
    }

    /// Make sure `principal` has a stored key pair, generating one if not.
    ///
    /// Existing keys are never replaced. The check and the write are not
    /// atomic: two first-time calls racing for the same principal both
    /// generate, and the later write wins.
    pub async fn ensure_keys(&self, principal: &str) -> Result<()> {
        if principal.is_empty() {
            return Err(SignError::InvalidIdentity("empty principal".to_string()));
        }
        let slot = self.config.key_slot(principal);
        if self.store.get(&slot).await?.is_some() {
            debug!(principal, "signing keys already present");
            return Ok(());
        }

        let bits = self.config.modulus_bits;
        let keypair = tokio::task::spawn_blocking(move || KeyPair::generate(bits))
            .await
            .map_err(|e| SignError::KeyGeneration(e.to_string()))??;

        let encoded = serde_json::to_string(&keypair.to_encoded()?)?;
        self.store.set(&slot, encoded).await.map_err(|e| {
            warn!(principal, error = %e, "could not persist signing keys");
            SignError::KeyGeneration(e.to_string())
        })?;
        info!(principal, bits, "generated signing keys");
        Ok(())
    }

    /// Load the key pair for `principal`, if one was ever ensured.
    pub async fn get_keys(&self, principal: &str) -> Result<Option<KeyPair>> {
        match self.load_encoded(principal).await? {
            Some(encoded) => KeyPair::from_encoded(&encoded).map(Some),
            None => Ok(None),
        }
    }

    /// Load only the public half of `principal`'s key pair.
    pub async fn get_public_key(&self, principal: &str) -> Result<Option<PublicKey>> {
        match self.load_encoded(principal).await? {
            Some(encoded) => PublicKey::from_pem(&encoded.public_key).map(Some),
            None => Ok(None),
        }
    }

    async fn load_encoded(&self, principal: &str) -> Result<Option<EncodedKeyPair>> {
        let Some(raw) = self.store.get(&self.config.key_slot(principal)).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw).map(Some).map_err(|e| {
            warn!(principal, error = %e, "stored key pair is unreadable");
            SignError::InvalidKey(e.to_string())
        })
    }
}
