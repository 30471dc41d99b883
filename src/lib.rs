//! # bapb-sign
//!
//! Local digital signatures for goods-receipt (BAPB) documents, using
//! RSA-PSS over SHA-256.
//!
//! ## Features
//!
//! - **Canonical hashing** of the integrity-relevant document fields with a
//!   fixed field order
//! - **Per-principal keys** generated once and kept in a pluggable keyed store
//! - **Probabilistic signatures** over the raw hash bytes
//! - **Boolean verification**: tampering or a wrong signer is `false`, not an
//!   error
//! - **Append-only signature sequences** for multi-party signing
//!
//! ## Quick Start
//!
//! ### Establish a Signing Identity
//!
//! ```rust
//! use bapb_sign::{IdentityService, KeyStore, MemoryStore};
//! use std::sync::Arc;
//!
//! # tokio_test(async {
//! let identity = IdentityService::new(KeyStore::new(Arc::new(MemoryStore::new())));
//! identity.register("officer@x.com", "secret", None).await.unwrap();
//! # });
//! # fn tokio_test<F: std::future::Future>(f: F) {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f);
//! # }
//! ```
//!
//! ### Sign and Verify a Document
//!
//! ```rust
//! use bapb_sign::{BapbPayload, InspectionItem, KeyStore, MemoryStore, Signer, Verifier};
//! use std::sync::Arc;
//!
//! # tokio_test(async {
//! let keys = KeyStore::new(Arc::new(MemoryStore::new()));
//! keys.ensure_keys("officer@x.com").await.unwrap();
//!
//! let payload = BapbPayload {
//!     contract_no: "KTR-001".to_string(),
//!     items: vec![InspectionItem::new("Box", 5, "Baik", "")],
//!     ..Default::default()
//! };
//! let hash = payload.compute_hash().unwrap();
//!
//! let record = Signer::new(&keys).sign("officer@x.com", &hash).await.unwrap();
//! assert!(Verifier::new(&keys).verify(&hash, &record).await.unwrap());
//! # });
//! # fn tokio_test<F: std::future::Future>(f: F) {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f);
//! # }
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod hash;
pub mod identity;
pub mod keys;
pub mod payload;
pub mod signature;
pub mod signer;
pub mod store;
pub mod verifier;

// Re-export main types for convenience
pub use config::Config;
pub use document::{sign_document, DocumentStore, MemoryDocumentStore};
pub use error::{Result, SignError};
pub use hash::{hash_bytes, DocumentHash};
pub use identity::{Account, IdentityProfile, IdentityService, Session};
pub use keys::{KeyPair, KeyStore, PublicKey, ALGORITHM_ID};
pub use payload::{compute_hash, BapbPayload, InspectionItem};
pub use signature::SignatureRecord;
pub use signer::{sign, Signer};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use verifier::{verify, SignatureResult, VerificationResult, Verifier};
