//! Append-only signature sequences per document.

use crate::error::Result;
use crate::keys::KeyStore;
use crate::payload::BapbPayload;
use crate::signature::SignatureRecord;
use crate::signer::Signer;
use crate::store::KeyValueStore;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

/// Where documents keep their signatures.
///
/// A document's sequence only ever grows; records are never reordered or
/// changed.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Append `record` to the end of the document's signatures.
    async fn append_signature(&self, document_id: &str, record: SignatureRecord) -> Result<()>;

    /// All signatures of the document, oldest first.
    async fn get_signatures(&self, document_id: &str) -> Result<Vec<SignatureRecord>>;
}

/// An in-process document store.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    signatures: RwLock<HashMap<String, Vec<SignatureRecord>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn append_signature(&self, document_id: &str, record: SignatureRecord) -> Result<()> {
        self.signatures
            .write()
            .await
            .entry(document_id.to_string())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn get_signatures(&self, document_id: &str) -> Result<Vec<SignatureRecord>> {
        Ok(self
            .signatures
            .read()
            .await
            .get(document_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Hash `payload`, sign it as `principal`, and append the record to the
/// document's signatures.
pub async fn sign_document<S, D>(
    keys: &KeyStore<S>,
    documents: &D,
    document_id: &str,
    principal: &str,
    payload: &BapbPayload,
) -> Result<SignatureRecord>
where
    S: KeyValueStore,
    D: DocumentStore + ?Sized,
{
    let record = Signer::new(keys).sign_payload(principal, payload).await?;
    documents
        .append_signature(document_id, record.clone())
        .await?;
    info!(document_id, principal, hash = %record.hash, "document signed");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SignError;
    use crate::hash::hash_bytes;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_append_keeps_order() {
        let documents = MemoryDocumentStore::new();
        let hash = hash_bytes(b"doc");

        for signer in ["petugas", "pemesan", "admin"] {
            documents
                .append_signature("SHP_1", SignatureRecord::new(signer, &[0], hash))
                .await
                .unwrap();
        }

        let signers: Vec<String> = documents
            .get_signatures("SHP_1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.signer)
            .collect();
        assert_eq!(signers, vec!["petugas", "pemesan", "admin"]);
        assert!(documents.get_signatures("SHP_2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sign_document_appends() {
        let keys = KeyStore::new(Arc::new(MemoryStore::new()));
        keys.ensure_keys("petugas").await.unwrap();
        let documents = MemoryDocumentStore::new();
        let payload = BapbPayload {
            doc_id: "SHP_1".to_string(),
            ..Default::default()
        };

        let record = sign_document(&keys, &documents, "SHP_1", "petugas", &payload)
            .await
            .unwrap();

        assert_eq!(documents.get_signatures("SHP_1").await.unwrap(), vec![record]);
    }

    #[tokio::test]
    async fn test_failed_sign_appends_nothing() {
        let keys = KeyStore::new(Arc::new(MemoryStore::new()));
        let documents = MemoryDocumentStore::new();

        let result = sign_document(
            &keys,
            &documents,
            "SHP_1",
            "pemesan",
            &BapbPayload::default(),
        )
        .await;

        assert!(matches!(result, Err(SignError::KeyNotFound(_))));
        assert!(documents.get_signatures("SHP_1").await.unwrap().is_empty());
    }
}
