//! Signature records and their JSON form.

use crate::error::{Result, SignError};
use crate::hash::DocumentHash;
use crate::keys::ALGORITHM_ID;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One signer's signature over a document hash.
///
/// Records are facts: once produced they are only stored and appended,
/// never edited. The JSON field names match what the document store holds:
/// `by`, `alg`, `sigBase64`, `hash`, `createdAt` (epoch milliseconds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    /// The principal whose key made this signature.
    #[serde(rename = "by")]
    pub signer: String,

    /// Algorithm identifier, normally [`ALGORITHM_ID`].
    #[serde(rename = "alg")]
    pub algorithm: String,

    /// The signature bytes (base64 encoded).
    #[serde(rename = "sigBase64")]
    pub signature: String,

    /// The hash that was signed.
    pub hash: DocumentHash,

    /// When the signature was created.
    #[serde(rename = "createdAt", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl SignatureRecord {
    pub(crate) fn new(signer: &str, signature_bytes: &[u8], hash: DocumentHash) -> Self {
        use base64::Engine;
        Self {
            signer: signer.to_string(),
            algorithm: ALGORITHM_ID.to_string(),
            signature: base64::engine::general_purpose::STANDARD.encode(signature_bytes),
            hash,
            created_at: Utc::now(),
        }
    }

    /// Parse a stored record.
    ///
    /// Missing or empty `by` / `sigBase64` fields are reported as
    /// [`SignError::MalformedSignature`], as is any other shape problem.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| SignError::MalformedSignature(e.to_string()))?;
        Self::from_value(value)
    }

    /// Build a record from an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        for field in ["by", "sigBase64"] {
            let present = value
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| !s.is_empty());
            if !present {
                return Err(SignError::MalformedSignature(format!(
                    "missing field `{}`",
                    field
                )));
            }
        }
        serde_json::from_value(value).map_err(|e| SignError::MalformedSignature(e.to_string()))
    }

    /// Serialize the record to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Check that the fields a verifier relies on are present.
    pub fn validate(&self) -> Result<()> {
        if self.signer.is_empty() {
            return Err(SignError::MalformedSignature("missing signer".to_string()));
        }
        if self.signature.is_empty() {
            return Err(SignError::MalformedSignature(
                "missing signature bytes".to_string(),
            ));
        }
        Ok(())
    }

    /// Decode the signature bytes.
    pub fn signature_bytes(&self) -> Result<Vec<u8>> {
        use base64::Engine;
        Ok(base64::engine::general_purpose::STANDARD.decode(&self.signature)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_bytes;
    use serde_json::json;

    fn record() -> SignatureRecord {
        SignatureRecord::new("officer@x.com", &[1, 2, 3, 4], hash_bytes(b"doc"))
    }

    #[test]
    fn test_wire_field_names() {
        let value: Value = serde_json::from_str(&record().to_json().unwrap()).unwrap();

        assert_eq!(value["by"], "officer@x.com");
        assert_eq!(value["alg"], "RSA-PSS/SHA-256");
        assert_eq!(value["sigBase64"], "AQIDBA==");
        assert_eq!(value["hash"], hash_bytes(b"doc").to_hex());
        assert!(value["createdAt"].is_i64());
    }

    #[test]
    fn test_json_roundtrip() {
        let original = record();
        let restored = SignatureRecord::from_json(&original.to_json().unwrap()).unwrap();

        assert_eq!(restored.signer, original.signer);
        assert_eq!(restored.signature, original.signature);
        assert_eq!(restored.hash, original.hash);
        assert_eq!(
            restored.created_at.timestamp_millis(),
            original.created_at.timestamp_millis()
        );
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        let hash = hash_bytes(b"doc").to_hex();
        let cases = [
            json!({"alg": ALGORITHM_ID, "sigBase64": "AQID", "hash": hash, "createdAt": 0}),
            json!({"by": "", "alg": ALGORITHM_ID, "sigBase64": "AQID", "hash": hash, "createdAt": 0}),
            json!({"by": "admin", "alg": ALGORITHM_ID, "hash": hash, "createdAt": 0}),
            json!({"by": "admin", "alg": ALGORITHM_ID, "sigBase64": "AQID", "hash": "nothex", "createdAt": 0}),
        ];

        for case in cases {
            let result = SignatureRecord::from_value(case);
            assert!(matches!(result, Err(SignError::MalformedSignature(_))));
        }
        assert!(matches!(
            SignatureRecord::from_json("[1, 2"),
            Err(SignError::MalformedSignature(_))
        ));
    }

    #[test]
    fn test_validate() {
        let mut r = record();
        assert!(r.validate().is_ok());

        r.signature.clear();
        assert!(matches!(r.validate(), Err(SignError::MalformedSignature(_))));
    }
}
