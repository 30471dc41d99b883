//! Error types for the bapb-sign library.

use thiserror::Error;

/// The main error type for bapb-sign operations.
///
/// A signature that simply does not verify is not an error: verification
/// reports it as `Ok(false)`.
#[derive(Error, Debug)]
pub enum SignError {
    /// Error reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error with JSON serialization/deserialization.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error parsing a TOML configuration.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Error with base64 encoding/decoding.
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Error with hex encoding/decoding.
    #[error("Hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),

    /// A signing key pair could not be generated or persisted.
    #[error("Cannot establish signing identity: {0}")]
    KeyGeneration(String),

    /// No key pair is stored for the principal.
    #[error("No signing keys found for {0}")]
    KeyNotFound(String),

    /// The private-key operation failed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Stored key material could not be decoded.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// The signature record itself is structurally invalid.
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    /// Invalid hash or payload format.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// The keyed store backend failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An account with this email is already registered.
    #[error("Account already registered: {0}")]
    AccountExists(String),

    /// No account is registered under this email.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// The password does not match.
    #[error("Wrong password")]
    WrongPassword,

    /// The role is not one of the shared role accounts.
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// The identity form was incomplete or invalid.
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    /// No session is active.
    #[error("Not authenticated")]
    NotAuthenticated,
}

/// Result type alias for bapb-sign operations.
pub type Result<T> = std::result::Result<T, SignError>;
