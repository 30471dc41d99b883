//! Library configuration.

use crate::error::{Result, SignError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Smallest RSA modulus accepted for signing keys.
pub const MIN_MODULUS_BITS: usize = 2048;

/// Settings for key storage and identity handling.
///
/// Every field has a default, so an empty TOML document is a valid
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Keyed-store prefix for key pairs; the principal is appended.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// RSA modulus size for newly generated keys.
    #[serde(default = "default_modulus_bits")]
    pub modulus_bits: usize,

    /// Keyed-store slot holding registered accounts.
    #[serde(default = "default_users_key")]
    pub users_key: String,

    /// Keyed-store prefix for identity profiles; the role is appended.
    #[serde(default = "default_identity_prefix")]
    pub identity_prefix: String,

    /// Shared role accounts accepted by role login.
    #[serde(default = "default_role_accounts")]
    pub role_accounts: Vec<String>,
}

fn default_key_prefix() -> String { "keys:".to_string() }
fn default_modulus_bits() -> usize { MIN_MODULUS_BITS }
fn default_users_key() -> String { "users".to_string() }
fn default_identity_prefix() -> String { "identity:".to_string() }
fn default_role_accounts() -> Vec<String> {
    vec![
        "petugas".to_string(),
        "pemesan".to_string(),
        "admin".to_string(),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            modulus_bits: default_modulus_bits(),
            users_key: default_users_key(),
            identity_prefix: default_identity_prefix(),
            role_accounts: default_role_accounts(),
        }
    }
}

impl Config {
    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.modulus_bits < MIN_MODULUS_BITS {
            return Err(SignError::Config(format!(
                "modulus_bits must be at least {}, got {}",
                MIN_MODULUS_BITS, self.modulus_bits
            )));
        }
        if self.key_prefix.is_empty() {
            return Err(SignError::Config("key_prefix must not be empty".to_string()));
        }
        if self.key_prefix == self.identity_prefix {
            return Err(SignError::Config(
                "key_prefix and identity_prefix must differ".to_string(),
            ));
        }
        Ok(())
    }

    /// Keyed-store slot for a principal's key pair.
    pub fn key_slot(&self, principal: &str) -> String {
        format!("{}{}", self.key_prefix, principal)
    }

    /// Keyed-store slot for a role's identity profile.
    pub fn identity_slot(&self, role: &str) -> String {
        format!("{}{}", self.identity_prefix, role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.key_slot("officer@x.com"), "keys:officer@x.com");
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml_str(
            r#"
key_prefix = "bapsa_keys_"
modulus_bits = 3072
role_accounts = ["petugas"]
"#,
        )
        .unwrap();

        assert_eq!(config.key_slot("admin"), "bapsa_keys_admin");
        assert_eq!(config.modulus_bits, 3072);
        assert_eq!(config.role_accounts, vec!["petugas".to_string()]);
        assert_eq!(config.users_key, "users");
    }

    #[test]
    fn test_weak_modulus_rejected() {
        let result = Config::from_toml_str("modulus_bits = 1024");
        assert!(matches!(result, Err(SignError::Config(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let result = Config::from_toml_str("modulus_bits = \"many\"");
        assert!(matches!(result, Err(SignError::Toml(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bapb.toml");
        std::fs::write(&path, "users_key = \"bapsa_users\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.users_key, "bapsa_users");
    }
}
