//! Accounts, sessions and the principal used for signing.
//!
//! Every way of establishing a principal (registration, account login, role
//! login, the identity form) ensures that principal's keys before it
//! succeeds. Passwords only decide who the principal is; they never reach a
//! hashed payload or a signature.

use crate::error::{Result, SignError};
use crate::keys::KeyStore;
use crate::store::KeyValueStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Role given to accounts registered without one.
pub const DEFAULT_ROLE: &str = "petugas";

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub email: String,
    pub password_hash: String,
    pub role: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// The authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Key store lookup key for this session's signatures.
    pub principal: String,
    pub role: String,
}

/// Identity details filled in per role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProfile {
    pub role: String,
    pub name: String,
    pub email: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

/// Binds sessions to principals and provisions their signing keys.
pub struct IdentityService<S: KeyValueStore> {
    keys: KeyStore<S>,
    session: RwLock<Option<Session>>,
}

impl<S: KeyValueStore> IdentityService<S> {
    /// Accounts and profiles share the key store's backend and config.
    pub fn new(keys: KeyStore<S>) -> Self {
        Self {
            keys,
            session: RwLock::new(None),
        }
    }

    pub fn keys(&self) -> &KeyStore<S> {
        &self.keys
    }

    /// Register a new account and provision its keys.
    ///
    /// Nothing is stored if key provisioning fails.
    pub async fn register(&self, email: &str, password: &str, role: Option<&str>) -> Result<()> {
        if email.is_empty() {
            return Err(SignError::InvalidIdentity("email is required".to_string()));
        }
        let mut accounts = self.load_accounts().await?;
        if accounts.iter().any(|a| a.email == email) {
            return Err(SignError::AccountExists(email.to_string()));
        }

        self.keys.ensure_keys(email).await?;

        let role = role.filter(|r| !r.is_empty()).unwrap_or(DEFAULT_ROLE);
        accounts.push(Account {
            email: email.to_string(),
            password_hash: password_hash(password),
            role: role.to_string(),
            created_at: Utc::now(),
        });
        self.save_accounts(&accounts).await?;
        info!(email, role, "account registered");
        Ok(())
    }

    /// Log in to a registered account.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let accounts = self.load_accounts().await?;
        let account = accounts
            .iter()
            .find(|a| a.email == email)
            .ok_or_else(|| SignError::AccountNotFound(email.to_string()))?;
        if account.password_hash != password_hash(password) {
            warn!(email, "login rejected");
            return Err(SignError::WrongPassword);
        }

        self.keys.ensure_keys(email).await?;
        let session = Session {
            principal: account.email.clone(),
            role: account.role.clone(),
        };
        self.open(session.clone()).await;
        Ok(session)
    }

    /// Log in to one of the shared role accounts.
    ///
    /// The role is matched case-insensitively; its password is the role name.
    pub async fn login_role(&self, role: &str, password: &str) -> Result<Session> {
        let role = role.trim().to_lowercase();
        if !self.keys.config().role_accounts.contains(&role) {
            return Err(SignError::InvalidRole(role));
        }
        if password.trim() != role {
            warn!(role = %role, "role login rejected");
            return Err(SignError::WrongPassword);
        }

        self.keys.ensure_keys(&role).await?;
        let session = Session {
            principal: role.clone(),
            role,
        };
        self.open(session.clone()).await;
        Ok(session)
    }

    /// Store the identity form for `role` and provision keys for its email.
    ///
    /// Requires an active session.
    pub async fn submit_identity(
        &self,
        role: &str,
        name: &str,
        email: &str,
    ) -> Result<IdentityProfile> {
        self.principal().await?;

        let (role, name, email) = (role.trim(), name.trim(), email.trim());
        if role.is_empty() || name.is_empty() || email.is_empty() {
            return Err(SignError::InvalidIdentity(
                "role, name and email are required".to_string(),
            ));
        }
        if !is_valid_email(email) {
            return Err(SignError::InvalidIdentity(format!(
                "invalid email: {}",
                email
            )));
        }

        self.keys.ensure_keys(email).await?;

        let profile = IdentityProfile {
            role: role.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            updated_at: Utc::now(),
        };
        let slot = self.keys.config().identity_slot(role);
        self.keys
            .backend()
            .set(&slot, serde_json::to_string(&profile)?)
            .await?;
        info!(role, email, "identity saved");
        Ok(profile)
    }

    /// The identity form last saved for `role`.
    pub async fn identity(&self, role: &str) -> Result<Option<IdentityProfile>> {
        let slot = self.keys.config().identity_slot(role);
        match self.keys.backend().get(&slot).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// The active session, if any.
    pub async fn current(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// The principal of the active session.
    pub async fn principal(&self) -> Result<String> {
        self.current()
            .await
            .map(|s| s.principal)
            .ok_or(SignError::NotAuthenticated)
    }

    /// End the active session.
    pub async fn logout(&self) {
        if let Some(session) = self.session.write().await.take() {
            debug!(principal = %session.principal, "logged out");
        }
    }

    async fn open(&self, session: Session) {
        info!(principal = %session.principal, role = %session.role, "session opened");
        *self.session.write().await = Some(session);
    }

    async fn load_accounts(&self) -> Result<Vec<Account>> {
        let key = &self.keys.config().users_key;
        match self.keys.backend().get(key).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    async fn save_accounts(&self, accounts: &[Account]) -> Result<()> {
        let key = &self.keys.config().users_key;
        self.keys
            .backend()
            .set(key, serde_json::to_string(accounts)?)
            .await
    }
}

fn password_hash(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Loose `local@domain.tld` shape check.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !local.is_empty() && !host.is_empty() && !tld.is_empty()
}
