//! # License & Identity
//!
//! [`LicenseManager`] owns the three places the license key lives:
//!
//! - the live key used for backend calls,
//! - the account record shown on the settings screen,
//! - durable storage, so the key survives restarts.
//!
//! [`LicenseManager::validate`] asks the backend whether the key is still good and publishes
//! the verdict as a [`LicenseStatus`].
//!
//! It also remembers the signed-in user, whose id some procedures require. Every store
//! resolves its credential through [`LicenseManager::resolver`], which reads the current
//! values on each call, so setting or clearing the license takes effect on the next
//! operation without touching the stores.

use crate::bindings;
use crate::model::User;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use store_framework::{
    AccountRecord, Credential, CredentialResolver, KeyValueStore, RpcGateway, StorageError,
    StoreError, UserIdProvider,
};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

pub const LICENSE_KEY: &str = "dentist_license_key";
pub const LICENSE_EXPIRY: &str = "dentist_license_expiry";
pub const SESSION_TOKEN: &str = "dentist_session_token";
pub const USER_ID: &str = "dentist_user_id";
pub const USERNAME: &str = "dentist_username";
pub const USER_ROLE: &str = "dentist_user_role";

/// The backend's verdict on a license key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseInfo {
    pub is_valid: bool,
    pub expiry_date: String,
    pub message: String,
}

/// Outcome of the last validation, for the settings screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LicenseStatus {
    pub is_valid: bool,
    pub checking: bool,
    pub message: String,
}

pub struct LicenseManager {
    live: watch::Sender<String>,
    account: watch::Sender<AccountRecord>,
    user: watch::Sender<Option<User>>,
    status: watch::Sender<LicenseStatus>,
    storage: Arc<dyn KeyValueStore>,
}

impl LicenseManager {
    /// Starts from whatever license is persisted in `storage`.
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let stored = |key: &str| match storage.get(key) {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                warn!(key, error = %e, "Could not read persisted value");
                String::new()
            }
        };
        let license_key = stored(LICENSE_KEY);
        let license_expiry = stored(LICENSE_EXPIRY);
        debug!(has_license = !license_key.is_empty(), "License manager initialized");

        Self {
            live: watch::channel(license_key.clone()).0,
            account: watch::channel(AccountRecord {
                email: String::new(),
                license_key,
                license_expiry,
            })
            .0,
            user: watch::channel(None).0,
            status: watch::channel(LicenseStatus::default()).0,
            storage,
        }
    }

    /// The standard live → account → storage resolver over this manager's state.
    pub fn resolver(&self) -> CredentialResolver {
        CredentialResolver::standard(
            self.live.subscribe(),
            self.account.subscribe(),
            self.storage.clone(),
            LICENSE_KEY,
        )
    }

    pub fn account(&self) -> AccountRecord {
        self.account.borrow().clone()
    }

    pub fn subscribe_account(&self) -> watch::Receiver<AccountRecord> {
        self.account.subscribe()
    }

    pub fn has_license(&self) -> bool {
        !self.resolver().resolve().is_empty()
    }

    /// Installs a license key everywhere. A `None` expiry keeps the previous one.
    pub fn set_license(&self, key: &str, expiry: Option<&str>) -> Result<(), StorageError> {
        self.account.send_modify(|account| {
            account.license_key = key.to_string();
            if let Some(expiry) = expiry {
                account.license_expiry = expiry.to_string();
            }
        });
        self.live.send_replace(key.to_string());
        self.storage.set(LICENSE_KEY, key)?;
        if let Some(expiry) = expiry {
            self.storage.set(LICENSE_EXPIRY, expiry)?;
        }
        info!("License installed");
        Ok(())
    }

    /// Forgets the license key and its expiry.
    ///
    /// Storage is cleared first; if that fails the live key and the account record are left
    /// as they were, so the resolver never falls back to a key that was meant to be gone.
    pub fn clear_license(&self) -> Result<(), StorageError> {
        self.storage.remove(LICENSE_KEY)?;
        self.storage.remove(LICENSE_EXPIRY)?;
        self.account.send_modify(|account| {
            account.license_key.clear();
            account.license_expiry.clear();
        });
        self.live.send_replace(String::new());
        info!("License cleared");
        Ok(())
    }

    pub fn status(&self) -> LicenseStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<LicenseStatus> {
        self.status.subscribe()
    }

    /// Asks the backend whether the account's key is valid.
    ///
    /// Returns the verdict when the backend gave one and the call error otherwise; either way
    /// the outcome is published on [`status`](Self::status). A valid key becomes the live key
    /// and its expiry is refreshed. Nothing is cleared here.
    #[instrument(skip_all)]
    pub async fn validate(&self, gateway: &RpcGateway) -> Result<bool, StoreError> {
        let key = self.account.borrow().license_key.clone();
        if key.is_empty() {
            self.status.send_replace(LicenseStatus {
                is_valid: false,
                checking: false,
                message: "No license key provided".to_string(),
            });
            return Ok(false);
        }

        self.status.send_modify(|status| status.checking = true);
        let info = match gateway
            .call(bindings::VALIDATE_LICENSE, Vec::new(), &Credential::new(key.clone()))
            .await
        {
            Ok(value) => serde_json::from_value::<LicenseInfo>(value)
                .map_err(|e| StoreError::MalformedResponse(e.to_string())),
            Err(failure) => Err(StoreError::from(failure)),
        };

        match info {
            Ok(info) => {
                if info.is_valid {
                    if !info.expiry_date.is_empty() {
                        self.account
                            .send_modify(|account| account.license_expiry = info.expiry_date.clone());
                        if let Err(e) = self.storage.set(LICENSE_EXPIRY, &info.expiry_date) {
                            warn!(error = %e, "Could not persist license expiry");
                        }
                    }
                    self.live.send_replace(key);
                }
                info!(valid = info.is_valid, message = %info.message, "License validated");
                self.status.send_replace(LicenseStatus {
                    is_valid: info.is_valid,
                    checking: false,
                    message: info.message,
                });
                Ok(info.is_valid)
            }
            Err(e) => {
                warn!(error = %e, "License validation failed");
                self.status.send_replace(LicenseStatus {
                    is_valid: false,
                    checking: false,
                    message: format!("Validation error: {e}"),
                });
                Err(e)
            }
        }
    }

    /// Records a successful login.
    pub fn sign_in(&self, user: User, session_token: &str) -> Result<(), StorageError> {
        self.storage.set(SESSION_TOKEN, session_token)?;
        self.storage.set(USER_ID, &user.id.to_string())?;
        self.storage.set(USERNAME, &user.username)?;
        self.storage.set(USER_ROLE, &user.role)?;
        info!(user_id = user.id, username = %user.username, "Signed in");
        self.user.send_replace(Some(user));
        Ok(())
    }

    pub fn sign_out(&self) -> Result<(), StorageError> {
        self.user.send_replace(None);
        for key in [SESSION_TOKEN, USER_ID, USERNAME, USER_ROLE] {
            self.storage.remove(key)?;
        }
        info!("Signed out");
        Ok(())
    }

    /// Rebuilds the signed-in user from storage after a restart.
    ///
    /// Returns `None`, leaving nobody signed in, when no session token or no valid id is
    /// persisted.
    pub fn restore_identity(&self) -> Result<Option<User>, StorageError> {
        if self.storage.get(SESSION_TOKEN)?.unwrap_or_default().is_empty() {
            return Ok(None);
        }
        let Some(id) = self
            .storage
            .get(USER_ID)?
            .and_then(|raw| raw.trim().parse::<i64>().ok())
        else {
            warn!("Persisted session has no usable user id");
            return Ok(None);
        };
        let user = User {
            id,
            username: self.storage.get(USERNAME)?.unwrap_or_default(),
            role: self.storage.get(USER_ROLE)?.unwrap_or_default(),
        };
        debug!(user_id = id, "Identity restored");
        self.user.send_replace(Some(user.clone()));
        Ok(Some(user))
    }

    pub fn current_user(&self) -> Option<User> {
        self.user.borrow().clone()
    }

    pub fn current_user_id(&self) -> Option<i64> {
        self.user.borrow().as_ref().map(|user| user.id)
    }

    pub fn subscribe_user(&self) -> watch::Receiver<Option<User>> {
        self.user.subscribe()
    }
}

impl UserIdProvider for LicenseManager {
    fn user_id(&self) -> Option<i64> {
        self.current_user_id()
    }
}
