//! # Credential Resolver
//!
//! Every backend call is gated by an access credential (the license key). The application
//! keeps that credential in more than one place, so resolution walks a layered chain and takes
//! the first non-empty value:
//!
//! 1. the live reactive credential ([`LiveCredential`]),
//! 2. the credential embedded in the account record ([`AccountCredential`]),
//! 3. durable key-value storage ([`DurableCredential`]).
//!
//! Resolution never fails. A source that cannot be read is skipped, and an empty
//! [`Credential`] comes back when every source is empty. Whether that is fatal is the
//! caller's decision ([`CredentialResolver::require`]).
//!
//! Nothing is cached: each call reads the sources again, so a credential change takes effect
//! on the next operation.

use crate::error::StoreError;
use crate::storage::KeyValueStore;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, trace};

/// An opaque access token. `Debug` never prints the token itself.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("len", &self.0.len())
            .finish()
    }
}

/// Which layer of the chain produced a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialOrigin {
    Live,
    Account,
    Durable,
}

/// A source failed to produce a value.
#[derive(Debug, thiserror::Error)]
#[error("credential source unavailable: {0}")]
pub struct SourceError(pub String);

/// One layer of the fallback chain.
pub trait CredentialSource: Send + Sync {
    fn origin(&self) -> CredentialOrigin;

    /// Reads the current value; an empty string means "nothing here".
    fn read(&self) -> Result<String, SourceError>;
}

/// The account record as far as credential resolution is concerned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountRecord {
    pub email: String,
    pub license_key: String,
    pub license_expiry: String,
}

/// Reads the live reactive credential.
pub struct LiveCredential(pub watch::Receiver<String>);

impl CredentialSource for LiveCredential {
    fn origin(&self) -> CredentialOrigin {
        CredentialOrigin::Live
    }

    fn read(&self) -> Result<String, SourceError> {
        Ok(self.0.borrow().clone())
    }
}

/// Reads the credential embedded in the account record.
pub struct AccountCredential(pub watch::Receiver<AccountRecord>);

impl CredentialSource for AccountCredential {
    fn origin(&self) -> CredentialOrigin {
        CredentialOrigin::Account
    }

    fn read(&self) -> Result<String, SourceError> {
        Ok(self.0.borrow().license_key.clone())
    }
}

/// Reads the credential persisted under `key` in durable storage.
pub struct DurableCredential {
    storage: Arc<dyn KeyValueStore>,
    key: String,
}

impl DurableCredential {
    pub fn new(storage: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }
}

impl CredentialSource for DurableCredential {
    fn origin(&self) -> CredentialOrigin {
        CredentialOrigin::Durable
    }

    fn read(&self) -> Result<String, SourceError> {
        self.storage
            .get(&self.key)
            .map(Option::unwrap_or_default)
            .map_err(|e| SourceError(e.to_string()))
    }
}

/// Walks the credential sources in order and returns the first non-empty value.
pub struct CredentialResolver {
    sources: Vec<Box<dyn CredentialSource>>,
}

impl fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let origins: Vec<_> = self.sources.iter().map(|s| s.origin()).collect();
        f.debug_struct("CredentialResolver")
            .field("sources", &origins)
            .finish()
    }
}

impl CredentialResolver {
    pub fn new(sources: Vec<Box<dyn CredentialSource>>) -> Self {
        Self { sources }
    }

    /// The standard three-layer chain: live, account record, durable storage.
    pub fn standard(
        live: watch::Receiver<String>,
        account: watch::Receiver<AccountRecord>,
        storage: Arc<dyn KeyValueStore>,
        storage_key: impl Into<String>,
    ) -> Self {
        Self::new(vec![
            Box::new(LiveCredential(live)),
            Box::new(AccountCredential(account)),
            Box::new(DurableCredential::new(storage, storage_key)),
        ])
    }

    /// The current credential, or an empty one.
    pub fn resolve(&self) -> Credential {
        self.resolve_with_origin()
            .map(|(credential, _)| credential)
            .unwrap_or_default()
    }

    /// The current credential together with the layer that supplied it.
    pub fn resolve_with_origin(&self) -> Option<(Credential, CredentialOrigin)> {
        for source in &self.sources {
            match source.read() {
                Ok(token) if !token.is_empty() => {
                    trace!(origin = ?source.origin(), "Credential resolved");
                    return Some((Credential(token), source.origin()));
                }
                Ok(_) => {}
                Err(e) => debug!(origin = ?source.origin(), error = %e, "Skipping source"),
            }
        }
        None
    }

    /// Like [`resolve`](Self::resolve), but an empty credential is an error.
    pub fn require(&self) -> Result<Credential, StoreError> {
        let credential = self.resolve();
        if credential.is_empty() {
            Err(StoreError::MissingCredential)
        } else {
            Ok(credential)
        }
    }
}
