//! # Single-Record Stores
//!
//! Some screens show one backend answer rather than a page of rows: a dashboard overview, the
//! payment history of one invoice, a preview before confirming. [`RecordStore<T>`] holds such
//! an answer with the same `loading`/`error`/`success` observables as
//! [`ResourceStore`](crate::ResourceStore), and [`LicensedCaller`] makes the credentialed call
//! behind it.
//!
//! ```rust,ignore
//! let overview = RecordStore::new("invoice overview", caller).with_fallback(Overview::default());
//! overview.fetch("GetInvoiceOverview", vec![]).await;
//! render(overview.value());
//! ```
//!
//! A failed fetch replaces the value with the fallback (or nothing). A failed submit keeps the
//! value it had.

use crate::credential::CredentialResolver;
use crate::error::StoreError;
use crate::gateway::RpcGateway;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// Calls one procedure with the resolved credential and decodes the answer.
#[derive(Debug, Clone)]
pub struct LicensedCaller {
    gateway: RpcGateway,
    credentials: Arc<CredentialResolver>,
}

impl LicensedCaller {
    pub fn new(gateway: RpcGateway, credentials: Arc<CredentialResolver>) -> Self {
        Self {
            gateway,
            credentials,
        }
    }

    pub fn gateway(&self) -> &RpcGateway {
        &self.gateway
    }

    /// Fails with [`StoreError::MissingCredential`] before any call when no credential resolves.
    #[instrument(skip(self, args), fields(args = args.len()))]
    pub async fn call<T: DeserializeOwned>(
        &self,
        procedure: &str,
        args: Vec<Value>,
    ) -> Result<T, StoreError> {
        let credential = self.credentials.require()?;
        let value = self.gateway.call(procedure, args, &credential).await?;
        serde_json::from_value(value).map_err(|e| StoreError::MalformedResponse(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordState<T> {
    pub value: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
    pub success: Option<String>,
}

impl<T> Default for RecordState<T> {
    fn default() -> Self {
        Self {
            value: None,
            loading: false,
            error: None,
            success: None,
        }
    }
}

/// Observable holder of one backend answer.
pub struct RecordStore<T> {
    name: &'static str,
    caller: LicensedCaller,
    fallback: Option<T>,
    state: watch::Sender<RecordState<T>>,
    in_flight: AtomicUsize,
}

impl<T> RecordStore<T>
where
    T: DeserializeOwned + Clone + Debug + Send + Sync + 'static,
{
    pub fn new(name: &'static str, caller: LicensedCaller) -> Self {
        Self {
            name,
            caller,
            fallback: None,
            state: watch::channel(RecordState::default()).0,
            in_flight: AtomicUsize::new(0),
        }
    }

    /// The value shown initially, after a reset and after a failed fetch.
    pub fn with_fallback(mut self, fallback: T) -> Self {
        self.state.send_modify(|s| s.value = Some(fallback.clone()));
        self.fallback = Some(fallback);
        self
    }

    pub fn caller(&self) -> &LicensedCaller {
        &self.caller
    }

    pub fn subscribe(&self) -> watch::Receiver<RecordState<T>> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> RecordState<T> {
        self.state.borrow().clone()
    }

    pub fn value(&self) -> Option<T> {
        self.state.borrow().value.clone()
    }

    pub fn clear_messages(&self) {
        self.state.send_modify(|s| {
            s.error = None;
            s.success = None;
        });
    }

    pub fn reset(&self) {
        self.state.send_replace(RecordState {
            value: self.fallback.clone(),
            ..RecordState::default()
        });
    }

    /// Drops the value and reports `message` without calling the backend.
    pub fn reject(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(record = self.name, %message, "Rejected before calling");
        self.state.send_modify(|s| {
            s.value = self.fallback.clone();
            s.error = Some(message);
            s.success = None;
        });
    }

    /// Replaces the value with the backend's answer. A `null` answer clears it.
    #[instrument(skip(self, args), fields(record = self.name))]
    pub async fn fetch(&self, procedure: &str, args: Vec<Value>) -> Option<T> {
        self.begin(true);
        let value = match self.caller.call::<Option<T>>(procedure, args).await {
            Ok(value) => {
                debug!(found = value.is_some(), "Record fetched");
                self.state.send_modify(|s| s.value = value.clone());
                value
            }
            Err(e) => {
                warn!(error = %e, "Fetch failed");
                self.state.send_modify(|s| {
                    s.value = self.fallback.clone();
                    s.error = Some(e.to_string());
                });
                None
            }
        };
        self.finish();
        value
    }

    /// Runs a mutation whose answer is the new value. On failure the value is kept.
    #[instrument(skip(self, args, success), fields(record = self.name))]
    pub async fn submit(
        &self,
        procedure: &str,
        args: Vec<Value>,
        success: &str,
    ) -> Result<T, StoreError> {
        self.begin(false);
        let outcome = self.caller.call::<T>(procedure, args).await;
        match &outcome {
            Ok(value) => {
                info!("Accepted");
                let success = success.to_string();
                self.state.send_modify(|s| {
                    s.value = Some(value.clone());
                    s.success = Some(success);
                });
            }
            Err(e) => {
                warn!(error = %e, "Rejected");
                self.state.send_modify(|s| s.error = Some(e.to_string()));
            }
        }
        self.finish();
        outcome
    }

    fn begin(&self, clear_value: bool) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|s| {
            if clear_value {
                s.value = self.fallback.clone();
            }
            s.loading = true;
            s.error = None;
            s.success = None;
        });
    }

    fn finish(&self) {
        let previous = self
            .in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
            .unwrap_or(0);
        if previous <= 1 {
            self.state.send_modify(|s| s.loading = false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{AccountRecord, CredentialResolver};
    use crate::gateway::{RpcFailure, RpcTransport};
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Clone, Default, PartialEq, Deserialize)]
    struct Totals {
        count: u32,
    }

    #[derive(Default)]
    struct Replies {
        queue: Mutex<VecDeque<Result<Value, RpcFailure>>>,
        seen: Mutex<Vec<(String, Vec<Value>)>>,
    }

    impl Replies {
        fn push(&self, reply: Result<Value, RpcFailure>) {
            self.queue.lock().unwrap().push_back(reply);
        }
    }

    #[async_trait]
    impl RpcTransport for Replies {
        async fn invoke(&self, procedure: &str, args: Vec<Value>) -> Result<Value, RpcFailure> {
            self.seen.lock().unwrap().push((procedure.to_string(), args));
            self.queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(Value::Null))
        }
    }

    fn caller(token: &str) -> (Arc<Replies>, LicensedCaller) {
        let replies = Arc::new(Replies::default());
        let resolver = CredentialResolver::standard(
            watch::channel(token.to_string()).1,
            watch::channel(AccountRecord::default()).1,
            Arc::new(MemoryStorage::new()),
            "license",
        );
        let caller = LicensedCaller::new(RpcGateway::new(replies.clone()), Arc::new(resolver));
        (replies, caller)
    }

    #[tokio::test]
    async fn fetch_appends_credential_and_stores_value() {
        let (replies, caller) = caller("key");
        replies.push(Ok(json!({ "count": 4 })));
        let store = RecordStore::<Totals>::new("totals", caller);

        let value = store.fetch("GetTotals", vec![json!(7)]).await;

        assert_eq!(value, Some(Totals { count: 4 }));
        let state = store.snapshot();
        assert_eq!(state.value, Some(Totals { count: 4 }));
        assert!(!state.loading);
        assert_eq!(state.error, None);
        assert_eq!(
            replies.seen.lock().unwrap()[0],
            ("GetTotals".to_string(), vec![json!(7), json!("key")])
        );
    }

    #[tokio::test]
    async fn failed_fetch_falls_back() {
        let (replies, caller) = caller("key");
        replies.push(Ok(json!({ "count": 4 })));
        replies.push(Err(RpcFailure::text("database locked")));
        let store = RecordStore::new("totals", caller).with_fallback(Totals::default());

        store.fetch("GetTotals", vec![]).await;
        store.fetch("GetTotals", vec![]).await;

        let state = store.snapshot();
        assert_eq!(state.value, Some(Totals::default()));
        assert_eq!(state.error.as_deref(), Some("database locked"));
    }

    #[tokio::test]
    async fn null_answer_clears_value() {
        let (replies, caller) = caller("key");
        replies.push(Ok(json!({ "count": 1 })));
        replies.push(Ok(Value::Null));
        let store = RecordStore::<Totals>::new("totals", caller);

        store.fetch("GetTotals", vec![]).await;
        let value = store.fetch("GetTotals", vec![]).await;

        assert_eq!(value, None);
        assert_eq!(store.snapshot().error, None);
    }

    #[tokio::test]
    async fn missing_credential_never_calls() {
        let (replies, caller) = caller("");
        let store = RecordStore::<Totals>::new("totals", caller);

        assert_eq!(store.fetch("GetTotals", vec![]).await, None);

        assert_eq!(
            store.snapshot().error.as_deref(),
            Some(StoreError::MissingCredential.to_string().as_str())
        );
        assert!(replies.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_submit_keeps_value() {
        let (replies, caller) = caller("key");
        replies.push(Ok(json!({ "count": 2 })));
        replies.push(Err(RpcFailure::text("not allowed")));
        replies.push(Ok(json!({ "count": 3 })));
        let store = RecordStore::<Totals>::new("totals", caller);
        store.fetch("GetTotals", vec![]).await;

        let rejected = store.submit("AddTotal", vec![], "Added").await;
        assert_eq!(rejected, Err(StoreError::BackendRejected("not allowed".into())));
        assert_eq!(store.value(), Some(Totals { count: 2 }));

        let accepted = store.submit("AddTotal", vec![], "Added").await;
        assert_eq!(accepted, Ok(Totals { count: 3 }));
        let state = store.snapshot();
        assert_eq!(state.value, Some(Totals { count: 3 }));
        assert_eq!(state.success.as_deref(), Some("Added"));
    }

    #[test]
    fn reject_and_reset() {
        let (_, caller) = caller("key");
        let store = RecordStore::new("totals", caller).with_fallback(Totals { count: 0 });

        store.reject("Missing id");
        assert_eq!(store.snapshot().error.as_deref(), Some("Missing id"));

        store.reset();
        assert_eq!(store.snapshot(), RecordState {
            value: Some(Totals { count: 0 }),
            ..RecordState::default()
        });
    }
}
