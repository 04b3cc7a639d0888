//! # Mock Resource & Testing Guide
//!
//! [`MockResource`] implements [`ResourceApi`] entirely in memory. Queue the responses the
//! backend should give, drive a real [`ResourceStore`](crate::ResourceStore) against it, then
//! inspect the calls the store made.
//!
//! ## Mock vs in-memory backend
//!
//! | Feature | MockResource | RpcResource over a fake transport |
//! |---------|--------------|-----------------------------------|
//! | **Speed** | Instant | Instant |
//! | **Determinism** | Fully scripted | Depends on the fake's data |
//! | **Checks** | Store choreography (pages, messages) | Argument shapes on the wire |
//! | **Error Injection** | `return_err` | Fake must be taught to fail |
//!
//! ## Example
//!
//! ```rust
//! use store_framework::mock::{MockResource, RecordedCall};
//! use store_framework::{
//!     AccountRecord, CredentialResolver, MemoryStorage, PageResponse, ResourceStore,
//! };
//! use std::sync::Arc;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (_live, live_rx) = watch::channel("license".to_string());
//!     let (_account, account_rx) = watch::channel(AccountRecord::default());
//!     let resolver = Arc::new(CredentialResolver::standard(
//!         live_rx,
//!         account_rx,
//!         Arc::new(MemoryStorage::new()),
//!         "license",
//!     ));
//!
//!     let mock = MockResource::<String>::new("Note", "notes");
//!     mock.expect_list().return_ok(PageResponse::single_page(vec!["a".to_string()]));
//!
//!     let store = ResourceStore::new(mock.clone(), resolver);
//!     store.load_page(1).await;
//!
//!     assert_eq!(store.snapshot().items, vec!["a".to_string()]);
//!     assert!(matches!(mock.calls()[0], RecordedCall::List { page: 1, .. }));
//!     mock.verify();
//! }
//! ```
//!
//! An unexpected call, or a call of a different kind than the next queued expectation,
//! panics inside the test.

use crate::credential::Credential;
use crate::error::StoreError;
use crate::page::{PageRequest, PageResponse};
use crate::resource::{ResourceApi, ResourceLabels};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

enum Expectation<T> {
    List(Result<PageResponse<T>, StoreError>),
    Get(Result<T, StoreError>),
    Create(Result<(), StoreError>),
    Update(Result<(), StoreError>),
    Delete(Result<(), StoreError>),
}

impl<T> Expectation<T> {
    fn kind(&self) -> &'static str {
        match self {
            Expectation::List(_) => "list",
            Expectation::Get(_) => "get",
            Expectation::Create(_) => "create",
            Expectation::Update(_) => "update",
            Expectation::Delete(_) => "delete",
        }
    }
}

/// A call the store made, with the credential it supplied.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall<T, F> {
    List {
        page: u32,
        page_size: u32,
        filter: F,
        credential: String,
    },
    Get {
        id: i64,
        credential: String,
    },
    Create {
        payload: T,
        credential: String,
    },
    Update {
        id: i64,
        payload: T,
        credential: String,
    },
    Delete {
        id: i64,
        credential: String,
    },
}

type Queue<T> = Arc<Mutex<VecDeque<Expectation<T>>>>;

/// A scripted resource. `T` doubles as item, create and update payload; ids are `i64`.
pub struct MockResource<T, F = ()> {
    labels: ResourceLabels,
    expectations: Queue<T>,
    calls: Arc<Mutex<Vec<RecordedCall<T, F>>>>,
}

impl<T, F> Clone for MockResource<T, F> {
    fn clone(&self) -> Self {
        Self {
            labels: self.labels,
            expectations: self.expectations.clone(),
            calls: self.calls.clone(),
        }
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T, F> MockResource<T, F>
where
    T: Clone + Debug + Send + Sync + 'static,
    F: Clone + Debug + Default + Send + Sync + 'static,
{
    pub fn new(singular: &'static str, plural: &'static str) -> Self {
        Self {
            labels: ResourceLabels::new(singular, plural),
            expectations: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn expect_list(&self) -> ListExpectationBuilder<T> {
        ListExpectationBuilder {
            expectations: self.expectations.clone(),
        }
    }

    pub fn expect_get(&self) -> GetExpectationBuilder<T> {
        GetExpectationBuilder {
            expectations: self.expectations.clone(),
        }
    }

    pub fn expect_create(&self) -> MutationExpectationBuilder<T> {
        self.mutation(Expectation::Create)
    }

    pub fn expect_update(&self) -> MutationExpectationBuilder<T> {
        self.mutation(Expectation::Update)
    }

    pub fn expect_delete(&self) -> MutationExpectationBuilder<T> {
        self.mutation(Expectation::Delete)
    }

    fn mutation(
        &self,
        wrap: fn(Result<(), StoreError>) -> Expectation<T>,
    ) -> MutationExpectationBuilder<T> {
        MutationExpectationBuilder {
            wrap,
            expectations: self.expectations.clone(),
        }
    }

    /// Every call made so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall<T, F>> {
        lock(&self.calls).clone()
    }

    /// Only the list calls, as `(page, filter)` pairs.
    pub fn list_calls(&self) -> Vec<(u32, F)> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                RecordedCall::List { page, filter, .. } => Some((*page, filter.clone())),
                _ => None,
            })
            .collect()
    }

    /// Panics if queued expectations were never consumed.
    pub fn verify(&self) {
        let remaining = lock(&self.expectations).len();
        if remaining > 0 {
            panic!("Not all expectations were met. {remaining} remaining");
        }
    }

    fn next(&self, call: RecordedCall<T, F>) -> Expectation<T> {
        let called = match &call {
            RecordedCall::List { .. } => "list",
            RecordedCall::Get { .. } => "get",
            RecordedCall::Create { .. } => "create",
            RecordedCall::Update { .. } => "update",
            RecordedCall::Delete { .. } => "delete",
        };
        lock(&self.calls).push(call);
        match lock(&self.expectations).pop_front() {
            Some(expectation) if expectation.kind() == called => expectation,
            Some(expectation) => panic!(
                "Unexpected {called} call, next expectation is {}",
                expectation.kind()
            ),
            None => panic!("Unexpected {called} call, no expectations left"),
        }
    }
}

#[async_trait]
impl<T, F> ResourceApi for MockResource<T, F>
where
    T: Clone + Debug + Send + Sync + 'static,
    F: Clone + Debug + Default + Send + Sync + 'static,
{
    type Item = T;
    type Id = i64;
    type Create = T;
    type Update = T;
    type Filter = F;

    fn labels(&self) -> ResourceLabels {
        self.labels
    }

    async fn list(
        &self,
        page: PageRequest,
        filter: &F,
        credential: &Credential,
    ) -> Result<PageResponse<T>, StoreError> {
        let call = RecordedCall::List {
            page: page.page,
            page_size: page.page_size,
            filter: filter.clone(),
            credential: credential.as_str().to_string(),
        };
        match self.next(call) {
            Expectation::List(response) => response,
            _ => unreachable!("kind checked in next"),
        }
    }

    async fn get(&self, id: i64, credential: &Credential) -> Result<T, StoreError> {
        let call = RecordedCall::Get {
            id,
            credential: credential.as_str().to_string(),
        };
        match self.next(call) {
            Expectation::Get(response) => response,
            _ => unreachable!("kind checked in next"),
        }
    }

    async fn create(&self, payload: T, credential: &Credential) -> Result<(), StoreError> {
        let call = RecordedCall::Create {
            payload,
            credential: credential.as_str().to_string(),
        };
        match self.next(call) {
            Expectation::Create(response) => response,
            _ => unreachable!("kind checked in next"),
        }
    }

    async fn update(&self, id: i64, payload: T, credential: &Credential) -> Result<(), StoreError> {
        let call = RecordedCall::Update {
            id,
            payload,
            credential: credential.as_str().to_string(),
        };
        match self.next(call) {
            Expectation::Update(response) => response,
            _ => unreachable!("kind checked in next"),
        }
    }

    async fn delete(&self, id: i64, credential: &Credential) -> Result<(), StoreError> {
        let call = RecordedCall::Delete {
            id,
            credential: credential.as_str().to_string(),
        };
        match self.next(call) {
            Expectation::Delete(response) => response,
            _ => unreachable!("kind checked in next"),
        }
    }
}

/// Builder for `list` expectations.
pub struct ListExpectationBuilder<T> {
    expectations: Queue<T>,
}

impl<T> ListExpectationBuilder<T> {
    pub fn return_ok(self, response: PageResponse<T>) {
        lock(&self.expectations).push_back(Expectation::List(Ok(response)));
    }

    pub fn return_err(self, error: impl Into<StoreError>) {
        lock(&self.expectations).push_back(Expectation::List(Err(error.into())));
    }
}

/// Builder for `get` expectations.
pub struct GetExpectationBuilder<T> {
    expectations: Queue<T>,
}

impl<T> GetExpectationBuilder<T> {
    pub fn return_ok(self, item: T) {
        lock(&self.expectations).push_back(Expectation::Get(Ok(item)));
    }

    pub fn return_err(self, error: impl Into<StoreError>) {
        lock(&self.expectations).push_back(Expectation::Get(Err(error.into())));
    }
}

/// Builder for `create`, `update` and `delete` expectations.
pub struct MutationExpectationBuilder<T> {
    wrap: fn(Result<(), StoreError>) -> Expectation<T>,
    expectations: Queue<T>,
}

impl<T> MutationExpectationBuilder<T> {
    pub fn return_ok(self) {
        lock(&self.expectations).push_back((self.wrap)(Ok(())));
    }

    pub fn return_err(self, error: impl Into<StoreError>) {
        lock(&self.expectations).push_back((self.wrap)(Err(error.into())));
    }
}
