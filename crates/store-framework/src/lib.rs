//! # Store Framework
//!
//! Building blocks for licensed, paginated, reactive resource stores. A desktop client usually
//! wraps each backend resource (patients, invoices, lab orders, ...) in its own little state
//! container, and every one of them repeats the same choreography:
//!
//! 1. resolve the access credential,
//! 2. call a remote procedure with the credential as the last argument,
//! 3. turn success or failure into observable state,
//! 4. after a mutation, reload the page the user is looking at.
//!
//! This crate implements that choreography once, as [`ResourceStore<A>`], parameterized by a
//! [`ResourceApi`] that supplies the four backend-bound functions.
//!
//! ## Architecture Overview
//!
//! Leaves first:
//!
//! 1. **Credential Resolver** ([`CredentialResolver`]) - first non-empty credential from a
//!    layered chain (live value, account record, durable storage).
//! 2. **RPC Gateway** ([`RpcGateway`]) - appends the credential and normalizes any backend
//!    failure into one message ([`normalize_error`]).
//! 3. **Resource Store Engine** ([`ResourceStore`]) - loading/error/success/items/pagination
//!    state and the reload-after-mutation protocol.
//! 4. **Derived Views** ([`view`]) - client-side text search over the current page.
//! 5. **Filter Controller** ([`filter`]) - composite server-side filters that always reset
//!    pagination.
//!
//! [`RpcResource`] connects a store to named backend procedures declaratively, so most
//! resources need nothing but a [`ResourceBinding`] table. Answers that are not lists live in
//! a [`RecordStore`].
//!
//! ## Observable State
//!
//! ```rust,ignore
//! let mut state = store.subscribe();
//! store.load_page(2).await;
//!
//! let current = state.borrow_and_update();
//! if let Some(error) = &current.error {
//!     show_banner(error);
//! }
//! render(&current.items, current.page);
//! ```
//!
//! No error ever crosses the store boundary. Operations return `()` (loads) or a `bool`
//! (mutations) and publish the details on the state.
//!
//! ## Concurrency Model
//!
//! Operations take `&self` and may run concurrently against the same store. There is no
//! operation queue and no cancellation; on overlapping loads the last response applied wins.
//! No timeouts are imposed either: a backend that never answers leaves `loading` set.
//!
//! ## Testing
//!
//! [`mock::MockResource`] scripts backend responses and records every call, so store
//! behavior can be asserted without any transport. See the [`mock`] module.

pub mod binding;
pub mod credential;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod mock;
pub mod page;
pub mod record;
pub mod resource;
pub mod storage;
pub mod store;
pub mod telemetry;
pub mod view;

pub use binding::{ListShape, ResourceBinding, RpcArgs, RpcResource, UpdateShape, UserIdProvider};
pub use credential::{
    AccountRecord, Credential, CredentialOrigin, CredentialResolver, CredentialSource,
};
pub use error::StoreError;
pub use filter::CompositeFilter;
pub use gateway::{normalize_error, RpcFailure, RpcGateway, RpcTransport};
pub use page::{PageRequest, PageResponse, Pagination, DEFAULT_PAGE_SIZE};
pub use record::{LicensedCaller, RecordState, RecordStore};
pub use resource::{ResourceApi, ResourceLabels};
pub use storage::{JsonFileStorage, KeyValueStore, MemoryStorage, StorageError};
pub use store::{ResourceStore, Selected, StoreState};
pub use view::{filter_items, FilteredView, SearchText, Searchable};
