//! # Resource Store Engine
//!
//! [`ResourceStore`] is the reactive state container for one resource. It owns a
//! [`StoreState`] published through a `tokio::sync::watch` channel, so any number of observers
//! can [`subscribe`](ResourceStore::subscribe) while the engine stays the only writer.
//!
//! ## Operations
//!
//! * **`load_page(page)`**
//!     1. Marks the store loading and clears `error`/`success`.
//!     2. Resolves the credential. An empty one publishes the credential-required error and
//!        leaves the items alone.
//!     3. Calls `list`. Success replaces items and pagination in one update (defaults applied
//!        to omitted fields); failure clears the items, resets pagination to the first page and
//!        publishes the normalized error.
//!     4. Clears `loading` on every path.
//!
//! * **`create` / `update` / `delete`**
//!     1. Remember the page the user is looking at.
//!     2. Resolve the credential and call the backend.
//!     3. On success reload *that* page, then publish the success message. On failure publish
//!        the error and keep the current items.
//!
//! * **`refresh()`** reloads the current page.
//!
//! * **`load_item(id)`** fetches one record into [`ResourceStore::selected`] without touching
//!   the list. A successful `update` of the selected record fetches it again.
//!
//! ## Concurrency
//!
//! Operations take `&self` and may overlap freely. There is no queue and no cancellation:
//! a superseded load still applies its result, so the last response to arrive wins. A generation
//! counter only makes such overlaps visible in the logs.
//!
//! `loading` counts operations in flight and only drops back to `false` when the last one
//! finishes. There are no timeouts, so a backend call that never returns keeps it `true`.
//!
//! ```rust,ignore
//! let store = ResourceStore::new(color_shades_api, resolver).with_page_size(10);
//! let mut updates = store.subscribe();
//!
//! store.load_page(1).await;
//! assert!(!updates.borrow_and_update().loading);
//! ```

use crate::credential::{Credential, CredentialResolver};
use crate::error::StoreError;
use crate::page::{PageRequest, Pagination, DEFAULT_PAGE_SIZE};
use crate::resource::{ResourceApi, ResourceLabels};
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// Everything a presentation layer needs to render one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreState<T> {
    pub items: Vec<T>,
    pub loading: bool,
    pub error: Option<String>,
    pub success: Option<String>,
    pub page: Pagination,
}

impl<T> StoreState<T> {
    pub fn empty(page_size: u32) -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            error: None,
            success: None,
            page: Pagination::first(page_size),
        }
    }
}

impl<T> Default for StoreState<T> {
    fn default() -> Self {
        Self::empty(DEFAULT_PAGE_SIZE)
    }
}

/// A record fetched by id, kept apart from the list.
#[derive(Debug, Clone, PartialEq)]
pub struct Selected<I, T> {
    pub id: I,
    pub item: T,
}

/// Generic paginated CRUD orchestration for one resource.
pub struct ResourceStore<A: ResourceApi> {
    api: A,
    labels: ResourceLabels,
    credentials: Arc<CredentialResolver>,
    default_page_size: u32,
    pub(crate) state: watch::Sender<StoreState<A::Item>>,
    pub(crate) filter: watch::Sender<A::Filter>,
    selected: watch::Sender<Option<Selected<A::Id, A::Item>>>,
    generation: AtomicU64,
    in_flight: AtomicUsize,
}

impl<A: ResourceApi> ResourceStore<A> {
    pub fn new(api: A, credentials: Arc<CredentialResolver>) -> Self {
        let labels = api.labels();
        let (state, _) = watch::channel(StoreState::empty(DEFAULT_PAGE_SIZE));
        let (filter, _) = watch::channel(A::Filter::default());
        Self {
            api,
            labels,
            credentials,
            default_page_size: DEFAULT_PAGE_SIZE,
            state,
            filter,
            selected: watch::channel(None).0,
            generation: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Sets the page size requested until the backend reports a different one.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.default_page_size = page_size.max(1);
        self.state
            .send_modify(|s| s.page.page_size = self.default_page_size);
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn labels(&self) -> ResourceLabels {
        self.labels
    }

    /// A receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<StoreState<A::Item>> {
        self.state.subscribe()
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> StoreState<A::Item> {
        self.state.borrow().clone()
    }

    pub fn current_page(&self) -> u32 {
        self.state.borrow().page.current
    }

    /// The filter that will accompany the next `list` call.
    pub fn current_filter(&self) -> A::Filter {
        self.filter.borrow().clone()
    }

    /// Changes the page size used by the next list request.
    pub fn set_page_size(&self, page_size: u32) {
        let page_size = page_size.max(1);
        self.state.send_modify(|s| s.page.page_size = page_size);
    }

    /// Drops the current error and success messages.
    pub fn clear_messages(&self) {
        self.state.send_modify(|s| {
            s.error = None;
            s.success = None;
        });
    }

    /// Back to the freshly constructed state, e.g. after the credential was lost.
    pub fn reset(&self) {
        debug!(resource = self.labels.plural, "Resetting store");
        self.state
            .send_replace(StoreState::empty(self.default_page_size));
        self.selected.send_replace(None);
    }

    /// The record last fetched with [`load_item`](Self::load_item).
    pub fn selected(&self) -> Option<A::Item> {
        self.selected.borrow().as_ref().map(|s| s.item.clone())
    }

    pub fn subscribe_selected(&self) -> watch::Receiver<Option<Selected<A::Id, A::Item>>> {
        self.selected.subscribe()
    }

    /// Fetches one record and selects it. Failures are published like load failures but
    /// leave the list and the previous selection alone.
    #[instrument(skip(self), fields(resource = self.labels.plural))]
    pub async fn load_item(&self, id: A::Id) -> Option<A::Item> {
        self.begin();
        let outcome = match self.credentials.require() {
            Ok(credential) => self.api.get(id.clone(), &credential).await,
            Err(e) => Err(e),
        };
        let item = match outcome {
            Ok(item) => {
                debug!("Record selected");
                self.selected.send_replace(Some(Selected {
                    id,
                    item: item.clone(),
                }));
                Some(item)
            }
            Err(e) => {
                warn!(error = %e, "Could not fetch record");
                self.publish_error(&e);
                None
            }
        };
        self.finish();
        item
    }

    /// Loads `page` (0 is treated as 1).
    #[instrument(skip(self), fields(resource = self.labels.plural))]
    pub async fn load_page(&self, page: u32) {
        let page = page.max(1);
        self.begin();
        // The outcome is already published on the state.
        let _ = self.reload(page).await;
        self.finish();
    }

    /// Reloads the page currently on display.
    pub async fn refresh(&self) {
        self.load_page(self.current_page()).await;
    }

    /// Creates a record and reloads the visible page. Returns whether the backend accepted it.
    #[instrument(skip_all, fields(resource = self.labels.plural))]
    pub async fn create(&self, payload: A::Create) -> bool {
        let message = self.labels.created();
        self.mutate("create", message, |credential| async move {
            self.api.create(payload, &credential).await
        })
        .await
    }

    /// Updates a record and reloads the visible page.
    #[instrument(skip_all, fields(resource = self.labels.plural, id = %id))]
    pub async fn update(&self, id: A::Id, payload: A::Update) -> bool {
        let message = self.labels.updated();
        let target = id.clone();
        let accepted = self
            .mutate("update", message, |credential| async move {
                self.api.update(id, payload, &credential).await
            })
            .await;
        if accepted {
            self.refresh_selected(target).await;
        }
        accepted
    }

    /// Fetches the selected record again if it is `id`. A failure keeps the stale copy.
    async fn refresh_selected(&self, id: A::Id) {
        let is_selected = self.selected.borrow().as_ref().is_some_and(|s| s.id == id);
        if !is_selected {
            return;
        }
        let Ok(credential) = self.credentials.require() else {
            return;
        };
        match self.api.get(id.clone(), &credential).await {
            Ok(item) => {
                self.selected.send_replace(Some(Selected { id, item }));
            }
            Err(e) => warn!(error = %e, "Selected record not refreshed"),
        }
    }

    /// Deletes a record and reloads the visible page.
    #[instrument(skip_all, fields(resource = self.labels.plural, id = %id))]
    pub async fn delete(&self, id: A::Id) -> bool {
        let message = self.labels.deleted();
        self.mutate("delete", message, |credential| async move {
            self.api.delete(id, &credential).await
        })
        .await
    }

    async fn mutate<F, Fut>(&self, action: &'static str, success: String, call: F) -> bool
    where
        F: FnOnce(Credential) -> Fut,
        Fut: Future<Output = Result<(), StoreError>>,
    {
        let page = self.current_page();
        self.begin();

        let outcome = match self.credentials.require() {
            Ok(credential) => call(credential).await,
            Err(e) => Err(e),
        };

        let accepted = match outcome {
            Ok(()) => {
                info!(action, page, "Accepted, reloading visible page");
                if self.reload(page).await.is_ok() {
                    self.state.send_modify(|s| s.success = Some(success));
                }
                true
            }
            Err(e) => {
                warn!(action, error = %e, "Rejected");
                self.publish_error(&e);
                false
            }
        };

        self.finish();
        accepted
    }

    /// Fetches `page` and publishes the result. Does not touch `loading`.
    pub(crate) async fn reload(&self, page: u32) -> Result<(), StoreError> {
        let credential = match self.credentials.require() {
            Ok(credential) => credential,
            Err(e) => {
                warn!(page, error = %e, "No credential, load skipped");
                self.publish_error(&e);
                return Err(e);
            }
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let request = PageRequest::new(page, self.state.borrow().page.page_size);
        let filter = self.filter.borrow().clone();
        debug!(page = request.page, page_size = request.page_size, ?filter, "Listing");

        match self.api.list(request, &filter, &credential).await {
            Ok(response) => {
                if self.generation.load(Ordering::SeqCst) != generation {
                    debug!(page, "A newer load started meanwhile; applying anyway");
                }
                let (items, pagination) = response.into_parts(request.page_size);
                info!(
                    page = pagination.current,
                    total_pages = pagination.total_pages,
                    items = items.len(),
                    "Page loaded"
                );
                self.state.send_modify(|s| {
                    s.items = items;
                    s.page = pagination;
                });
                Ok(())
            }
            Err(e) => {
                warn!(page, error = %e, "Page load failed");
                self.state.send_modify(|s| {
                    s.items.clear();
                    s.page = Pagination::first(request.page_size);
                    s.error = Some(e.to_string());
                    s.success = None;
                });
                Err(e)
            }
        }
    }

    fn begin(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|s| {
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

    fn publish_error(&self, error: &StoreError) {
        let message = error.to_string();
        self.state.send_modify(|s| {
            s.error = Some(message);
            s.success = None;
        });
    }
}
