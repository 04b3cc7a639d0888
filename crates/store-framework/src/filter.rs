//! # Filter Controller
//!
//! Resources with server-side composite filtering use the same [`ResourceStore`] engine; their
//! `Filter` type implements [`CompositeFilter`], which unlocks `apply_filters`,
//! `remove_filter` and `clear_all_filters`.
//!
//! Every filter change resets pagination: the reload always targets page 1, whatever page was
//! on display. The filter itself is a complete value, so whatever shape its serialization
//! produces is sent on every `list` call.

use crate::resource::ResourceApi;
use crate::store::ResourceStore;
use std::fmt::Debug;
use tracing::{info, instrument};

/// A filter made of named criteria that can be removed one at a time.
pub trait CompositeFilter: Clone + Debug + Default + Send + Sync + 'static {
    /// Names one criterion (a scalar field, a range, a multi-valued field).
    type Kind: Copy + Debug + Send + Sync;

    /// An element of a multi-valued criterion.
    type Value: Debug + Send + Sync;

    /// Removes one criterion.
    ///
    /// For a multi-valued kind, `Some(value)` removes only that element and `None` clears the
    /// whole field. A range kind clears both of its ends. `value` is ignored for scalar kinds.
    fn remove(&mut self, kind: Self::Kind, value: Option<&Self::Value>);

    /// `true` when no criterion is set.
    fn is_empty(&self) -> bool;
}

impl<A> ResourceStore<A>
where
    A: ResourceApi,
    A::Filter: CompositeFilter,
{
    /// Replaces the filter wholesale and reloads page 1.
    #[instrument(skip(self), fields(resource = self.labels().plural))]
    pub async fn apply_filters(&self, filter: A::Filter) {
        info!("Applying filters");
        self.filter.send_replace(filter);
        self.load_page(1).await;
    }

    /// Removes one criterion and reloads page 1.
    #[instrument(skip(self, value), fields(resource = self.labels().plural))]
    pub async fn remove_filter(
        &self,
        kind: <A::Filter as CompositeFilter>::Kind,
        value: Option<<A::Filter as CompositeFilter>::Value>,
    ) {
        self.filter.send_modify(|filter| filter.remove(kind, value.as_ref()));
        info!(remaining_empty = self.filter.borrow().is_empty(), "Filter removed");
        self.load_page(1).await;
    }

    /// Drops every criterion and reloads page 1.
    pub async fn clear_all_filters(&self) {
        self.filter.send_replace(A::Filter::default());
        self.load_page(1).await;
    }

    /// Observes filter changes, e.g. to render active filter chips.
    pub fn subscribe_filter(&self) -> tokio::sync::watch::Receiver<A::Filter> {
        self.filter.subscribe()
    }
}
