//! # Derived Views
//!
//! Client-side projections of a store's current page. [`filter_items`] is the pure matching
//! function; [`FilteredView`] keeps it recomputed whenever either the store's items or the
//! search text change. No backend call is ever made.
//!
//! Matching is a case-insensitive substring test against each item's
//! [`search_fields`](Searchable::search_fields). A missing field never matches.

use crate::store::StoreState;
use std::borrow::Cow;
use tokio::sync::watch;

/// Exposes the fields a text search looks at.
pub trait Searchable {
    fn search_fields(&self) -> Vec<Option<Cow<'_, str>>>;
}

impl Searchable for String {
    fn search_fields(&self) -> Vec<Option<Cow<'_, str>>> {
        vec![Some(Cow::Borrowed(self.as_str()))]
    }
}

/// `true` if any present field contains `needle`, which must already be lower-cased.
pub fn matches<T: Searchable>(item: &T, needle: &str) -> bool {
    item.search_fields()
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(needle))
}

/// Items whose fields contain `text`, ignoring case and surrounding whitespace.
///
/// Blank text returns every item in its original order.
pub fn filter_items<T: Searchable + Clone>(items: &[T], text: &str) -> Vec<T> {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return items.to_vec();
    }
    items
        .iter()
        .filter(|item| matches(*item, &needle))
        .cloned()
        .collect()
}

/// The search text a view filters by.
#[derive(Debug)]
pub struct SearchText(watch::Sender<String>);

impl SearchText {
    pub fn new() -> Self {
        Self(watch::channel(String::new()).0)
    }

    pub fn set(&self, text: impl Into<String>) {
        self.0.send_replace(text.into());
    }

    pub fn get(&self) -> String {
        self.0.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.0.subscribe()
    }
}

impl Default for SearchText {
    fn default() -> Self {
        Self::new()
    }
}

/// A lazily evaluated, always-current search over a store's items.
pub struct FilteredView<T> {
    state: watch::Receiver<StoreState<T>>,
    text: watch::Receiver<String>,
}

impl<T: Searchable + Clone> FilteredView<T> {
    pub fn new(state: watch::Receiver<StoreState<T>>, text: watch::Receiver<String>) -> Self {
        Self { state, text }
    }

    /// The projection for the current items and text.
    pub fn items(&self) -> Vec<T> {
        let text = self.text.borrow().clone();
        filter_items(&self.state.borrow().items, &text)
    }

    /// Waits for either input to change, then returns the new projection.
    ///
    /// Returns `None` once the store or the search text has been dropped.
    pub async fn changed(&mut self) -> Option<Vec<T>> {
        let result = tokio::select! {
            r = self.state.changed() => r,
            r = self.text.changed() => r,
        };
        result.ok()?;
        self.state.mark_unchanged();
        self.text.mark_unchanged();
        Some(self.items())
    }
}
