//! Pure data structures exchanged with the clinic backend.
//!
//! Every list row implements [`Searchable`](store_framework::Searchable) with the fields the
//! client-side search looks at. Rows are deserialized leniently (`#[serde(default)]`) since
//! the backend omits empty columns.

pub mod billing;
pub mod catalog;
pub mod lab;
pub mod patient;
pub mod session;
pub mod user;

pub use billing::*;
pub use catalog::*;
pub use lab::*;
pub use patient::*;
pub use session::*;
pub use user::*;

use std::borrow::Cow;

/// Field helper for `Searchable` impls: empty strings count as missing.
pub(crate) fn text(value: &str) -> Option<Cow<'_, str>> {
    (!value.is_empty()).then_some(Cow::Borrowed(value))
}
