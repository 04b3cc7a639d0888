//! Backends the clinic stores can talk to without the desktop host.

pub mod memory;

pub use memory::{InMemoryBackend, Table, DEFAULT_LICENSE_EXPIRY};
