//! # Observability & Tracing
//!
//! Every store operation runs inside a span carrying the `resource` field, so a single log
//! line tells you which store it came from:
//!
//! ```text
//! INFO load_page{resource="color shades" page=2}: Page loaded page=2 total_pages=5 items=10
//! WARN delete{resource="work types" id=4}: Rejected action="delete" error=in use
//! ```
//!
//! Credentials never appear in the output.
//!
//! ## Usage
//!
//! ```bash
//! # Defaults to the configured filter ("info")
//! cargo run
//!
//! # Full request shapes, including filter objects
//! RUST_LOG=debug cargo run
//!
//! # Only the engine
//! RUST_LOG=store_framework=debug cargo run
//! ```

use tracing_subscriber::EnvFilter;

/// Installs the `fmt` subscriber filtered by `RUST_LOG`, or `info` when it is unset.
pub fn setup_tracing() {
    setup_tracing_with("info");
}

/// Like [`setup_tracing`], with a custom fallback filter.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn setup_tracing_with(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}
