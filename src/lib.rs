//! # Clinic Stores
//!
//! The data-access layer of the dental clinic application.
//!
//! Every screen reads from a [`ResourceStore`](store_framework::ResourceStore): a reactive,
//! paginated list of one kind of backend record that also knows how to create, update and
//! delete them. All backend calls carry the clinic's license key, resolved from the
//! [`LicenseManager`](license::LicenseManager) at call time.
//!
//! ## Module Tour
//!
//! - [`model`]: the records and forms exchanged with the backend.
//! - [`bindings`]: which remote procedure serves which operation of which resource.
//! - [`lifecycle`]: [`ClinicStores`](lifecycle::ClinicStores), every store wired together.
//! - [`invoicing`]: the invoice overview, issuing invoices and taking payments.
//! - [`license`]: license key, its validation and the signed-in user, persisted across
//!   restarts.
//! - [`config`]: TOML configuration (page sizes, storage path, log filter).
//! - [`backend`]: an in-process backend for demos and tests.
//!
//! The generic machinery (store engine, error normalization, credential resolution,
//! filters, search views) lives in the `store-framework` crate.
//!
//! ## Running the Demo
//!
//! ```bash
//! RUST_LOG=info cargo run
//! ```

pub mod backend;
pub mod bindings;
pub mod config;
pub mod invoicing;
pub mod license;
pub mod lifecycle;
pub mod model;
