//! Wiring of the clinic's stores.
//!
//! - [`ClinicStores`] builds one store per resource over a shared gateway, license manager
//!   and configuration
//! - the generated `<Name>Api` / `<Name>Store` aliases name each concrete store type

pub mod clinic_stores;

pub use clinic_stores::*;
