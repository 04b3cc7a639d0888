//! # ResourceApi Trait
//!
//! The contract a backend resource satisfies so that one generic
//! [`ResourceStore`](crate::ResourceStore) can drive it. A resource is described by four
//! backend-bound functions (`list`, `create`, `update`, `delete`), each taking the resolved
//! credential last, plus the labels used for user-facing messages. Resources that can also
//! fetch a single record by id override [`ResourceApi::get`].
//!
//! Associated types keep the payloads apart: a store over color shades only accepts color
//! shade forms, and the compiler rejects anything else.
//!
//! Backend failures arrive as [`RpcFailure`](crate::gateway::RpcFailure) and become
//! [`StoreError`] through `?`, which applies the gateway's normalization.

use crate::credential::Credential;
use crate::error::StoreError;
use crate::page::{PageRequest, PageResponse};
use async_trait::async_trait;
use std::fmt::{Debug, Display};

/// Human-readable names of a resource, used to build status messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLabels {
    /// Capitalized singular, e.g. `"Color shade"`.
    pub singular: &'static str,
    /// Lower-case plural, e.g. `"color shades"`.
    pub plural: &'static str,
}

impl ResourceLabels {
    pub const fn new(singular: &'static str, plural: &'static str) -> Self {
        Self { singular, plural }
    }

    pub fn created(&self) -> String {
        format!("{} created successfully", self.singular)
    }

    pub fn updated(&self) -> String {
        format!("{} updated successfully", self.singular)
    }

    pub fn deleted(&self) -> String {
        format!("{} deleted successfully", self.singular)
    }
}

/// Backend bindings for one resource type.
#[async_trait]
pub trait ResourceApi: Send + Sync + 'static {
    /// One row of the list.
    type Item: Clone + Debug + Send + Sync + 'static;

    /// The identifier used by `update` and `delete`.
    type Id: Clone + Debug + Display + PartialEq + Send + Sync + 'static;

    /// Payload for `create`.
    type Create: Debug + Send + 'static;

    /// Payload for `update`.
    type Update: Debug + Send + 'static;

    /// Server-side filter sent with every `list` call. Use `()` when there is none.
    type Filter: Clone + Debug + Default + Send + Sync + 'static;

    fn labels(&self) -> ResourceLabels;

    async fn list(
        &self,
        page: PageRequest,
        filter: &Self::Filter,
        credential: &Credential,
    ) -> Result<PageResponse<Self::Item>, StoreError>;

    /// Fetches one record. Unsupported unless overridden.
    async fn get(&self, id: Self::Id, credential: &Credential) -> Result<Self::Item, StoreError> {
        let _ = (id, credential);
        Err(StoreError::Unsupported("Fetching"))
    }

    async fn create(&self, payload: Self::Create, credential: &Credential)
        -> Result<(), StoreError>;

    async fn update(
        &self,
        id: Self::Id,
        payload: Self::Update,
        credential: &Credential,
    ) -> Result<(), StoreError>;

    async fn delete(&self, id: Self::Id, credential: &Credential) -> Result<(), StoreError>;
}
