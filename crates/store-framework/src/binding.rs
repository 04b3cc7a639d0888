//! # Declarative RPC Bindings
//!
//! Most resources differ only in procedure names and argument order. [`RpcResource`] implements
//! [`ResourceApi`] once, driven by a [`ResourceBinding`] table:
//!
//! ```rust,ignore
//! const COLOR_SHADES: ResourceBinding =
//!     ResourceBinding::new(ResourceLabels::new("Color shade", "color shades"), "color_shades")
//!         .list("GetColorShadesPaginated", ListShape::Paged { sends_page_size: true })
//!         .create("CreateColorShade")
//!         .update("UpdateColorShade", UpdateShape::IdThenPayload)
//!         .delete("DeleteColorShade")
//!         .stamped();
//! ```
//!
//! Argument layout, credential always last:
//!
//! | Operation | Arguments |
//! |-----------|-----------|
//! | list, `Unpaged` | `[credential]` |
//! | list, `Paged` | `[page, page_size?, ...filter, credential]` |
//! | get | `[id, credential]` |
//! | create | `[payload, user_id?, credential]` |
//! | update | `[id?, payload or its spread elements, user_id?, credential]` |
//! | delete | `[id, credential]` |
//!
//! `user_id` is present only for `stamped()` bindings.

use crate::credential::Credential;
use crate::error::StoreError;
use crate::gateway::RpcGateway;
use crate::page::{PageRequest, PageResponse};
use crate::resource::{ResourceApi, ResourceLabels};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

/// How a list procedure expects its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListShape {
    /// Everything in one call; the response is usually a bare array.
    Unpaged,
    /// Page number first, then the page size when `sends_page_size`, then filter arguments.
    Paged { sends_page_size: bool },
}

/// How an update procedure expects its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateShape {
    /// The payload already carries the id.
    Payload,
    /// The id, then the payload.
    IdThenPayload,
    /// The payload serializes to an array whose elements are separate arguments.
    Spread,
}

/// Procedure table for one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceBinding {
    pub labels: ResourceLabels,
    pub items_key: &'static str,
    pub list: Option<&'static str>,
    pub list_shape: ListShape,
    pub get: Option<&'static str>,
    pub create: Option<&'static str>,
    pub update: Option<&'static str>,
    pub update_shape: UpdateShape,
    pub delete: Option<&'static str>,
    pub stamp_user: bool,
}

impl ResourceBinding {
    /// A binding with no procedures yet.
    pub const fn new(labels: ResourceLabels, items_key: &'static str) -> Self {
        Self {
            labels,
            items_key,
            list: None,
            list_shape: ListShape::Unpaged,
            get: None,
            create: None,
            update: None,
            update_shape: UpdateShape::Payload,
            delete: None,
            stamp_user: false,
        }
    }

    pub const fn list(mut self, procedure: &'static str, shape: ListShape) -> Self {
        self.list = Some(procedure);
        self.list_shape = shape;
        self
    }

    /// Fetches one record by id.
    pub const fn get(mut self, procedure: &'static str) -> Self {
        self.get = Some(procedure);
        self
    }

    pub const fn create(mut self, procedure: &'static str) -> Self {
        self.create = Some(procedure);
        self
    }

    pub const fn update(mut self, procedure: &'static str, shape: UpdateShape) -> Self {
        self.update = Some(procedure);
        self.update_shape = shape;
        self
    }

    pub const fn delete(mut self, procedure: &'static str) -> Self {
        self.delete = Some(procedure);
        self
    }

    /// Create and update also send the signed-in user's id.
    pub const fn stamped(mut self) -> Self {
        self.stamp_user = true;
        self
    }
}

/// Filter values that travel as positional list arguments.
pub trait RpcArgs {
    fn to_args(&self) -> Result<Vec<Value>, serde_json::Error>;
}

impl RpcArgs for () {
    fn to_args(&self) -> Result<Vec<Value>, serde_json::Error> {
        Ok(Vec::new())
    }
}

/// Supplies the signed-in user's id for stamped operations.
pub trait UserIdProvider: Send + Sync {
    fn user_id(&self) -> Option<i64>;
}

/// A [`ResourceApi`] backed by named RPC procedures.
pub struct RpcResource<I, C, U, F = ()> {
    gateway: RpcGateway,
    binding: ResourceBinding,
    identity: Option<Arc<dyn UserIdProvider>>,
    _types: PhantomData<fn() -> (I, C, U, F)>,
}

impl<I, C, U, F> fmt::Debug for RpcResource<I, C, U, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcResource")
            .field("binding", &self.binding)
            .field("has_identity", &self.identity.is_some())
            .finish()
    }
}

fn encoding(e: serde_json::Error) -> StoreError {
    StoreError::Encoding(e.to_string())
}

fn malformed(e: serde_json::Error) -> StoreError {
    StoreError::MalformedResponse(e.to_string())
}

fn number<N: TryFrom<u64>>(fields: &Map<String, Value>, key: &str) -> Option<N> {
    fields
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| N::try_from(n).ok())
}

impl<I, C, U, F> RpcResource<I, C, U, F>
where
    I: DeserializeOwned,
{
    pub fn new(gateway: RpcGateway, binding: ResourceBinding) -> Self {
        Self {
            gateway,
            binding,
            identity: None,
            _types: PhantomData,
        }
    }

    /// Attaches the source of user ids for stamped bindings.
    pub fn with_identity(mut self, identity: Arc<dyn UserIdProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn binding(&self) -> &ResourceBinding {
        &self.binding
    }

    fn procedure(
        &self,
        bound: Option<&'static str>,
        operation: &'static str,
    ) -> Result<&'static str, StoreError> {
        bound.ok_or(StoreError::Unsupported(operation))
    }

    fn stamp(&self, args: &mut Vec<Value>) -> Result<(), StoreError> {
        if !self.binding.stamp_user {
            return Ok(());
        }
        let user_id = self
            .identity
            .as_ref()
            .and_then(|identity| identity.user_id())
            .ok_or(StoreError::NotAuthenticated)?;
        args.push(Value::from(user_id));
        Ok(())
    }

    /// Interprets a list result. Unusable shapes become an empty page.
    fn decode_list(&self, value: Value) -> PageResponse<I> {
        match self.try_decode_list(value) {
            Ok(page) => page,
            Err(e) => {
                warn!(
                    resource = self.binding.labels.plural,
                    error = %e,
                    "Substituting an empty page"
                );
                PageResponse::default()
            }
        }
    }

    fn try_decode_list(&self, value: Value) -> Result<PageResponse<I>, StoreError> {
        match value {
            Value::Array(_) => Ok(PageResponse::single_page(
                serde_json::from_value(value).map_err(malformed)?,
            )),
            Value::Object(mut fields) => {
                let items = match fields.remove(self.binding.items_key) {
                    None => {
                        return Err(StoreError::MalformedResponse(format!(
                            "missing `{}`",
                            self.binding.items_key
                        )))
                    }
                    Some(Value::Null) => Vec::new(),
                    Some(items) => serde_json::from_value(items).map_err(malformed)?,
                };
                Ok(PageResponse {
                    items,
                    current_page: number(&fields, "current_page"),
                    total_pages: number(&fields, "total_pages"),
                    total_count: number(&fields, "total_count"),
                    page_size: number(&fields, "page_size"),
                })
            }
            Value::Null => Ok(PageResponse::single_page(Vec::new())),
            other => Err(StoreError::MalformedResponse(format!(
                "expected an object or an array, got {other}"
            ))),
        }
    }
}

#[async_trait]
impl<I, C, U, F> ResourceApi for RpcResource<I, C, U, F>
where
    I: DeserializeOwned + Clone + Debug + Send + Sync + 'static,
    C: Serialize + Debug + Send + 'static,
    U: Serialize + Debug + Send + 'static,
    F: RpcArgs + Clone + Debug + Default + Send + Sync + 'static,
{
    type Item = I;
    type Id = i64;
    type Create = C;
    type Update = U;
    type Filter = F;

    fn labels(&self) -> ResourceLabels {
        self.binding.labels
    }

    async fn list(
        &self,
        page: PageRequest,
        filter: &F,
        credential: &Credential,
    ) -> Result<PageResponse<I>, StoreError> {
        let procedure = self.procedure(self.binding.list, "Listing")?;
        let args = match self.binding.list_shape {
            ListShape::Unpaged => Vec::new(),
            ListShape::Paged { sends_page_size } => {
                let mut args = vec![Value::from(page.page)];
                if sends_page_size {
                    args.push(Value::from(page.page_size));
                }
                args.extend(filter.to_args().map_err(encoding)?);
                args
            }
        };
        let value = self.gateway.call(procedure, args, credential).await?;
        let response = self.decode_list(value);
        debug!(procedure, items = response.items.len(), "List decoded");
        Ok(response)
    }

    async fn get(&self, id: i64, credential: &Credential) -> Result<I, StoreError> {
        let procedure = self.procedure(self.binding.get, "Fetching")?;
        let value = self
            .gateway
            .call(procedure, vec![Value::from(id)], credential)
            .await?;
        if value.is_null() {
            return Err(StoreError::MalformedResponse(format!("no record for id {id}")));
        }
        serde_json::from_value(value).map_err(malformed)
    }

    async fn create(&self, payload: C, credential: &Credential) -> Result<(), StoreError> {
        let procedure = self.procedure(self.binding.create, "Creating")?;
        let mut args = vec![serde_json::to_value(&payload).map_err(encoding)?];
        self.stamp(&mut args)?;
        self.gateway.call(procedure, args, credential).await?;
        Ok(())
    }

    async fn update(&self, id: i64, payload: U, credential: &Credential) -> Result<(), StoreError> {
        let procedure = self.procedure(self.binding.update, "Updating")?;
        let payload = serde_json::to_value(&payload).map_err(encoding)?;
        let mut args = match (self.binding.update_shape, payload) {
            (UpdateShape::Payload, payload) => vec![payload],
            (UpdateShape::IdThenPayload, payload) => vec![Value::from(id), payload],
            (UpdateShape::Spread, Value::Array(elements)) => elements,
            (UpdateShape::Spread, other) => vec![other],
        };
        self.stamp(&mut args)?;
        self.gateway.call(procedure, args, credential).await?;
        Ok(())
    }

    async fn delete(&self, id: i64, credential: &Credential) -> Result<(), StoreError> {
        let procedure = self.procedure(self.binding.delete, "Deleting")?;
        self.gateway
            .call(procedure, vec![Value::from(id)], credential)
            .await?;
        Ok(())
    }
}
