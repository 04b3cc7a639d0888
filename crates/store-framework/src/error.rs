//! # Store Errors
//!
//! Every failure a store operation can run into ends up as one of these variants. None of
//! them escape a [`ResourceStore`](crate::ResourceStore): the engine renders them into the
//! `error` observable and moves on.

/// Errors produced while orchestrating a resource operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No credential could be resolved; the operation stopped before any RPC call.
    #[error("License key required. Please validate your license.")]
    MissingCredential,

    /// The operation needs the signed-in user's id and none is known.
    #[error("User not authenticated. Please log in.")]
    NotAuthenticated,

    /// The backend completed the call but reported a failure (already normalized).
    #[error("{0}")]
    BackendRejected(String),

    /// The backend answered with a shape the engine cannot interpret.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// A request payload could not be encoded for the backend.
    #[error("Could not encode request: {0}")]
    Encoding(String),

    /// The resource has no procedure bound for this operation.
    #[error("{0} is not supported for this resource")]
    Unsupported(&'static str),
}

impl StoreError {
    /// `true` for failures the caller cannot fix by simply retrying.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, Self::MissingCredential | Self::NotAuthenticated)
    }
}
