//! Error types for registry operations.

/// A caller violated the precondition of an override operation.
///
/// These are programmer errors at the call site. They are raised before any
/// state changes and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    /// The argument (or one element of a sequence) is not callable.
    #[error("{operation} expects a callable, got `{object}`")]
    NotCallable {
        operation: &'static str,
        object: String,
    },

    /// Strict `disallow_in_graph` on something that is not currently allowed.
    #[error(
        "disallow_in_graph is expected to be used on an already allowed callable (like torch.* ops); \
         `{object}` is not placed as-is in the extracted graph"
    )]
    NotAllowed { object: String },
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A process-wide registry was already installed.
    #[error("a global registry is already installed")]
    AlreadyInstalled,

    /// An override names a key the host image does not define.
    #[error("unknown host object key `{0}`")]
    UnknownObject(String),

    #[error(transparent)]
    Usage(#[from] UsageError),
}
