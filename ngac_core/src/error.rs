use crate::storage::RecordError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NgacError>;

#[derive(Debug, Error)]
pub enum NgacError {
    #[error("node {0} already exists")]
    DuplicateNode(String),

    #[error("node {0} does not exist")]
    NodeNotFound(String),

    #[error("cycle detected at node {0}")]
    CycleDetected(String),

    #[error("cannot assign {child} to {parent}: {reason}")]
    InvalidAssignment {
        child: String,
        parent: String,
        reason: String,
    },

    #[error("cannot associate {source_id} with {target}: {reason}")]
    InvalidAssociation {
        source_id: String,
        target: String,
        reason: String,
    },

    #[error("prohibition {0} already exists")]
    DuplicateProhibition(String),

    #[error("obligation {0} already exists")]
    DuplicateObligation(String),

    #[error("error accessing {record} of namespace {namespace}: {source}")]
    StorageError {
        namespace: String,
        record: String,
        #[source]
        source: RecordError,
    },

    #[error("error unmarshaling {record} of namespace {namespace}: {source}")]
    UnmarshalError {
        namespace: String,
        record: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("error marshaling {record} for namespace {namespace}: {source}")]
    MarshalError {
        namespace: String,
        record: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("ngac policy for namespace {0} has already been initialized")]
    AlreadyInitialized(String),

    #[error("{principal} is not authorized to {action}")]
    Unauthorized { principal: String, action: String },

    #[error("user {0} does not have a role")]
    MissingRole(String),

    #[error("unrecognized role: {0}")]
    InvalidRole(String),

    #[error("user {user} does not have permission {permission} on {target}")]
    PermissionDenied {
        user: String,
        permission: String,
        target: String,
    },

    #[error("identity error: {0}")]
    Identity(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Reject empty or whitespace-only invocation inputs.
pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(NgacError::InvalidArgument(format!(
            "{} cannot be empty",
            field
        )));
    }
    Ok(())
}
