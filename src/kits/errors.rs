use thiserror::Error;

use crate::validation::KitNameError;

/// Errors raised by the kit store and the profile store.
#[derive(Debug, Error)]
pub enum KitError {
    /// A kit with this name (compared case-insensitively) already exists.
    #[error("kit already exists: {0}")]
    AlreadyExists(String),

    /// Returned when looking up a kit or profile that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// The kit's template is open in an editing session.
    #[error("kit is being edited: {0}")]
    Busy(String),

    /// Kit names are validated before they reach the store.
    #[error("invalid kit name: {0}")]
    InvalidName(#[from] KitNameError),

    /// Wrapper around IO errors (directory creation, file locks, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Kit document could not be encoded or decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },
}
