use thiserror::Error;

/// Errors that can arise in the economy core and its storage layer.
#[derive(Debug, Error)]
pub enum EconomyError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Registering a username that already exists.
    #[error("user already exists: {0}")]
    UserExists(String),

    /// Receipt amounts must be positive.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Balance cannot cover the requested spend.
    #[error("insufficient coins: have {have}, need {need}")]
    InsufficientCoins { have: u64, need: u64 },

    /// Mission is not in a state that allows the requested transition.
    #[error("invalid mission state: {0}")]
    InvalidMissionState(String),

    /// Mission has passed its expiry.
    #[error("mission expired: {0}")]
    MissionExpired(String),

    /// Cap on concurrently active missions reached.
    #[error("too many active missions (limit {0})")]
    TooManyActiveMissions(usize),

    /// Receipt was already voided.
    #[error("receipt already voided: {0}")]
    AlreadyVoided(String),

    /// Operation requires a role the caller does not hold.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// User has no companion to operate on.
    #[error("no companion adopted")]
    NoCompanion,

    /// Internal error (unexpected conditions).
    #[error("internal error: {0}")]
    Internal(String),
}
