//! Error types for the intake engine.

/// Top-level error type for the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Data integrity violation: {0}")]
    DataIntegrity(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl Error {
    /// Shorthand for a `NotFound` with an owned id.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Persistence errors. Transient store failures surface as `Pool`/`Query`
/// and are propagated without retries.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Constraint violation: {0}")]
    Conflict(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;
