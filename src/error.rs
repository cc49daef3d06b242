use thiserror::Error;

/// Errors that can occur when resolving images in the catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The city or image does not exist on disk
    #[error("Image not found: {city}/{image}")]
    ImageNotFound { city: String, image: String },

    /// The requested path would escape the catalog root
    #[error("Path rejected: {city}/{image} resolves outside the catalog")]
    TraversalRejected { city: String, image: String },

    /// Unexpected filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    /// Whether the caller should see this error as a plain "not found".
    ///
    /// Traversal attempts answer exactly like missing files.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CatalogError::ImageNotFound { .. } | CatalogError::TraversalRejected { .. }
        )
    }
}

/// Errors raised by audit log storage
#[derive(Debug, Error)]
pub enum AuditError {
    /// SQLite failure while writing or reading records
    #[error("Audit database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The background writer thread could not be started
    #[error("Failed to start audit writer: {0}")]
    Spawn(#[from] std::io::Error),

    /// The background writer has shut down
    #[error("Audit writer is no longer running")]
    WriterClosed,
}
