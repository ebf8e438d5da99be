//! Selection and merging error types.

use thiserror::Error;

/// Result type for selection operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Selection and merging error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Two tables that must describe the same events disagree.
    #[error("event samples differ: {0}")]
    SampleMismatch(String),

    /// Merger inputs disagree in schema, geometry, or event count.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Cut configuration file I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cut configuration parse error.
    #[error("config parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Geometry overlay error.
    #[error("geometry error: {0}")]
    GeomError(#[from] hitframe_geom::Error),

    /// Core table error.
    #[error("core error: {0}")]
    CoreError(#[from] hitframe_core::Error),
}
