//! Geometry-specific error types.

use thiserror::Error;

/// Result type for geometry operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Geometry-specific error types.
#[derive(Error, Debug)]
pub enum Error {
    /// A hit's raw geometry fields do not resolve to a point.
    #[error("no geometry point for row {row:?}, index {index}")]
    UnmappedGeometry { row: String, index: i64 },

    /// A flat geometry id outside the provider's point range.
    #[error("geometry point {point} out of range for {n_points} points")]
    PointOutOfRange { point: i64, n_points: usize },

    /// Two tables built over different geometries.
    #[error("geometries differ: {first} vs {second} points")]
    GeometryMismatch { first: usize, second: usize },

    /// Relative or trigger times requested before the trigger column was
    /// populated.
    #[error("trigger time has not been set")]
    TriggerNotSet,

    /// A side-split adapter built over an overlay without side tags.
    #[error("no side tag column; resolve hits with a named-volume resolver")]
    MissingSideTags,

    /// Core table error.
    #[error("core error: {0}")]
    CoreError(#[from] hitframe_core::Error),
}
