//! hitframe-io: Memory-mapped columnar event files for hitframe.
//!
//! This crate provides a simple columnar event-file format read through
//! memory-mapped files via memmap2. An opened file implements the core
//! source contract, so tables import straight from disk; the paired
//! writer produces files for tests and small captures.

mod error;
mod reader;
mod writer;

pub use error::{Error, Result};
pub use reader::{ColumnarFile, MappedFileReader};
pub use writer::ColumnarFileWriter;
