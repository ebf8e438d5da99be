//! hitframe-core: Event-indexed flat hit tables for detector analysis.
//!
//! This crate provides the foundational types for importing columnar hit
//! data, indexing it by event, and reshaping it with filters, trims,
//! sorts, and appends while the event/hit lookup tables stay consistent.
//!

pub mod column;
pub mod error;
pub mod filter;
pub mod index;
pub mod selection;
pub mod source;
pub mod table;

pub use column::{Column, Schema, Value};
pub use error::{Error, Result};
pub use filter::Filter;
pub use index::EventIndex;
pub use selection::EventSelection;
pub use source::{EventSource, MemorySource};
pub use table::{
    EmptyEvents, Grouping, HitTable, ImportConfig, EVENT_INDEX, HIT_INDEX,
};
