//! hitframe-cuts: Event selection and sample preparation for hit tables.
//!
//! This crate couples a tracker and a hodoscope view into an event pair
//! kept on the same events, applies timing, trigger, and track-quality
//! cuts, merges paired overlays into combined dense views, and overlays
//! background samples onto signal samples.
//!
//! # Key Components
//!
//! - [`EventPair`] - Two-subsystem selection synchronized event by event
//! - [`CutSet`] - JSON-loadable cut configuration with beam defaults
//! - [`HitsMerger`] - Read-only merged dense views over two overlays
//! - [`import_pair`] / [`overlay_background`] - End-to-end sample builds

pub mod config;
pub mod error;
pub mod merge;
pub mod pair;
pub mod pipeline;

pub use config::{CutSet, TimeWindow, TimingWindows};
pub use error::{Error, Result};
pub use merge::{HitsMerger, MergePolicy, MergeRule};
pub use pair::EventPair;
pub use pipeline::{import_pair, overlay_background, PipelineConfig};
