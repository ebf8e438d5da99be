//! hitframe-geom: Detector-geometry overlays for flat hit tables.
//!
//! This crate maps raw per-hit address columns onto flat geometry point
//! ids and builds subsystem views on top: dense per-wire measurement
//! matrices for a cylindrical tracker and side-split channel views for
//! a trigger hodoscope.
//!
//! # Key Components
//!
//! - [`Geometry`] - Point layout provider (layer, in-layer index, parity)
//! - [`GeomTable`] - Hit table decorated with a resolved flat id column
//! - [`TrackerHits`] - Dense wire measurements with cyclic neighbor shifts
//! - [`HodoscopeHits`] - Passive-trimmed upstream/downstream channel view

pub mod error;
pub mod hodoscope;
pub mod layout;
pub mod overlay;
pub mod resolve;
pub mod tracker;

pub use error::{Error, Result};
pub use hodoscope::{Hodoscope, HodoscopeConfig, HodoscopeHits};
pub use layout::{Geometry, RingHodoscope, UniformCylinder};
pub use overlay::{GeomConfig, GeomTable, HitKind, FLAT_ID, SIDE_TAG};
pub use resolve::{
    ChannelResolver, NamedVolumeResolver, Resolved, RowIndexResolver, PASSIVE_TAG,
};
pub use tracker::{TrackerConfig, TrackerHits};
