//! Cut configuration, loadable from JSON.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use hitframe_core::Filter;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A strict `(lower, upper)` hit-time window in nanoseconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Hits must arrive strictly after this time.
    pub lower: f64,
    /// Hits must arrive strictly before this time.
    pub upper: f64,
}

impl TimeWindow {
    /// Creates a window.
    #[must_use]
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Builds the equivalent hit filter.
    #[must_use]
    pub fn filter(&self) -> Filter {
        Filter::new()
            .with_greater_than(self.lower)
            .with_less_than(self.upper)
    }
}

/// Per-subsystem hit-time windows; `None` leaves a subsystem unwindowed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingWindows {
    /// Window on tracker hit times.
    pub tracker: Option<TimeWindow>,
    /// Window on hodoscope hit times.
    pub hodoscope: Option<TimeWindow>,
}

/// Named cut configuration for a tracker/hodoscope pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutSet {
    /// Hit-time windows (default: 500-1620 ns tracker, 500-1170 ns hodoscope).
    pub windows: TimingWindows,
    /// Require at least one hodoscope signal hit (default: true).
    pub require_trigger: bool,
    /// Minimum tracker signal hits per event (default: off).
    pub min_hits: Option<usize>,
    /// Deepest tracker signal layer an event must reach (default: off).
    pub max_layer: Option<i64>,
    /// Write the earliest hodoscope signal time as the trigger time
    /// (default: true).
    pub set_trigger: bool,
}

impl Default for CutSet {
    fn default() -> Self {
        Self::beam_defaults()
    }
}

impl CutSet {
    /// Creates the standard beam-measurement cuts: a 500 ns lower window,
    /// subsystem upper windows of 1620 / 1170 ns, a trigger requirement,
    /// and trigger-time assignment.
    #[must_use]
    pub fn beam_defaults() -> Self {
        Self {
            windows: TimingWindows {
                tracker: Some(TimeWindow::new(500.0, 1620.0)),
                hodoscope: Some(TimeWindow::new(500.0, 1170.0)),
            },
            require_trigger: true,
            min_hits: None,
            max_layer: None,
            set_trigger: true,
        }
    }

    /// Creates a configuration with every cut disabled.
    #[must_use]
    pub fn open() -> Self {
        Self {
            windows: TimingWindows::default(),
            require_trigger: false,
            min_hits: None,
            max_layer: None,
            set_trigger: false,
        }
    }

    /// Loads a configuration from a JSON file; absent fields fall back to
    /// the beam defaults.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] or [`crate::Error::ParseError`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Loads a configuration from a JSON string; absent fields fall back
    /// to the beam defaults.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ParseError`].
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
