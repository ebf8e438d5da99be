//! Synchronized cuts over a tracker/hodoscope pair.

use std::collections::HashSet;

use hitframe_core::{EmptyEvents, HitTable};
use hitframe_geom::{Geometry, HodoscopeHits, TrackerHits};
use tracing::debug;

use crate::config::{CutSet, TimingWindows};
use crate::error::{Error, Result};

/// A tracker and a hodoscope describing the same events, cut together.
///
/// Every operation trims both tables identically, so event `e` keeps
/// meaning the same physics event on both sides. `n_events` is the
/// common prefix length, `min(tracker, hodoscope)`.
pub struct EventPair<'a, T: Geometry, H: Geometry> {
    tracker: &'a mut TrackerHits<T>,
    hodoscope: &'a mut HodoscopeHits<H>,
}

impl<'a, T: Geometry, H: Geometry> EventPair<'a, T, H> {
    /// Couples the two subsystem tables.
    pub fn new(tracker: &'a mut TrackerHits<T>, hodoscope: &'a mut HodoscopeHits<H>) -> Self {
        Self { tracker, hodoscope }
    }

    /// Returns the number of paired events.
    #[must_use]
    pub fn n_events(&self) -> usize {
        self.tracker.n_events().min(self.hodoscope.n_events())
    }

    /// Returns the tracker side.
    #[must_use]
    pub fn tracker(&self) -> &TrackerHits<T> {
        self.tracker
    }

    /// Returns the hodoscope side.
    #[must_use]
    pub fn hodoscope(&self) -> &HodoscopeHits<H> {
        self.hodoscope
    }

    /// Returns the tracker side for mutation.
    pub fn tracker_mut(&mut self) -> &mut TrackerHits<T> {
        self.tracker
    }

    /// Returns the hodoscope side for mutation.
    pub fn hodoscope_mut(&mut self) -> &mut HodoscopeHits<H> {
        self.hodoscope
    }

    /// Keeps only the listed events, identically on both sides.
    ///
    /// # Errors
    ///
    /// Returns `EventIndexOutOfRange` for events beyond the paired
    /// extent; neither table is touched in that case.
    pub fn trim_events(&mut self, events: &[usize]) -> Result<()> {
        let n_events = self.n_events();
        for &event in events {
            if event >= n_events {
                return Err(hitframe_core::Error::EventIndexOutOfRange {
                    index: event,
                    n_events,
                }
                .into());
            }
        }
        self.tracker.trim_events(events)?;
        self.hodoscope.trim_events(events)?;
        Ok(())
    }

    /// Trims both tables to the common `0..n_events` prefix.
    ///
    /// # Errors
    ///
    /// Propagates trim errors.
    pub fn align_events(&mut self) -> Result<()> {
        let keep: Vec<usize> = (0..self.n_events()).collect();
        self.trim_events(&keep)
    }

    /// Keeps only events whose key value appears in both tables.
    ///
    /// Each event's key is read from its first hit (event-wise keys are
    /// broadcast, so any hit serves); zero-hit events carry no key and
    /// are dropped. Events stay paired as long as the key column is
    /// ascending in both tables.
    ///
    /// # Errors
    ///
    /// Propagates column and trim errors.
    pub fn keep_common_events(&mut self, key_field: &str) -> Result<()> {
        let tracker_keys = event_keys(self.tracker.overlay().table(), key_field)?;
        let hodoscope_keys = event_keys(self.hodoscope.overlay().table(), key_field)?;
        let tracker_set: HashSet<i64> = tracker_keys.iter().flatten().copied().collect();
        let hodoscope_set: HashSet<i64> = hodoscope_keys.iter().flatten().copied().collect();

        let keep_tracker = keyed_events(&tracker_keys, &hodoscope_set);
        let keep_hodoscope = keyed_events(&hodoscope_keys, &tracker_set);
        debug!(
            tracker = keep_tracker.len(),
            hodoscope = keep_hodoscope.len(),
            "keeping common events"
        );
        self.tracker.trim_events(&keep_tracker)?;
        self.hodoscope.trim_events(&keep_hodoscope)?;
        Ok(())
    }

    /// Applies per-subsystem hit-time windows, then drops events emptied
    /// in any windowed subsystem from both tables at once.
    ///
    /// # Errors
    ///
    /// Propagates trim errors.
    pub fn apply_timing_cut(&mut self, windows: &TimingWindows) -> Result<()> {
        if let Some(window) = windows.tracker {
            let field = self.tracker.overlay().time_field().to_owned();
            self.tracker
                .trim_hits_with(&field, &window.filter(), EmptyEvents::Keep)?;
        }
        if let Some(window) = windows.hodoscope {
            let field = self.hodoscope.overlay().time_field().to_owned();
            self.hodoscope
                .trim_hits_with(&field, &window.filter(), EmptyEvents::Keep)?;
        }
        let n_events = self.n_events();
        let tracker_counts = self.tracker.overlay().table().index().event_to_n_hits().to_vec();
        let hodoscope_counts = self
            .hodoscope
            .overlay()
            .table()
            .index()
            .event_to_n_hits()
            .to_vec();
        let keep: Vec<usize> = (0..n_events)
            .filter(|&event| {
                let tracker_ok = windows.tracker.is_none() || tracker_counts[event] > 0;
                let hodoscope_ok = windows.hodoscope.is_none() || hodoscope_counts[event] > 0;
                tracker_ok && hodoscope_ok
            })
            .collect();
        debug!(kept = keep.len(), of = n_events, "timing cut");
        self.trim_events(&keep)
    }

    /// Keeps events with at least one hodoscope signal hit.
    ///
    /// # Errors
    ///
    /// Propagates selection and trim errors.
    pub fn apply_trigger_cut(&mut self) -> Result<()> {
        let mut keep = Vec::new();
        for event in 0..self.n_events() {
            if !self.hodoscope.overlay().get_signal_hits(event)?.is_empty() {
                keep.push(event);
            }
        }
        debug!(kept = keep.len(), "trigger cut");
        self.trim_events(&keep)
    }

    /// Keeps events with at least `min_hits` tracker signal hits.
    ///
    /// # Errors
    ///
    /// Propagates selection and trim errors.
    pub fn apply_min_hits_cut(&mut self, min_hits: usize) -> Result<()> {
        let mut keep = Vec::new();
        for event in 0..self.n_events() {
            if self.tracker.overlay().get_signal_hits(event)?.len() >= min_hits {
                keep.push(event);
            }
        }
        debug!(kept = keep.len(), min_hits, "minimum hits cut");
        self.trim_events(&keep)
    }

    /// Keeps events whose deepest tracker signal hit reaches `layer`.
    /// Events without signal hits sit at layer -1 and always fail.
    ///
    /// # Errors
    ///
    /// Propagates selection and trim errors.
    pub fn apply_max_layer_cut(&mut self, layer: i64) -> Result<()> {
        let mut keep = Vec::new();
        for event in 0..self.n_events() {
            if self.tracker.deepest_signal_layer(event)? >= layer {
                keep.push(event);
            }
        }
        debug!(kept = keep.len(), layer, "maximum layer cut");
        self.trim_events(&keep)
    }

    /// Writes each event's earliest hodoscope signal time into both
    /// tables' trigger column. Events without a hodoscope signal hit get
    /// trigger time 0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SampleMismatch`] unless both tables hold the
    /// same events.
    pub fn set_trigger_time(&mut self) -> Result<()> {
        self.check_aligned()?;
        let mut triggers = Vec::with_capacity(self.n_events());
        let time_field = self.hodoscope.overlay().time_field().to_owned();
        for event in 0..self.n_events() {
            let rows = self.hodoscope.overlay().get_signal_hits(event)?;
            let times = self
                .hodoscope
                .overlay()
                .table()
                .gather_f64(&time_field, &rows)?;
            triggers.push(if times.is_empty() {
                0.0
            } else {
                times.iter().copied().fold(f64::INFINITY, f64::min)
            });
        }
        self.tracker.set_trigger_time(&triggers)?;
        self.hodoscope.set_trigger_time(&triggers)?;
        Ok(())
    }

    /// Applies a whole cut configuration in order: align, timing windows,
    /// trigger, minimum hits, maximum layer, trigger-time assignment.
    ///
    /// # Errors
    ///
    /// Propagates errors from the individual cuts.
    pub fn apply_cuts(&mut self, cuts: &CutSet) -> Result<()> {
        self.align_events()?;
        self.apply_timing_cut(&cuts.windows)?;
        if cuts.require_trigger {
            self.apply_trigger_cut()?;
        }
        if let Some(min_hits) = cuts.min_hits {
            self.apply_min_hits_cut(min_hits)?;
        }
        if let Some(layer) = cuts.max_layer {
            self.apply_max_layer_cut(layer)?;
        }
        if cuts.set_trigger {
            self.set_trigger_time()?;
        }
        Ok(())
    }

    pub(crate) fn check_aligned(&self) -> Result<()> {
        if self.tracker.n_events() == self.hodoscope.n_events() {
            Ok(())
        } else {
            Err(Error::SampleMismatch(format!(
                "tracker holds {} events, hodoscope {}",
                self.tracker.n_events(),
                self.hodoscope.n_events()
            )))
        }
    }
}

fn event_keys(table: &HitTable, key_field: &str) -> Result<Vec<Option<i64>>> {
    let values = table.values_i64(key_field)?;
    let mut keys = Vec::with_capacity(table.n_events());
    for event in 0..table.n_events() {
        let range = table.index().event_hits(event)?;
        keys.push(if range.is_empty() {
            None
        } else {
            Some(values[range.start])
        });
    }
    Ok(keys)
}

fn keyed_events(keys: &[Option<i64>], other: &HashSet<i64>) -> Vec<usize> {
    keys.iter()
        .enumerate()
        .filter(|(_, key)| key.is_some_and(|key| other.contains(&key)))
        .map(|(event, _)| event)
        .collect()
}
