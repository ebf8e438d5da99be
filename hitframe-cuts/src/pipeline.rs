//! End-to-end import, selection, and background overlay.

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use hitframe_core::EventSource;
use hitframe_geom::{Geometry, HodoscopeConfig, HodoscopeHits, TrackerConfig, TrackerHits};

use crate::config::CutSet;
use crate::error::Result;
use crate::pair::EventPair;

/// Bundled import and selection settings for one paired detector read.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Tracker import and overlay settings.
    pub tracker: TrackerConfig,
    /// Hodoscope import and overlay settings.
    pub hodoscope: HodoscopeConfig,
    /// Event selection applied after import.
    pub cuts: CutSet,
}

impl PipelineConfig {
    /// Creates a config with the default cut set.
    #[must_use]
    pub fn new(tracker: TrackerConfig, hodoscope: HodoscopeConfig) -> Self {
        Self {
            tracker,
            hodoscope,
            cuts: CutSet::default(),
        }
    }

    /// Replaces the cut set.
    #[must_use]
    pub fn with_cuts(mut self, cuts: CutSet) -> Self {
        self.cuts = cuts;
        self
    }
}

/// Imports both subsystems and applies the configured cuts, leaving the
/// pair aligned on the same surviving events.
///
/// # Errors
///
/// Propagates import and cut errors.
pub fn import_pair<ST, SH, T, H>(
    tracker_source: &ST,
    hodoscope_source: &SH,
    tracker_geometry: T,
    hodoscope_geometry: H,
    config: &PipelineConfig,
) -> Result<(TrackerHits<T>, HodoscopeHits<H>)>
where
    ST: EventSource,
    SH: EventSource,
    T: Geometry,
    H: Geometry,
{
    let mut tracker = TrackerHits::from_source(tracker_source, tracker_geometry, &config.tracker)?;
    let mut hodoscope =
        HodoscopeHits::from_source(hodoscope_source, hodoscope_geometry, &config.hodoscope)?;
    EventPair::new(&mut tracker, &mut hodoscope).apply_cuts(&config.cuts)?;
    debug!(
        n_events = tracker.n_events(),
        tracker_hits = tracker.n_hits(),
        hodoscope_hits = hodoscope.n_hits(),
        "imported event pair"
    );
    Ok((tracker, hodoscope))
}

/// Overlays a background pair onto a signal pair.
///
/// The larger sample is first trimmed to the size of the smaller by
/// seeded random event subsampling, then background hits are appended
/// event by event and the trigger time is recomputed from the merged
/// hodoscope.
///
/// # Errors
///
/// Returns [`Error::SampleMismatch`] when either pair's subsystems
/// disagree on event count; propagates trim and append errors.
///
/// [`Error::SampleMismatch`]: crate::Error::SampleMismatch
pub fn overlay_background<T: Geometry, H: Geometry>(
    signal: &mut EventPair<'_, T, H>,
    background: &mut EventPair<'_, T, H>,
    seed: u64,
) -> Result<()> {
    signal.check_aligned()?;
    background.check_aligned()?;
    let signal_events = signal.n_events();
    let background_events = background.n_events();
    match signal_events.cmp(&background_events) {
        Ordering::Greater => {
            signal.trim_events(&subsample(signal_events, background_events, seed))?;
        }
        Ordering::Less => {
            background.trim_events(&subsample(background_events, signal_events, seed))?;
        }
        Ordering::Equal => {}
    }
    signal.tracker_mut().add_hits(background.tracker())?;
    signal.hodoscope_mut().add_hits(background.hodoscope())?;
    signal.set_trigger_time()?;
    debug!(
        n_events = signal.n_events(),
        seed, "overlaid background sample"
    );
    Ok(())
}

/// Draws `keep` distinct event numbers from `0..total`.
fn subsample(total: usize, keep: usize, seed: u64) -> Vec<usize> {
    let mut events: Vec<usize> = (0..total).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    events.shuffle(&mut rng);
    events.truncate(keep);
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subsample_is_seeded() {
        assert_eq!(subsample(10, 4, 7), subsample(10, 4, 7));
        let picked = subsample(10, 4, 7);
        assert_eq!(picked.len(), 4);
        let mut sorted = picked;
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 4);
        assert!(sorted.iter().all(|&event| event < 10));
    }

    #[test]
    fn test_subsample_full_draw_keeps_everything() {
        let mut picked = subsample(5, 5, 1);
        picked.sort_unstable();
        assert_eq!(picked, vec![0, 1, 2, 3, 4]);
    }
}
