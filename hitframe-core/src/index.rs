//! Event/hit lookup tables.
//!
//! This module defines the [`EventIndex`], the pair of lookup tables that
//! tie a flat hit table to its events: hits of one event occupy one
//! contiguous run of rows, and the index maps both directions without
//! scanning the table.

use std::ops::Range;

use crate::error::{Error, Result};

/// Lookup tables between a flat hit table and its events.
///
/// The index is rebuilt from per-event hit counts after every structural
/// edit; it is never patched incrementally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventIndex {
    /// Hits per event, indexed by event number.
    event_to_n_hits: Vec<usize>,
    /// First flat row of each event.
    first_hit: Vec<usize>,
    /// Owning event of each flat row.
    hits_to_events: Vec<usize>,
}

impl EventIndex {
    /// Builds an index from a raw per-event count column.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedCounts`] if any count is negative.
    pub fn build(event_to_n_hits: &[i64]) -> Result<Self> {
        let mut counts = Vec::with_capacity(event_to_n_hits.len());
        for (event, &count) in event_to_n_hits.iter().enumerate() {
            if count < 0 {
                return Err(Error::MalformedCounts { event, count });
            }
            counts.push(usize::try_from(count).unwrap_or_default());
        }
        Ok(Self::from_counts(counts))
    }

    /// Builds an index from already-validated per-event counts.
    #[must_use]
    pub fn from_counts(event_to_n_hits: Vec<usize>) -> Self {
        let n_hits: usize = event_to_n_hits.iter().sum();
        let mut first_hit = Vec::with_capacity(event_to_n_hits.len());
        let mut hits_to_events = Vec::with_capacity(n_hits);
        let mut first = 0usize;
        for (event, &count) in event_to_n_hits.iter().enumerate() {
            first_hit.push(first);
            hits_to_events.extend(std::iter::repeat(event).take(count));
            first += count;
        }
        Self {
            event_to_n_hits,
            first_hit,
            hits_to_events,
        }
    }

    /// Returns the number of events, including zero-hit events.
    #[must_use]
    pub fn n_events(&self) -> usize {
        self.event_to_n_hits.len()
    }

    /// Returns the total number of hits.
    #[must_use]
    pub fn n_hits(&self) -> usize {
        self.hits_to_events.len()
    }

    /// Returns the per-event hit counts.
    #[must_use]
    pub fn event_to_n_hits(&self) -> &[usize] {
        &self.event_to_n_hits
    }

    /// Returns the owning event of each flat row.
    #[must_use]
    pub fn hits_to_events(&self) -> &[usize] {
        &self.hits_to_events
    }

    /// Returns the contiguous flat row range of one event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EventIndexOutOfRange`] if `event` is not in the table.
    pub fn event_hits(&self, event: usize) -> Result<Range<usize>> {
        if event >= self.n_events() {
            return Err(Error::EventIndexOutOfRange {
                index: event,
                n_events: self.n_events(),
            });
        }
        let first = self.first_hit[event];
        Ok(first..first + self.event_to_n_hits[event])
    }

    /// Returns the owning event of one flat row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HitIndexOutOfRange`] if `hit` is not in the table.
    pub fn event_of(&self, hit: usize) -> Result<usize> {
        self.hits_to_events
            .get(hit)
            .copied()
            .ok_or(Error::HitIndexOutOfRange {
                index: hit,
                n_hits: self.n_hits(),
            })
    }

    /// Returns the counts of a subset of events, in the order given.
    ///
    /// Used to rebuild the index after an event-level trim.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EventIndexOutOfRange`] if any listed event is not
    /// in the table.
    pub fn restrict(&self, events: &[usize]) -> Result<Vec<usize>> {
        events
            .iter()
            .map(|&event| {
                self.event_to_n_hits.get(event).copied().ok_or(
                    Error::EventIndexOutOfRange {
                        index: event,
                        n_events: self.n_events(),
                    },
                )
            })
            .collect()
    }

    /// Checks the internal consistency of the lookup tables.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated invariant.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let total: usize = self.event_to_n_hits.iter().sum();
        if total != self.hits_to_events.len() {
            return Err(format!(
                "count sum {total} != {} mapped hits",
                self.hits_to_events.len()
            ));
        }
        let mut expected_first = 0usize;
        for (event, (&first, &count)) in self
            .first_hit
            .iter()
            .zip(self.event_to_n_hits.iter())
            .enumerate()
        {
            if first != expected_first {
                return Err(format!(
                    "event {event} starts at row {first}, expected {expected_first}"
                ));
            }
            for hit in first..first + count {
                if self.hits_to_events[hit] != event {
                    return Err(format!(
                        "row {hit} maps to event {}, expected {event}",
                        self.hits_to_events[hit]
                    ));
                }
            }
            expected_first += count;
        }
        Ok(())
    }
}
