//! Upstream columnar source contract.
//!
//! A source hands out named columns on request. An event-wise field carries
//! one value per event; a hit-wise field carries one value per hit. The
//! importer tells the two apart by length, so a source never needs to say
//! which is which.

use std::collections::HashMap;
use std::ops::Range;

use crate::column::Column;
use crate::error::{Error, Result};

/// A columnar event store that hit tables import from.
pub trait EventSource {
    /// Returns the number of events in the store.
    fn n_events(&self) -> usize;

    /// Returns true if every named field is present.
    fn exists(&self, fields: &[&str]) -> bool;

    /// Reads the named fields, optionally restricted to a range of events.
    ///
    /// Hit-wise fields are restricted to the hits of the selected events;
    /// event-wise fields are restricted to the events themselves. A range
    /// end past the store clamps to the store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] for any absent field.
    fn read(
        &self,
        fields: &[&str],
        events: Option<Range<usize>>,
    ) -> Result<HashMap<String, Column>>;
}

/// An in-memory [`EventSource`] with explicit event structure.
///
/// Fields are registered as event-wise or hit-wise against a fixed
/// per-event hit-count table.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    counts: Vec<usize>,
    offsets: Vec<usize>,
    event_fields: HashMap<String, Column>,
    hit_fields: HashMap<String, Column>,
}

impl MemorySource {
    /// Creates a source whose events hold the given numbers of hits.
    #[must_use]
    pub fn new(counts: Vec<usize>) -> Self {
        let mut offsets = Vec::with_capacity(counts.len() + 1);
        let mut total = 0usize;
        offsets.push(0);
        for &count in &counts {
            total += count;
            offsets.push(total);
        }
        Self {
            counts,
            offsets,
            event_fields: HashMap::new(),
            hit_fields: HashMap::new(),
        }
    }

    /// Returns the total number of hits across all events.
    #[must_use]
    pub fn n_hits(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0)
    }

    /// Registers an event-wise field, one value per event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldLength`] if the column length is not the
    /// event count.
    pub fn with_event_field<C: Into<Column>>(mut self, name: &str, column: C) -> Result<Self> {
        let column = column.into();
        if column.len() != self.counts.len() {
            return Err(Error::FieldLength {
                field: name.to_owned(),
                len: column.len(),
                n_events: self.counts.len(),
                n_hits: self.n_hits(),
            });
        }
        self.event_fields.insert(name.to_owned(), column);
        Ok(self)
    }

    /// Registers a hit-wise field, one value per hit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldLength`] if the column length is not the
    /// hit count.
    pub fn with_hit_field<C: Into<Column>>(mut self, name: &str, column: C) -> Result<Self> {
        let column = column.into();
        if column.len() != self.n_hits() {
            return Err(Error::FieldLength {
                field: name.to_owned(),
                len: column.len(),
                n_events: self.counts.len(),
                n_hits: self.n_hits(),
            });
        }
        self.hit_fields.insert(name.to_owned(), column);
        Ok(self)
    }

    fn clamp(&self, events: Option<Range<usize>>) -> Range<usize> {
        match events {
            Some(range) => {
                let end = range.end.min(self.counts.len());
                range.start.min(end)..end
            }
            None => 0..self.counts.len(),
        }
    }
}

impl EventSource for MemorySource {
    fn n_events(&self) -> usize {
        self.counts.len()
    }

    fn exists(&self, fields: &[&str]) -> bool {
        fields
            .iter()
            .all(|f| self.event_fields.contains_key(*f) || self.hit_fields.contains_key(*f))
    }

    fn read(
        &self,
        fields: &[&str],
        events: Option<Range<usize>>,
    ) -> Result<HashMap<String, Column>> {
        let events = self.clamp(events);
        let hits = self.offsets[events.start]..self.offsets[events.end];
        let mut out = HashMap::with_capacity(fields.len());
        for &field in fields {
            let column = if let Some(column) = self.event_fields.get(field) {
                column.slice(events.clone())
            } else if let Some(column) = self.hit_fields.get(field) {
                column.slice(hits.clone())
            } else {
                return Err(Error::MissingField(field.to_owned()));
            };
            out.insert(field.to_owned(), column);
        }
        Ok(out)
    }
}
