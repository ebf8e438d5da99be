//! Event selection arguments.

use std::ops::Range;

/// Which events a table accessor applies to.
///
/// Most accessors take `impl Into<EventSelection>`, so a bare event
/// number, a vector, a slice, or a range all work at the call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSelection {
    /// Every event in the table.
    All,
    /// A single event.
    Single(usize),
    /// A set of events; duplicates collapse and rows come back in flat
    /// table order.
    Set(Vec<usize>),
    /// Events used exactly as given; duplicates and order are honored,
    /// so the result can repeat and reorder rows.
    Sequence(Vec<usize>),
}

impl Default for EventSelection {
    fn default() -> Self {
        EventSelection::All
    }
}

impl From<usize> for EventSelection {
    fn from(event: usize) -> Self {
        EventSelection::Single(event)
    }
}

impl From<Vec<usize>> for EventSelection {
    fn from(events: Vec<usize>) -> Self {
        EventSelection::Set(events)
    }
}

impl From<&[usize]> for EventSelection {
    fn from(events: &[usize]) -> Self {
        EventSelection::Set(events.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for EventSelection {
    fn from(events: [usize; N]) -> Self {
        EventSelection::Set(events.to_vec())
    }
}

impl From<Range<usize>> for EventSelection {
    fn from(events: Range<usize>) -> Self {
        EventSelection::Set(events.collect())
    }
}
