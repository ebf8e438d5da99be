//! Flat hit tables with event lookup.
//!
//! A [`HitTable`] stores every hit of an imported sample as one row of a
//! columnar table, with hits of one event occupying one contiguous run of
//! rows. An [`EventIndex`] maps between rows and events; it is rebuilt
//! from per-event counts after every structural edit, never patched.

use std::collections::HashMap;

use tracing::debug;

use crate::column::{Column, Schema, Value};
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::index::EventIndex;
use crate::selection::EventSelection;
use crate::source::EventSource;

/// Name of the derived column holding each row's flat position.
pub const HIT_INDEX: &str = "hit_index";

/// Name of the derived column holding each row's owning event.
pub const EVENT_INDEX: &str = "event_index";

/// How events are delimited in a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grouping {
    /// An event-wise column holding each event's hit count.
    Counts(String),
    /// A hit-wise, non-decreasing event key; runs of equal keys delimit
    /// events.
    Key(String),
}

/// What happens to events left with zero hits by a hit-level trim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyEvents {
    /// Emptied events are dropped and later events renumber.
    #[default]
    Drop,
    /// Emptied events stay at zero hits; event numbering is untouched.
    Keep,
}

/// Import-time description of a hit table.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    grouping: Grouping,
    fields: Vec<String>,
    placeholder_fields: Vec<String>,
    hit_type_field: String,
    signal_code: i64,
    time_field: Option<String>,
    max_events: Option<usize>,
}

impl ImportConfig {
    /// Creates a config with the given grouping and hit-type field.
    ///
    /// The hit-type field is always imported; the signal code defaults
    /// to 1.
    #[must_use]
    pub fn new(grouping: Grouping, hit_type_field: &str) -> Self {
        Self {
            grouping,
            fields: Vec::new(),
            placeholder_fields: Vec::new(),
            hit_type_field: hit_type_field.to_owned(),
            signal_code: 1,
            time_field: None,
            max_events: None,
        }
    }

    /// Adds fields that must exist in the source.
    #[must_use]
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Adds fields imported as zero-filled placeholders when absent.
    #[must_use]
    pub fn with_placeholder_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.placeholder_fields
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// Sets the hit-type code that marks signal hits.
    #[must_use]
    pub fn with_signal_code(mut self, code: i64) -> Self {
        self.signal_code = code;
        self
    }

    /// Names the time field used to order appended hits.
    #[must_use]
    pub fn with_time_field(mut self, field: &str) -> Self {
        self.time_field = Some(field.to_owned());
        self
    }

    /// Caps the number of events imported.
    #[must_use]
    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = Some(max_events);
        self
    }
}

/// Full event and hit extent of a source, before any event cap.
struct SourceShape {
    n_events: usize,
    n_hits: usize,
}

/// A flat, columnar hit table with event/hit lookup.
#[derive(Debug, Clone)]
pub struct HitTable {
    schema: Schema,
    columns: Vec<Column>,
    index: EventIndex,
    hit_type_field: String,
    signal_code: i64,
    time_field: Option<String>,
    /// Fields that came in as zero fill rather than source data.
    placeholders: Vec<String>,
}

impl HitTable {
    /// Imports a table from a source.
    ///
    /// Event-wise fields are broadcast to hit length; fields listed as
    /// placeholders and absent from the source come in as zero columns.
    /// The derived `hit_index` and `event_index` columns are appended
    /// last.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] for absent required fields,
    /// [`Error::MalformedCounts`] or [`Error::UnsortedKey`] for a broken
    /// grouping column, and [`Error::FieldLength`] for a field that is
    /// neither event-wise nor hit-wise.
    pub fn from_source<S: EventSource>(source: &S, config: &ImportConfig) -> Result<Self> {
        let counts_full = match &config.grouping {
            Grouping::Counts(field) => {
                let mut read = source.read(&[field.as_str()], None)?;
                let column = take_column(&mut read, field)?;
                counts_from_column(field, &column)?
            }
            Grouping::Key(field) => {
                let mut read = source.read(&[field.as_str()], None)?;
                let column = take_column(&mut read, field)?;
                counts_from_keys(field, column.as_i64(field)?)?
            }
        };
        let shape = SourceShape {
            n_events: counts_full.len(),
            n_hits: counts_full.iter().sum(),
        };
        let kept = config
            .max_events
            .map_or(shape.n_events, |cap| cap.min(shape.n_events));
        let mut table = Self {
            schema: Schema::new(),
            columns: Vec::new(),
            index: EventIndex::from_counts(counts_full[..kept].to_vec()),
            hit_type_field: config.hit_type_field.clone(),
            signal_code: config.signal_code,
            time_field: config.time_field.clone(),
            placeholders: Vec::new(),
        };

        let mut required: Vec<String> = Vec::new();
        for field in config
            .fields
            .iter()
            .chain(std::iter::once(&config.hit_type_field))
            .chain(config.time_field.iter())
        {
            if !required.contains(field) && !config.placeholder_fields.contains(field) {
                required.push(field.clone());
            }
        }
        for field in &required {
            if !source.exists(&[field.as_str()]) {
                return Err(Error::MissingField(field.clone()));
            }
        }
        let field_refs: Vec<&str> = required.iter().map(String::as_str).collect();
        let mut read = source.read(&field_refs, None)?;
        for field in &required {
            let column = conform(field, take_column(&mut read, field)?, &shape, &table.index)?;
            table.push_column(field, column)?;
        }
        for field in &config.placeholder_fields {
            if table.schema.contains(field) {
                continue;
            }
            let column = if source.exists(&[field.as_str()]) {
                let mut read = source.read(&[field.as_str()], None)?;
                conform(field, take_column(&mut read, field)?, &shape, &table.index)?
            } else {
                debug!(field = field.as_str(), "absent field filled with zeros");
                table.placeholders.push(field.clone());
                Column::zeros(table.index.n_hits())
            };
            table.push_column(field, column)?;
        }
        table.push_index_columns()?;
        debug!(
            n_events = table.n_events(),
            n_hits = table.n_hits(),
            n_fields = table.schema.len(),
            "imported hit table"
        );
        Ok(table)
    }

    /// Returns the number of events, including zero-hit events.
    #[must_use]
    pub fn n_events(&self) -> usize {
        self.index.n_events()
    }

    /// Returns the total number of hits.
    #[must_use]
    pub fn n_hits(&self) -> usize {
        self.index.n_hits()
    }

    /// Returns the event/hit lookup tables.
    #[must_use]
    pub fn index(&self) -> &EventIndex {
        &self.index
    }

    /// Returns the field names in table order.
    #[must_use]
    pub fn field_names(&self) -> &[String] {
        self.schema.fields()
    }

    /// Returns true if the field is present.
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.schema.contains(field)
    }

    /// Returns the field holding the raw hit-type code.
    #[must_use]
    pub fn hit_type_field(&self) -> &str {
        &self.hit_type_field
    }

    /// Returns the code marking signal hits.
    #[must_use]
    pub fn signal_code(&self) -> i64 {
        self.signal_code
    }

    /// Returns the field used to order appended hits, if configured.
    #[must_use]
    pub fn time_field(&self) -> Option<&str> {
        self.time_field.as_deref()
    }

    /// Returns true if the field was zero-filled at import rather than
    /// read from the source, and has not been overwritten since.
    #[must_use]
    pub fn was_placeholder(&self, field: &str) -> bool {
        self.placeholders.iter().any(|f| f == field)
    }

    /// Borrows a column by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] listing the available fields.
    pub fn column(&self, field: &str) -> Result<&Column> {
        self.schema
            .position(field)
            .map(|position| &self.columns[position])
            .ok_or_else(|| unknown_field(field, &self.schema))
    }

    /// Borrows an `f64` column's rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] or [`Error::TypeMismatch`].
    pub fn values_f64(&self, field: &str) -> Result<&[f64]> {
        self.column(field)?.as_f64(field)
    }

    /// Borrows an `i64` column's rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] or [`Error::TypeMismatch`].
    pub fn values_i64(&self, field: &str) -> Result<&[i64]> {
        self.column(field)?.as_i64(field)
    }

    /// Borrows a string column's rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] or [`Error::TypeMismatch`].
    pub fn values_str(&self, field: &str) -> Result<&[String]> {
        self.column(field)?.as_str(field)
    }

    /// Returns one cell.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HitIndexOutOfRange`] or [`Error::UnknownField`].
    pub fn value(&self, field: &str, row: usize) -> Result<Value> {
        if row >= self.n_hits() {
            return Err(Error::HitIndexOutOfRange {
                index: row,
                n_hits: self.n_hits(),
            });
        }
        Ok(self.column(field)?.value(row))
    }

    /// Copies an `f64` column at the given rows, in the order given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HitIndexOutOfRange`] for any row outside the table.
    pub fn gather_f64(&self, field: &str, rows: &[usize]) -> Result<Vec<f64>> {
        let values = self.values_f64(field)?;
        self.check_rows(rows)?;
        Ok(rows.iter().map(|&row| values[row]).collect())
    }

    /// Copies an `i64` column at the given rows, in the order given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HitIndexOutOfRange`] for any row outside the table.
    pub fn gather_i64(&self, field: &str, rows: &[usize]) -> Result<Vec<i64>> {
        let values = self.values_i64(field)?;
        self.check_rows(rows)?;
        Ok(rows.iter().map(|&row| values[row]).collect())
    }

    /// Returns the flat rows of the selected events.
    ///
    /// A [`EventSelection::Set`] comes back in table order with duplicates
    /// collapsed; a [`EventSelection::Sequence`] honors order and
    /// duplicates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EventIndexOutOfRange`] for events outside the
    /// table.
    pub fn get_events(&self, selection: impl Into<EventSelection>) -> Result<Vec<usize>> {
        match selection.into() {
            EventSelection::All => Ok((0..self.n_hits()).collect()),
            EventSelection::Single(event) => Ok(self.index.event_hits(event)?.collect()),
            EventSelection::Set(mut events) => {
                events.sort_unstable();
                events.dedup();
                self.concat_event_rows(&events)
            }
            EventSelection::Sequence(events) => self.concat_event_rows(&events),
        }
    }

    /// Returns the event numbers a selection covers, in the order rows
    /// would come back from [`Self::get_events`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::EventIndexOutOfRange`] for events outside the
    /// table.
    pub fn selected_events(&self, selection: impl Into<EventSelection>) -> Result<Vec<usize>> {
        let events = match selection.into() {
            EventSelection::All => (0..self.n_events()).collect(),
            EventSelection::Single(event) => vec![event],
            EventSelection::Set(mut events) => {
                events.sort_unstable();
                events.dedup();
                events
            }
            EventSelection::Sequence(events) => events,
        };
        for &event in &events {
            if event >= self.n_events() {
                return Err(Error::EventIndexOutOfRange {
                    index: event,
                    n_events: self.n_events(),
                });
            }
        }
        Ok(events)
    }

    /// Narrows a row set to rows matching a filter on one field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`], [`Error::TypeMismatch`], or
    /// [`Error::HitIndexOutOfRange`].
    pub fn filter_hits(&self, rows: &[usize], field: &str, filter: &Filter) -> Result<Vec<usize>> {
        let mask = filter.mask(field, self.column(field)?)?;
        let mut kept = Vec::with_capacity(rows.len());
        for &row in rows {
            if row >= self.n_hits() {
                return Err(Error::HitIndexOutOfRange {
                    index: row,
                    n_hits: self.n_hits(),
                });
            }
            if mask[row] {
                kept.push(row);
            }
        }
        Ok(kept)
    }

    /// Returns the signal rows of the selected events.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::get_events`] and [`Self::filter_hits`] errors.
    pub fn get_signal_hits(&self, selection: impl Into<EventSelection>) -> Result<Vec<usize>> {
        let rows = self.get_events(selection)?;
        let filter = Filter::new().with_values([self.signal_code]);
        self.filter_hits(&rows, &self.hit_type_field, &filter)
    }

    /// Returns the non-signal rows of the selected events.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::get_events`] and [`Self::filter_hits`] errors.
    pub fn get_background_hits(&self, selection: impl Into<EventSelection>) -> Result<Vec<usize>> {
        let rows = self.get_events(selection)?;
        let filter = Filter::new().with_values([self.signal_code]).inverted();
        self.filter_hits(&rows, &self.hit_type_field, &filter)
    }

    /// Widens a row set to every hit in the rows' events.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HitIndexOutOfRange`] for rows outside the table.
    pub fn get_other_hits(&self, rows: &[usize]) -> Result<Vec<usize>> {
        let mut events = Vec::with_capacity(rows.len());
        for &row in rows {
            events.push(self.index.event_of(row)?);
        }
        self.get_events(EventSelection::Set(events))
    }

    /// Keeps only hits matching the filter; emptied events are dropped.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::trim_hits_with`] errors.
    pub fn trim_hits(&mut self, field: &str, filter: &Filter) -> Result<()> {
        self.trim_hits_with(field, filter, EmptyEvents::Drop)
    }

    /// Keeps only hits matching the filter, with an explicit policy for
    /// events left empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] or [`Error::TypeMismatch`].
    pub fn trim_hits_with(
        &mut self,
        field: &str,
        filter: &Filter,
        empty: EmptyEvents,
    ) -> Result<()> {
        let mask = filter.mask(field, self.column(field)?)?;
        let rows: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(row, &keep)| keep.then_some(row))
            .collect();
        let mut counts = vec![0usize; self.n_events()];
        for &row in &rows {
            counts[self.index.hits_to_events()[row]] += 1;
        }
        if empty == EmptyEvents::Drop {
            counts.retain(|&count| count > 0);
        }
        let before = self.n_hits();
        self.replace_rows(&rows, counts);
        debug!(field, before, after = self.n_hits(), "trimmed hits");
        Ok(())
    }

    /// Keeps only the listed events, zero-hit events included.
    ///
    /// Duplicates collapse; surviving events renumber in table order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EventIndexOutOfRange`] for events outside the
    /// table.
    pub fn trim_events(&mut self, events: &[usize]) -> Result<()> {
        let mut keep = events.to_vec();
        keep.sort_unstable();
        keep.dedup();
        let counts = self.index.restrict(&keep)?;
        let mut rows = Vec::new();
        for &event in &keep {
            rows.extend(self.index.event_hits(event)?);
        }
        let before = self.n_events();
        self.replace_rows(&rows, counts);
        debug!(before, after = self.n_events(), "trimmed events");
        Ok(())
    }

    /// Sorts hits within each event by one field. The sort is stable.
    ///
    /// With `reset_index` false the `hit_index` column is carried along
    /// unchanged, so each row remembers its pre-sort position; sorting on
    /// `hit_index` afterwards restores the original order. With
    /// `reset_index` true the column is rewritten to the new positions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] for an absent field.
    pub fn sort_hits(&mut self, field: &str, ascending: bool, reset_index: bool) -> Result<()> {
        let order = {
            let column = self.column(field)?;
            let mut order: Vec<usize> = (0..self.n_hits()).collect();
            for event in 0..self.n_events() {
                let range = self.index.event_hits(event)?;
                sort_rows(column, &mut order[range], ascending);
            }
            order
        };
        let columns: Vec<Column> = self.columns.iter().map(|c| c.gather(&order)).collect();
        self.columns = columns;
        if reset_index {
            self.refresh_index_columns();
        }
        debug!(field, ascending, "sorted hits within events");
        Ok(())
    }

    /// Appends another table's hits and regroups by event.
    ///
    /// Schemas must match field for field. Combined rows are ordered by
    /// the `event_index` column, then by the time field when one is
    /// configured; the rebuilt event range spans `0..=max(event_index)`,
    /// so interior events with no hits survive as zero-hit events.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TableMismatch`] for differing schemas or a
    /// negative event index, [`Error::TypeMismatch`] for differing column
    /// types.
    pub fn add_hits(&mut self, other: &HitTable) -> Result<()> {
        if self.schema.fields() != other.schema.fields() {
            return Err(Error::TableMismatch(format!(
                "field sets differ: [{}] vs [{}]",
                self.schema.fields().join(", "),
                other.schema.fields().join(", ")
            )));
        }
        let mut columns = Vec::with_capacity(self.columns.len());
        for (position, field) in self.schema.fields().iter().enumerate() {
            let mut column = self.columns[position].clone();
            column.append(field, &other.columns[position])?;
            columns.push(column);
        }

        let event_position = self
            .schema
            .position(EVENT_INDEX)
            .ok_or_else(|| unknown_field(EVENT_INDEX, &self.schema))?;
        let events = columns[event_position].as_i64(EVENT_INDEX)?;
        let mut owners = Vec::with_capacity(events.len());
        for &event in events {
            if event < 0 {
                return Err(Error::TableMismatch(format!(
                    "negative event index {event} in combined rows"
                )));
            }
            owners.push(usize::try_from(event).unwrap_or_default());
        }

        let mut order: Vec<usize> = (0..owners.len()).collect();
        if let Some(time_field) = &self.time_field {
            let position = self
                .schema
                .position(time_field)
                .ok_or_else(|| unknown_field(time_field, &self.schema))?;
            let times = columns[position].as_f64(time_field)?;
            order.sort_by(|&a, &b| {
                owners[a]
                    .cmp(&owners[b])
                    .then(times[a].total_cmp(&times[b]))
            });
        } else {
            order.sort_by_key(|&row| owners[row]);
        }

        let n_events = owners.iter().max().map_or(0, |&event| event + 1);
        let mut counts = vec![0usize; n_events];
        for &owner in &owners {
            counts[owner] += 1;
        }

        let columns: Vec<Column> = columns.iter().map(|c| c.gather(&order)).collect();
        self.columns = columns;
        self.index = EventIndex::from_counts(counts);
        self.refresh_index_columns();
        debug!(
            added = other.n_hits(),
            total = self.n_hits(),
            "appended hits"
        );
        Ok(())
    }

    /// Returns a copy trimmed to hits matching the filter.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::trim_hits`] errors.
    pub fn filtered(&self, field: &str, filter: &Filter) -> Result<HitTable> {
        let mut table = self.clone();
        table.trim_hits(field, filter)?;
        Ok(table)
    }

    /// Appends a new column; its length must equal the hit count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldLength`] or [`Error::DuplicateField`].
    pub fn push_column<C: Into<Column>>(&mut self, field: &str, column: C) -> Result<()> {
        let column = column.into();
        if column.len() != self.n_hits() {
            return Err(Error::FieldLength {
                field: field.to_owned(),
                len: column.len(),
                n_events: self.n_events(),
                n_hits: self.n_hits(),
            });
        }
        self.schema.push(field)?;
        self.columns.push(column);
        Ok(())
    }

    /// Replaces an existing column; its length must equal the hit count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] or [`Error::FieldLength`].
    pub fn set_column<C: Into<Column>>(&mut self, field: &str, column: C) -> Result<()> {
        let column = column.into();
        let position = self
            .schema
            .position(field)
            .ok_or_else(|| unknown_field(field, &self.schema))?;
        if column.len() != self.n_hits() {
            return Err(Error::FieldLength {
                field: field.to_owned(),
                len: column.len(),
                n_events: self.n_events(),
                n_hits: self.n_hits(),
            });
        }
        self.columns[position] = column;
        self.placeholders.retain(|f| f != field);
        Ok(())
    }

    /// Rewrites every value of an `f64` column in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] or [`Error::TypeMismatch`].
    pub fn transform_f64<F: Fn(f64) -> f64>(&mut self, field: &str, f: F) -> Result<()> {
        let position = self
            .schema
            .position(field)
            .ok_or_else(|| unknown_field(field, &self.schema))?;
        match &mut self.columns[position] {
            Column::F64(values) => {
                for value in values.iter_mut() {
                    *value = f(*value);
                }
                Ok(())
            }
            other => Err(Error::TypeMismatch {
                field: field.to_owned(),
                expected: "f64",
                actual: other.type_name(),
            }),
        }
    }

    fn concat_event_rows(&self, events: &[usize]) -> Result<Vec<usize>> {
        let mut rows = Vec::new();
        for &event in events {
            rows.extend(self.index.event_hits(event)?);
        }
        Ok(rows)
    }

    fn check_rows(&self, rows: &[usize]) -> Result<()> {
        for &row in rows {
            if row >= self.n_hits() {
                return Err(Error::HitIndexOutOfRange {
                    index: row,
                    n_hits: self.n_hits(),
                });
            }
        }
        Ok(())
    }

    /// Swaps in a surviving row set and its rebuilt index.
    fn replace_rows(&mut self, rows: &[usize], counts: Vec<usize>) {
        let columns: Vec<Column> = self.columns.iter().map(|c| c.gather(rows)).collect();
        self.columns = columns;
        self.index = EventIndex::from_counts(counts);
        self.refresh_index_columns();
    }

    fn push_index_columns(&mut self) -> Result<()> {
        self.push_column(HIT_INDEX, identity_rows(self.n_hits()))?;
        self.push_column(EVENT_INDEX, owners_i64(&self.index))
    }

    fn refresh_index_columns(&mut self) {
        if let Some(position) = self.schema.position(HIT_INDEX) {
            self.columns[position] = Column::I64(identity_rows(self.n_hits()));
        }
        if let Some(position) = self.schema.position(EVENT_INDEX) {
            self.columns[position] = Column::I64(owners_i64(&self.index));
        }
    }
}

fn unknown_field(field: &str, schema: &Schema) -> Error {
    Error::UnknownField {
        field: field.to_owned(),
        available: schema.fields().to_vec(),
    }
}

#[allow(clippy::cast_possible_wrap)]
fn identity_rows(n_hits: usize) -> Vec<i64> {
    (0..n_hits as i64).collect()
}

#[allow(clippy::cast_possible_wrap)]
fn owners_i64(index: &EventIndex) -> Vec<i64> {
    index.hits_to_events().iter().map(|&e| e as i64).collect()
}

fn take_column(read: &mut HashMap<String, Column>, field: &str) -> Result<Column> {
    read.remove(field)
        .ok_or_else(|| Error::MissingField(field.to_owned()))
}

fn counts_from_column(field: &str, column: &Column) -> Result<Vec<usize>> {
    let raw = column.as_i64(field)?;
    let mut counts = Vec::with_capacity(raw.len());
    for (event, &count) in raw.iter().enumerate() {
        if count < 0 {
            return Err(Error::MalformedCounts { event, count });
        }
        counts.push(usize::try_from(count).unwrap_or_default());
    }
    Ok(counts)
}

fn counts_from_keys(field: &str, keys: &[i64]) -> Result<Vec<usize>> {
    let mut counts: Vec<usize> = Vec::new();
    let mut previous: Option<i64> = None;
    for (position, &key) in keys.iter().enumerate() {
        match previous {
            Some(last) if key < last => {
                return Err(Error::UnsortedKey {
                    field: field.to_owned(),
                    position,
                })
            }
            Some(last) if key == last => {
                if let Some(count) = counts.last_mut() {
                    *count += 1;
                }
            }
            _ => counts.push(1),
        }
        previous = Some(key);
    }
    Ok(counts)
}

/// Fits a raw source column to the imported table: hit-wise columns are
/// truncated to the kept hits, event-wise columns are truncated to the
/// kept events and broadcast. A length matching both reads as hit-wise.
fn conform(
    field: &str,
    column: Column,
    shape: &SourceShape,
    index: &EventIndex,
) -> Result<Column> {
    let len = column.len();
    if len == shape.n_hits {
        Ok(column.slice(0..index.n_hits()))
    } else if len == shape.n_events {
        Ok(column
            .slice(0..index.n_events())
            .gather(index.hits_to_events()))
    } else {
        Err(Error::FieldLength {
            field: field.to_owned(),
            len,
            n_events: shape.n_events,
            n_hits: shape.n_hits,
        })
    }
}

fn sort_rows(column: &Column, rows: &mut [usize], ascending: bool) {
    match column {
        Column::F64(values) => {
            if ascending {
                rows.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
            } else {
                rows.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
            }
        }
        Column::I64(values) => {
            if ascending {
                rows.sort_by(|&a, &b| values[a].cmp(&values[b]));
            } else {
                rows.sort_by(|&a, &b| values[b].cmp(&values[a]));
            }
        }
        Column::Str(values) => {
            if ascending {
                rows.sort_by(|&a, &b| values[a].cmp(&values[b]));
            } else {
                rows.sort_by(|&a, &b| values[b].cmp(&values[a]));
            }
        }
    }
}
