//! Columnar event file writer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use hitframe_core::Column;

use crate::reader::{KIND_F64, KIND_I64, KIND_STR, MAGIC, SCOPE_EVENT, SCOPE_HIT};
use crate::{Error, Result};

/// Builder-style writer for columnar event files.
///
/// Fields are registered against a fixed per-event hit-count table,
/// mirroring the in-memory source, and written out in registration
/// order.
pub struct ColumnarFileWriter {
    counts: Vec<usize>,
    event_fields: Vec<(String, Column)>,
    hit_fields: Vec<(String, Column)>,
}

impl ColumnarFileWriter {
    /// Creates a writer whose events hold the given numbers of hits.
    #[must_use]
    pub fn new(counts: Vec<usize>) -> Self {
        Self {
            counts,
            event_fields: Vec::new(),
            hit_fields: Vec::new(),
        }
    }

    fn n_hits(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Registers an event-wise field, one value per event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CoreError`] if the column length is not the
    /// event count.
    pub fn with_event_field<C: Into<Column>>(mut self, name: &str, column: C) -> Result<Self> {
        let column = column.into();
        if column.len() != self.counts.len() {
            return Err(Error::CoreError(hitframe_core::Error::FieldLength {
                field: name.to_owned(),
                len: column.len(),
                n_events: self.counts.len(),
                n_hits: self.n_hits(),
            }));
        }
        self.event_fields.push((name.to_owned(), column));
        Ok(self)
    }

    /// Registers a hit-wise field, one value per hit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CoreError`] if the column length is not the
    /// hit count.
    pub fn with_hit_field<C: Into<Column>>(mut self, name: &str, column: C) -> Result<Self> {
        let column = column.into();
        if column.len() != self.n_hits() {
            return Err(Error::CoreError(hitframe_core::Error::FieldLength {
                field: name.to_owned(),
                len: column.len(),
                n_events: self.counts.len(),
                n_hits: self.n_hits(),
            }));
        }
        self.hit_fields.push((name.to_owned(), column));
        Ok(self)
    }

    /// Writes the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(MAGIC)?;
        writer.write_all(&(self.counts.len() as u64).to_le_bytes())?;
        let n_fields = self.event_fields.len() + self.hit_fields.len();
        writer.write_all(&(n_fields as u64).to_le_bytes())?;
        for &count in &self.counts {
            writer.write_all(&(count as u64).to_le_bytes())?;
        }
        for (name, column) in &self.event_fields {
            write_field(&mut writer, name, SCOPE_EVENT, column)?;
        }
        for (name, column) in &self.hit_fields {
            write_field(&mut writer, name, SCOPE_HIT, column)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn write_field(
    writer: &mut BufWriter<File>,
    name: &str,
    scope: u8,
    column: &Column,
) -> Result<()> {
    writer.write_all(&(name.len() as u64).to_le_bytes())?;
    writer.write_all(name.as_bytes())?;
    writer.write_all(&[scope])?;
    match column {
        Column::I64(values) => {
            writer.write_all(&[KIND_I64])?;
            for value in values {
                writer.write_all(&value.to_le_bytes())?;
            }
        }
        Column::F64(values) => {
            writer.write_all(&[KIND_F64])?;
            for value in values {
                writer.write_all(&value.to_le_bytes())?;
            }
        }
        Column::Str(values) => {
            writer.write_all(&[KIND_STR])?;
            for value in values {
                writer.write_all(&(value.len() as u64).to_le_bytes())?;
                writer.write_all(value.as_bytes())?;
            }
        }
    }
    Ok(())
}
