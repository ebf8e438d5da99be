//! Memory-mapped columnar event files.
//!
//! Layout: an eight-byte magic, the event count, the field count, the
//! per-event hit counts, then each field as a length-prefixed name, a
//! scope byte (event-wise or hit-wise), a kind byte, and its values.
//! Numeric values are little-endian eight-byte words; strings are
//! length-prefixed UTF-8.

use std::collections::HashMap;
use std::fs::File;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::Mmap;
use tracing::debug;

use hitframe_core::{Column, EventSource};

use crate::error::{Error, Result};

pub(crate) const MAGIC: &[u8; 8] = b"HITCOL01";
pub(crate) const SCOPE_EVENT: u8 = 0;
pub(crate) const SCOPE_HIT: u8 = 1;
pub(crate) const KIND_I64: u8 = 0;
pub(crate) const KIND_F64: u8 = 1;
pub(crate) const KIND_STR: u8 = 2;

/// A memory-mapped file reader.
///
/// Uses memmap2 to access file contents without loading the entire
/// file into memory.
#[derive(Debug)]
pub struct MappedFileReader {
    mmap: Arc<Mmap>,
    path: PathBuf,
}

impl MappedFileReader {
    /// Opens a file for memory-mapped reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
        // This is the standard safety contract for memory mapping.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            mmap: Arc::new(mmap),
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Returns the file contents as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap[..]
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Returns true if the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Returns the path the reader was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Bounds-checked walk over the mapped bytes during layout validation.
struct Cursor<'a> {
    bytes: &'a [u8],
    at: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        let end = self
            .at
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| Error::InvalidFormat(format!("truncated {what}")))?;
        let slice = &self.bytes[self.at..end];
        self.at = end;
        Ok(slice)
    }

    fn take_u64(&mut self, what: &str) -> Result<u64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8, what)?);
        Ok(u64::from_le_bytes(raw))
    }

    fn take_len(&mut self, what: &str) -> Result<usize> {
        usize::try_from(self.take_u64(what)?)
            .map_err(|_| Error::InvalidFormat(format!("{what} out of range")))
    }

    fn take_byte(&mut self, what: &str) -> Result<u8> {
        Ok(self.take(1, what)?[0])
    }

    fn take_values(&mut self, len: usize, name: &str) -> Result<Range<usize>> {
        let size = len
            .checked_mul(8)
            .ok_or_else(|| Error::InvalidFormat(format!("field {name} too large")))?;
        let start = self.at;
        self.take(size, name)?;
        Ok(start..self.at)
    }

    fn take_strings(&mut self, len: usize, name: &str) -> Result<Vec<String>> {
        let mut values = Vec::with_capacity(len);
        for _ in 0..len {
            let value_len = self.take_len(name)?;
            let value = std::str::from_utf8(self.take(value_len, name)?).map_err(|_| {
                Error::InvalidFormat(format!("field {name} holds non-UTF-8 text"))
            })?;
            values.push(value.to_owned());
        }
        Ok(values)
    }
}

#[derive(Debug)]
enum Payload {
    I64(Range<usize>),
    F64(Range<usize>),
    Str(Vec<String>),
}

#[derive(Debug)]
struct FieldEntry {
    event_wise: bool,
    payload: Payload,
}

/// A columnar event file read through a shared memory mapping.
///
/// An opened file implements [`EventSource`], so tables import straight
/// from disk. Numeric columns stay in the mapping until read; string
/// columns are decoded once at open.
#[derive(Debug)]
pub struct ColumnarFile {
    reader: MappedFileReader,
    counts: Vec<usize>,
    offsets: Vec<usize>,
    fields: HashMap<String, FieldEntry>,
}

impl ColumnarFile {
    /// Opens and indexes a columnar file, validating the whole layout up
    /// front so later reads cannot run off the mapping.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] for wrong magic, truncation,
    /// unknown scope or kind bytes, malformed UTF-8, or trailing bytes.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = MappedFileReader::open(path)?;
        let bytes = reader.as_bytes();
        let mut cursor = Cursor { bytes, at: 0 };
        if cursor.take(8, "magic")? != MAGIC {
            return Err(Error::InvalidFormat(format!(
                "not a columnar event file: {}",
                reader.path().display()
            )));
        }
        let n_events = cursor.take_len("event count")?;
        let n_fields = cursor.take_len("field count")?;

        let mut counts = Vec::with_capacity(n_events);
        let mut offsets = Vec::with_capacity(n_events + 1);
        offsets.push(0);
        let mut total = 0usize;
        for _ in 0..n_events {
            let count = cursor.take_len("hit count")?;
            total = total
                .checked_add(count)
                .ok_or_else(|| Error::InvalidFormat("hit counts overflow".to_owned()))?;
            counts.push(count);
            offsets.push(total);
        }

        let mut fields = HashMap::with_capacity(n_fields);
        for _ in 0..n_fields {
            let name_len = cursor.take_len("field name length")?;
            let name = std::str::from_utf8(cursor.take(name_len, "field name")?)
                .map_err(|_| Error::InvalidFormat("field name is not UTF-8".to_owned()))?
                .to_owned();
            let event_wise = match cursor.take_byte("field scope")? {
                SCOPE_EVENT => true,
                SCOPE_HIT => false,
                other => {
                    return Err(Error::InvalidFormat(format!(
                        "unknown scope byte {other} for field {name}"
                    )))
                }
            };
            let len = if event_wise { n_events } else { total };
            let payload = match cursor.take_byte("field kind")? {
                KIND_I64 => Payload::I64(cursor.take_values(len, &name)?),
                KIND_F64 => Payload::F64(cursor.take_values(len, &name)?),
                KIND_STR => Payload::Str(cursor.take_strings(len, &name)?),
                other => {
                    return Err(Error::InvalidFormat(format!(
                        "unknown kind byte {other} for field {name}"
                    )))
                }
            };
            fields.insert(
                name,
                FieldEntry {
                    event_wise,
                    payload,
                },
            );
        }
        if cursor.at != bytes.len() {
            return Err(Error::InvalidFormat(format!(
                "{} trailing bytes",
                bytes.len() - cursor.at
            )));
        }
        debug!(
            path = %reader.path().display(),
            n_events,
            n_fields,
            n_hits = total,
            "opened columnar file"
        );
        Ok(Self {
            reader,
            counts,
            offsets,
            fields,
        })
    }

    /// Returns the total number of hits across all events.
    #[must_use]
    pub fn n_hits(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0)
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn file_size(&self) -> usize {
        self.reader.len()
    }

    /// Returns the registered field names in arbitrary order.
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
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

    fn words(
        &self,
        payload: &Range<usize>,
        rows: &Range<usize>,
    ) -> impl Iterator<Item = [u8; 8]> + '_ {
        let start = payload.start + 8 * rows.start;
        let end = payload.start + 8 * rows.end;
        self.reader.as_bytes()[start..end]
            .chunks_exact(8)
            .map(|chunk| {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(chunk);
                raw
            })
    }
}

impl EventSource for ColumnarFile {
    fn n_events(&self) -> usize {
        self.counts.len()
    }

    fn exists(&self, fields: &[&str]) -> bool {
        fields.iter().all(|f| self.fields.contains_key(*f))
    }

    fn read(
        &self,
        fields: &[&str],
        events: Option<Range<usize>>,
    ) -> hitframe_core::Result<HashMap<String, Column>> {
        let events = self.clamp(events);
        let hits = self.offsets[events.start]..self.offsets[events.end];
        let mut out = HashMap::with_capacity(fields.len());
        for &field in fields {
            let entry = self
                .fields
                .get(field)
                .ok_or_else(|| hitframe_core::Error::MissingField(field.to_owned()))?;
            let rows = if entry.event_wise { &events } else { &hits };
            let column = match &entry.payload {
                Payload::I64(payload) => {
                    Column::I64(self.words(payload, rows).map(i64::from_le_bytes).collect())
                }
                Payload::F64(payload) => {
                    Column::F64(self.words(payload, rows).map(f64::from_le_bytes).collect())
                }
                Payload::Str(values) => Column::Str(values[rows.clone()].to_vec()),
            };
            out.insert(field.to_owned(), column);
        }
        Ok(out)
    }
}
