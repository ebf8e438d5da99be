//! Channel resolution strategies.
//!
//! A resolver turns each hit's raw geometry fields into a flat point id
//! at overlay construction. The tracker carries numeric (layer, cell)
//! pairs; the hodoscope carries volume names with an upstream/downstream
//! suffix that doubles as a side tag.

use hitframe_core::HitTable;

use crate::error::{Error, Result};
use crate::layout::Geometry;

/// Tag value for hits in passive volumes, dropped at finalize.
pub const PASSIVE_TAG: i64 = -1;

/// The columns a resolver derives for every hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Flat point id per hit.
    pub flat_ids: Vec<i64>,
    /// Side tag per hit (1 upstream, 0 downstream, -1 passive), for
    /// layouts with a position suffix.
    pub side_tags: Option<Vec<i64>>,
}

/// Turns raw per-hit geometry fields into flat point ids.
pub trait ChannelResolver {
    /// Resolves every hit of the table against a geometry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnmappedGeometry`] naming the first pair that
    /// does not resolve.
    fn resolve(&self, table: &HitTable, geometry: &dyn Geometry) -> Result<Resolved>;
}

/// Resolver for numeric (layer row, in-layer index) column pairs.
#[derive(Debug, Clone)]
pub struct RowIndexResolver {
    row_field: String,
    index_field: String,
}

impl RowIndexResolver {
    /// Creates a resolver reading the two named `i64` columns.
    #[must_use]
    pub fn new(row_field: &str, index_field: &str) -> Self {
        Self {
            row_field: row_field.to_owned(),
            index_field: index_field.to_owned(),
        }
    }
}

impl ChannelResolver for RowIndexResolver {
    #[allow(clippy::cast_possible_wrap)]
    fn resolve(&self, table: &HitTable, geometry: &dyn Geometry) -> Result<Resolved> {
        let rows = table.values_i64(&self.row_field)?;
        let indices = table.values_i64(&self.index_field)?;
        let mut flat_ids = Vec::with_capacity(rows.len());
        for (&row, &index) in rows.iter().zip(indices.iter()) {
            let point =
                geometry
                    .point_lookup(row, index)
                    .ok_or_else(|| Error::UnmappedGeometry {
                        row: row.to_string(),
                        index,
                    })?;
            flat_ids.push(point as i64);
        }
        Ok(Resolved {
            flat_ids,
            side_tags: None,
        })
    }
}

/// Resolver for named volumes with a positional suffix.
///
/// The trailing position token is split off the volume name; the base
/// name goes through the geometry's name-to-row table and the token through
/// its position-code table. Hits in passive volumes are tagged
/// [`PASSIVE_TAG`] regardless of suffix.
#[derive(Debug, Clone)]
pub struct NamedVolumeResolver {
    name_field: String,
    index_field: String,
}

impl NamedVolumeResolver {
    /// Creates a resolver reading a string name column and an `i64`
    /// index column.
    #[must_use]
    pub fn new(name_field: &str, index_field: &str) -> Self {
        Self {
            name_field: name_field.to_owned(),
            index_field: index_field.to_owned(),
        }
    }
}

/// Splits a trailing position token off a volume name.
fn split_name<'a>(geometry: &dyn Geometry, name: &'a str) -> (&'a str, Option<i64>) {
    if let Some((at, _)) = name.char_indices().next_back() {
        let (base, token) = name.split_at(at);
        if let Some(tag) = geometry.pos_to_col(token) {
            return (base, Some(tag));
        }
    }
    (name, None)
}

impl ChannelResolver for NamedVolumeResolver {
    #[allow(clippy::cast_possible_wrap)]
    fn resolve(&self, table: &HitTable, geometry: &dyn Geometry) -> Result<Resolved> {
        let names = table.values_str(&self.name_field)?;
        let indices = table.values_i64(&self.index_field)?;
        let mut flat_ids = Vec::with_capacity(names.len());
        let mut side_tags = Vec::with_capacity(names.len());
        for (name, &index) in names.iter().zip(indices.iter()) {
            let (base, tag) = split_name(geometry, name);
            let row = geometry
                .name_to_row(base)
                .ok_or_else(|| Error::UnmappedGeometry {
                    row: name.clone(),
                    index,
                })?;
            let point =
                geometry
                    .point_lookup(row, index)
                    .ok_or_else(|| Error::UnmappedGeometry {
                        row: name.clone(),
                        index,
                    })?;
            flat_ids.push(point as i64);
            if geometry.passive_names().iter().any(|n| n == base) {
                side_tags.push(PASSIVE_TAG);
            } else {
                side_tags.push(tag.ok_or_else(|| Error::UnmappedGeometry {
                    row: name.clone(),
                    index,
                })?);
            }
        }
        Ok(Resolved {
            flat_ids,
            side_tags: Some(side_tags),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{RingHodoscope, UniformCylinder};
    use hitframe_core::{Grouping, ImportConfig, MemorySource};

    fn tracker_table() -> HitTable {
        let source = MemorySource::new(vec![2, 1])
            .with_event_field("nhits", vec![2i64, 1])
            .unwrap()
            .with_hit_field("layer_id", vec![0i64, 1, 1])
            .unwrap()
            .with_hit_field("cell_id", vec![3i64, 0, 5])
            .unwrap()
            .with_hit_field("hit_type", vec![1i64, 2, 1])
            .unwrap();
        let config = ImportConfig::new(Grouping::Counts("nhits".to_owned()), "hit_type")
            .with_fields(["layer_id", "cell_id"]);
        HitTable::from_source(&source, &config).unwrap()
    }

    #[test]
    fn test_row_index_resolution() {
        let table = tracker_table();
        let geom = UniformCylinder::new(vec![4, 6]);
        let resolver = RowIndexResolver::new("layer_id", "cell_id");
        let resolved = resolver.resolve(&table, &geom).unwrap();
        assert_eq!(resolved.flat_ids, vec![3, 4, 9]);
        assert!(resolved.side_tags.is_none());
    }

    #[test]
    fn test_row_index_unmapped_pair() {
        let table = tracker_table();
        // second layer only has 4 cells, so cell 5 cannot resolve
        let geom = UniformCylinder::new(vec![4, 4]);
        let resolver = RowIndexResolver::new("layer_id", "cell_id");
        let err = resolver.resolve(&table, &geom).unwrap_err();
        assert!(matches!(
            err,
            Error::UnmappedGeometry { index: 5, .. }
        ));
    }

    fn hodoscope_table() -> HitTable {
        let source = MemorySource::new(vec![4])
            .with_event_field("nhits", vec![4i64])
            .unwrap()
            .with_hit_field(
                "vol_name",
                vec![
                    "CherenkovU".to_owned(),
                    "ScintillatorD".to_owned(),
                    "CherenkovGuideU".to_owned(),
                    "CherenkovU".to_owned(),
                ],
            )
            .unwrap()
            .with_hit_field("vol_id", vec![0i64, 2, 1, 3])
            .unwrap()
            .with_hit_field("hit_type", vec![1i64, 1, 2, 2])
            .unwrap();
        let config = ImportConfig::new(Grouping::Counts("nhits".to_owned()), "hit_type")
            .with_fields(["vol_name", "vol_id"]);
        HitTable::from_source(&source, &config).unwrap()
    }

    #[test]
    fn test_named_volume_resolution_with_tags() {
        let table = hodoscope_table();
        let geom = RingHodoscope::new(
            vec!["Cherenkov", "Scintillator"],
            vec!["CherenkovGuide"],
            4,
        );
        let resolver = NamedVolumeResolver::new("vol_name", "vol_id");
        let resolved = resolver.resolve(&table, &geom).unwrap();
        assert_eq!(resolved.flat_ids, vec![0, 6, 9, 3]);
        assert_eq!(resolved.side_tags, Some(vec![1, 0, PASSIVE_TAG, 1]));
    }

    #[test]
    fn test_named_volume_unknown_name() {
        let table = hodoscope_table();
        let geom = RingHodoscope::new(vec!["Cherenkov"], vec!["CherenkovGuide"], 4);
        let resolver = NamedVolumeResolver::new("vol_name", "vol_id");
        let err = resolver.resolve(&table, &geom).unwrap_err();
        assert!(matches!(
            err,
            Error::UnmappedGeometry { row, .. } if row == "ScintillatorD"
        ));
    }
}
