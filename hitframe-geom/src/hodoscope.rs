//! Trigger-hodoscope adapter with upstream/downstream channel views.

use hitframe_core::{EmptyEvents, EventSelection, EventSource, Filter, HitTable, ImportConfig};

use crate::error::{Error, Result};
use crate::layout::Geometry;
use crate::overlay::{GeomConfig, GeomTable};
use crate::resolve::{NamedVolumeResolver, PASSIVE_TAG};

/// Which hodoscope side a query covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Hodoscope {
    /// Both sides.
    #[default]
    Both,
    /// Upstream channels only.
    Up,
    /// Downstream channels only.
    Down,
}

/// Import-plus-overlay settings for a hodoscope source.
#[derive(Debug, Clone)]
pub struct HodoscopeConfig {
    import: ImportConfig,
    geom: GeomConfig,
    name_field: String,
    index_field: String,
}

impl HodoscopeConfig {
    /// Creates a config over the given import and overlay settings; the
    /// channel address defaults to the `vol_name` / `vol_id` columns.
    #[must_use]
    pub fn new(import: ImportConfig, geom: GeomConfig) -> Self {
        Self {
            import,
            geom,
            name_field: "vol_name".to_owned(),
            index_field: "vol_id".to_owned(),
        }
    }

    /// Renames the volume name column.
    #[must_use]
    pub fn with_name_field(mut self, field: &str) -> Self {
        self.name_field = field.to_owned();
        self
    }

    /// Renames the in-ring address column.
    #[must_use]
    pub fn with_index_field(mut self, field: &str) -> Self {
        self.index_field = field.to_owned();
        self
    }
}

/// Channel-level view of the trigger hodoscope.
///
/// Construction drops passive-volume hits and caches the upstream and
/// downstream row partitions; mutations go through forwarding methods
/// that refresh the caches.
#[derive(Debug, Clone)]
pub struct HodoscopeHits<G: Geometry> {
    overlay: GeomTable<G>,
    side_field: String,
    up_rows: Vec<usize>,
    down_rows: Vec<usize>,
}

impl<G: Geometry> HodoscopeHits<G> {
    /// Finalizes an overlay into a hodoscope view: passive hits are
    /// trimmed (events left empty stay, keeping pair numbering intact)
    /// and side partitions cached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSideTags`] when the overlay carries no
    /// side tag column.
    pub fn new(mut overlay: GeomTable<G>) -> Result<Self> {
        let side_field = overlay
            .side_field()
            .ok_or(Error::MissingSideTags)?
            .to_owned();
        let passive = Filter::new().with_values([PASSIVE_TAG]).inverted();
        overlay.trim_hits_with(&side_field, &passive, EmptyEvents::Keep)?;
        let mut hits = Self {
            overlay,
            side_field,
            up_rows: Vec::new(),
            down_rows: Vec::new(),
        };
        hits.refresh_partitions()?;
        Ok(hits)
    }

    /// Imports a source and builds the finalized view in one step.
    ///
    /// # Errors
    ///
    /// Propagates import, overlay, and finalize errors.
    pub fn from_source<S: EventSource>(
        source: &S,
        geometry: G,
        config: &HodoscopeConfig,
    ) -> Result<Self> {
        let table = HitTable::from_source(source, &config.import)?;
        let resolver = NamedVolumeResolver::new(&config.name_field, &config.index_field);
        Self::new(GeomTable::new(table, geometry, &resolver, &config.geom)?)
    }

    /// Returns the geometry overlay.
    #[must_use]
    pub fn overlay(&self) -> &GeomTable<G> {
        &self.overlay
    }

    /// Returns the number of events.
    #[must_use]
    pub fn n_events(&self) -> usize {
        self.overlay.n_events()
    }

    /// Returns the number of hits.
    #[must_use]
    pub fn n_hits(&self) -> usize {
        self.overlay.n_hits()
    }

    /// Returns the cached upstream rows, ascending.
    #[must_use]
    pub fn up_rows(&self) -> &[usize] {
        &self.up_rows
    }

    /// Returns the cached downstream rows, ascending.
    #[must_use]
    pub fn down_rows(&self) -> &[usize] {
        &self.down_rows
    }

    /// Returns the selected events' rows, narrowed to one side.
    ///
    /// # Errors
    ///
    /// Propagates core selection errors.
    pub fn get_events(
        &self,
        selection: impl Into<EventSelection>,
        side: Hodoscope,
    ) -> Result<Vec<usize>> {
        let rows = self.overlay.get_events(selection)?;
        Ok(match side {
            Hodoscope::Both => rows,
            Hodoscope::Up => retain_rows(rows, &self.up_rows),
            Hodoscope::Down => retain_rows(rows, &self.down_rows),
        })
    }

    /// Keeps only hits matching the filter; emptied events are dropped.
    ///
    /// # Errors
    ///
    /// Propagates core errors.
    pub fn trim_hits(&mut self, field: &str, filter: &Filter) -> Result<()> {
        self.overlay.trim_hits(field, filter)?;
        self.refresh_partitions()
    }

    /// Keeps only hits matching the filter with an explicit empty-event
    /// policy.
    ///
    /// # Errors
    ///
    /// Propagates core errors.
    pub fn trim_hits_with(
        &mut self,
        field: &str,
        filter: &Filter,
        empty: EmptyEvents,
    ) -> Result<()> {
        self.overlay.trim_hits_with(field, filter, empty)?;
        self.refresh_partitions()
    }

    /// Keeps only the listed events.
    ///
    /// # Errors
    ///
    /// Propagates core errors.
    pub fn trim_events(&mut self, events: &[usize]) -> Result<()> {
        self.overlay.trim_events(events)?;
        self.refresh_partitions()
    }

    /// Sorts hits within each event by one field.
    ///
    /// # Errors
    ///
    /// Propagates core errors.
    pub fn sort_hits(&mut self, field: &str, ascending: bool, reset_index: bool) -> Result<()> {
        self.overlay.sort_hits(field, ascending, reset_index)?;
        self.refresh_partitions()
    }

    /// Writes one trigger time per event.
    ///
    /// # Errors
    ///
    /// Propagates overlay errors.
    pub fn set_trigger_time(&mut self, per_event: &[f64]) -> Result<()> {
        self.overlay.set_trigger_time(per_event)
    }

    /// Appends another hodoscope's hits over the same geometry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GeometryMismatch`] or core append errors.
    pub fn add_hits(&mut self, other: &HodoscopeHits<G>) -> Result<()> {
        self.overlay.add_hits(&other.overlay)?;
        self.refresh_partitions()
    }

    fn refresh_partitions(&mut self) -> Result<()> {
        let tags = self.overlay.table().values_i64(&self.side_field)?;
        self.up_rows = side_rows(tags, 1);
        self.down_rows = side_rows(tags, 0);
        Ok(())
    }
}

fn side_rows(tags: &[i64], side: i64) -> Vec<usize> {
    tags.iter()
        .enumerate()
        .filter(|&(_, &tag)| tag == side)
        .map(|(row, _)| row)
        .collect()
}

fn retain_rows(rows: Vec<usize>, side_rows: &[usize]) -> Vec<usize> {
    rows.into_iter()
        .filter(|row| side_rows.binary_search(row).is_ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::RingHodoscope;
    use hitframe_core::{Grouping, MemorySource};

    fn hodoscope_config() -> HodoscopeConfig {
        let import = ImportConfig::new(Grouping::Counts("nhits".to_owned()), "hit_type")
            .with_fields(["vol_name", "vol_id", "edep", "t"])
            .with_placeholder_fields(["trig"])
            .with_time_field("t");
        HodoscopeConfig::new(import, GeomConfig::new("edep", "t", "trig"))
    }

    fn sample_source() -> MemorySource {
        MemorySource::new(vec![3, 2])
            .with_event_field("nhits", vec![3i64, 2])
            .unwrap()
            .with_hit_field(
                "vol_name",
                vec![
                    "CherenkovU".to_owned(),
                    "ScintillatorD".to_owned(),
                    "CherenkovGuideU".to_owned(),
                    "CherenkovD".to_owned(),
                    "ScintillatorU".to_owned(),
                ],
            )
            .unwrap()
            .with_hit_field("vol_id", vec![0i64, 2, 1, 3, 1])
            .unwrap()
            .with_hit_field("edep", vec![0.5, 0.25, 9.0, 1.0, 2.0])
            .unwrap()
            .with_hit_field("t", vec![12.0, 7.0, 3.0, 9.0, 4.0])
            .unwrap()
            .with_hit_field("hit_type", vec![1i64, 2, 1, 1, 1])
            .unwrap()
    }

    // two events over Cherenkov/Scintillator rings with a passive guide
    fn hodoscope() -> HodoscopeHits<RingHodoscope> {
        HodoscopeHits::from_source(
            &sample_source(),
            RingHodoscope::new(vec!["Cherenkov", "Scintillator"], vec!["CherenkovGuide"], 4),
            &hodoscope_config(),
        )
        .unwrap()
    }

    #[test]
    fn test_finalize_drops_passive_hits() {
        let hodoscope = hodoscope();
        assert_eq!(hodoscope.n_events(), 2);
        assert_eq!(hodoscope.n_hits(), 4);
        // the guide hit is gone, survivors stay time-sorted
        assert_eq!(
            hodoscope.overlay().table().values_f64("t").unwrap(),
            &[7.0, 12.0, 4.0, 9.0]
        );
        assert_eq!(
            hodoscope.overlay().table().values_i64("side").unwrap(),
            &[0, 1, 1, 0]
        );
    }

    #[test]
    fn test_side_partitions() {
        let hodoscope = hodoscope();
        assert_eq!(hodoscope.up_rows(), &[1, 2]);
        assert_eq!(hodoscope.down_rows(), &[0, 3]);
    }

    #[test]
    fn test_get_events_by_side() {
        let hodoscope = hodoscope();
        assert_eq!(
            hodoscope.get_events(EventSelection::All, Hodoscope::Both).unwrap(),
            vec![0, 1, 2, 3]
        );
        assert_eq!(
            hodoscope.get_events(EventSelection::All, Hodoscope::Up).unwrap(),
            vec![1, 2]
        );
        assert_eq!(
            hodoscope.get_events(1, Hodoscope::Down).unwrap(),
            vec![3]
        );
    }

    #[test]
    fn test_mutation_refreshes_partitions() {
        let mut hodoscope = hodoscope();
        let early = Filter::new().with_less_than(8.0);
        hodoscope.trim_hits_with("t", &early, EmptyEvents::Keep).unwrap();
        assert_eq!(hodoscope.n_events(), 2);
        assert_eq!(
            hodoscope.overlay().table().values_f64("t").unwrap(),
            &[7.0, 4.0]
        );
        assert_eq!(hodoscope.up_rows(), &[1]);
        assert_eq!(hodoscope.down_rows(), &[0]);
    }

    #[test]
    fn test_requires_side_tags() {
        use crate::layout::UniformCylinder;
        use crate::resolve::RowIndexResolver;

        let source = hitframe_core::MemorySource::new(vec![1])
            .with_event_field("nhits", vec![1i64])
            .unwrap()
            .with_hit_field("layer_id", vec![0i64])
            .unwrap()
            .with_hit_field("cell_id", vec![0i64])
            .unwrap()
            .with_hit_field("edep", vec![1.0])
            .unwrap()
            .with_hit_field("t", vec![1.0])
            .unwrap()
            .with_hit_field("hit_type", vec![1i64])
            .unwrap();
        let import = ImportConfig::new(Grouping::Counts("nhits".to_owned()), "hit_type")
            .with_fields(["layer_id", "cell_id", "edep", "t"])
            .with_placeholder_fields(["trig"])
            .with_time_field("t");
        let table = HitTable::from_source(&source, &import).unwrap();
        let overlay = GeomTable::new(
            table,
            UniformCylinder::uniform(1, 4),
            &RowIndexResolver::new("layer_id", "cell_id"),
            &GeomConfig::new("edep", "t", "trig"),
        )
        .unwrap();
        assert!(matches!(
            HodoscopeHits::new(overlay),
            Err(Error::MissingSideTags)
        ));
    }
}
