//! Geometry overlay over flat hit tables.
//!
//! A [`GeomTable`] decorates a [`HitTable`] with a flat geometry id per
//! hit, resolved once at construction and carried through every trim,
//! sort, and append as an ordinary column. All volume-level queries go
//! through the id column; the raw row/index fields are never consulted
//! again.

use ndarray::Array1;
use tracing::debug;

use hitframe_core::{EmptyEvents, EventSelection, Filter, HitTable};

use crate::error::{Error, Result};
use crate::layout::Geometry;
use crate::resolve::ChannelResolver;

/// Default name of the flat geometry id column.
pub const FLAT_ID: &str = "flat_id";

/// Default name of the upstream/downstream side tag column.
pub const SIDE_TAG: &str = "side";

/// Which hits a volume query covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HitKind {
    /// Signal and background hits together.
    #[default]
    Both,
    /// Signal hits only.
    Signal,
    /// Background hits only.
    Background,
}

/// Overlay-time description of the geometry columns.
#[derive(Debug, Clone)]
pub struct GeomConfig {
    flat_field: String,
    side_field: String,
    energy_field: String,
    time_field: String,
    trigger_field: String,
}

impl GeomConfig {
    /// Creates a config naming the energy, time, and trigger columns.
    #[must_use]
    pub fn new(energy_field: &str, time_field: &str, trigger_field: &str) -> Self {
        Self {
            flat_field: FLAT_ID.to_owned(),
            side_field: SIDE_TAG.to_owned(),
            energy_field: energy_field.to_owned(),
            time_field: time_field.to_owned(),
            trigger_field: trigger_field.to_owned(),
        }
    }

    /// Renames the derived flat id column.
    #[must_use]
    pub fn with_flat_field(mut self, field: &str) -> Self {
        self.flat_field = field.to_owned();
        self
    }

    /// Renames the derived side tag column.
    #[must_use]
    pub fn with_side_field(mut self, field: &str) -> Self {
        self.side_field = field.to_owned();
        self
    }
}

/// A hit table bound to a detector geometry.
#[derive(Debug, Clone)]
pub struct GeomTable<G: Geometry> {
    table: HitTable,
    geometry: G,
    flat_field: String,
    side_field: Option<String>,
    energy_field: String,
    time_field: String,
    trigger_field: String,
    trigger_set: bool,
}

impl<G: Geometry> GeomTable<G> {
    /// Builds the overlay: resolves every hit to a flat point id, adds
    /// the id (and side tag, when the resolver derives one) as columns,
    /// ensures a trigger column exists, and sorts hits by time within
    /// each event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnmappedGeometry`] for unresolvable hits and
    /// core errors for absent energy or time columns.
    pub fn new<R: ChannelResolver>(
        mut table: HitTable,
        geometry: G,
        resolver: &R,
        config: &GeomConfig,
    ) -> Result<Self> {
        table.values_f64(&config.energy_field)?;
        table.values_f64(&config.time_field)?;

        let trigger_set = if table.has_field(&config.trigger_field) {
            !table.was_placeholder(&config.trigger_field)
        } else {
            table.push_column(&config.trigger_field, vec![0.0; table.n_hits()])?;
            false
        };

        let resolved = resolver.resolve(&table, &geometry)?;
        table.push_column(&config.flat_field, resolved.flat_ids)?;
        let side_field = match resolved.side_tags {
            Some(tags) => {
                table.push_column(&config.side_field, tags)?;
                Some(config.side_field.clone())
            }
            None => None,
        };

        table.sort_hits(&config.time_field, true, true)?;
        debug!(
            n_events = table.n_events(),
            n_hits = table.n_hits(),
            n_points = geometry.n_points(),
            "built geometry overlay"
        );
        Ok(Self {
            table,
            geometry,
            flat_field: config.flat_field.clone(),
            side_field,
            energy_field: config.energy_field.clone(),
            time_field: config.time_field.clone(),
            trigger_field: config.trigger_field.clone(),
            trigger_set,
        })
    }

    /// Returns the underlying table, read-only.
    #[must_use]
    pub fn table(&self) -> &HitTable {
        &self.table
    }

    /// Returns the geometry provider.
    #[must_use]
    pub fn geometry(&self) -> &G {
        &self.geometry
    }

    /// Returns the number of events.
    #[must_use]
    pub fn n_events(&self) -> usize {
        self.table.n_events()
    }

    /// Returns the number of hits.
    #[must_use]
    pub fn n_hits(&self) -> usize {
        self.table.n_hits()
    }

    /// Returns the name of the flat geometry id column.
    #[must_use]
    pub fn flat_field(&self) -> &str {
        &self.flat_field
    }

    /// Returns the name of the side tag column, when one was derived.
    #[must_use]
    pub fn side_field(&self) -> Option<&str> {
        self.side_field.as_deref()
    }

    /// Returns the name of the hit time column.
    #[must_use]
    pub fn time_field(&self) -> &str {
        &self.time_field
    }

    /// Returns the name of the trigger time column.
    #[must_use]
    pub fn trigger_field(&self) -> &str {
        &self.trigger_field
    }

    /// Returns true once trigger times carry real data.
    #[must_use]
    pub fn has_trigger_time(&self) -> bool {
        self.trigger_set
    }

    /// Returns the flat rows of the selected events.
    ///
    /// # Errors
    ///
    /// Propagates core selection errors.
    pub fn get_events(&self, selection: impl Into<EventSelection>) -> Result<Vec<usize>> {
        Ok(self.table.get_events(selection)?)
    }

    /// Returns the signal rows of the selected events.
    ///
    /// # Errors
    ///
    /// Propagates core selection errors.
    pub fn get_signal_hits(&self, selection: impl Into<EventSelection>) -> Result<Vec<usize>> {
        Ok(self.table.get_signal_hits(selection)?)
    }

    /// Returns the background rows of the selected events.
    ///
    /// # Errors
    ///
    /// Propagates core selection errors.
    pub fn get_background_hits(&self, selection: impl Into<EventSelection>) -> Result<Vec<usize>> {
        Ok(self.table.get_background_hits(selection)?)
    }

    /// Returns rows for the given hit kind.
    ///
    /// # Errors
    ///
    /// Propagates core selection errors.
    pub fn get_kind_hits(
        &self,
        selection: impl Into<EventSelection>,
        kind: HitKind,
    ) -> Result<Vec<usize>> {
        match kind {
            HitKind::Both => self.get_events(selection),
            HitKind::Signal => self.get_signal_hits(selection),
            HitKind::Background => self.get_background_hits(selection),
        }
    }

    /// Returns the geometry ids touched by the selected events: a sorted
    /// set when `unique`, the per-hit multiset otherwise.
    ///
    /// # Errors
    ///
    /// Propagates core selection errors.
    pub fn get_hit_vols(
        &self,
        selection: impl Into<EventSelection>,
        unique: bool,
        kind: HitKind,
    ) -> Result<Vec<i64>> {
        let rows = self.get_kind_hits(selection, kind)?;
        let mut vols = self.table.gather_i64(&self.flat_field, &rows)?;
        if unique {
            vols.sort_unstable();
            vols.dedup();
        }
        Ok(vols)
    }

    /// Returns the geometry ids with signal hits.
    ///
    /// # Errors
    ///
    /// Propagates core selection errors.
    pub fn get_sig_vols(
        &self,
        selection: impl Into<EventSelection>,
        unique: bool,
    ) -> Result<Vec<i64>> {
        self.get_hit_vols(selection, unique, HitKind::Signal)
    }

    /// Returns the geometry ids with background hits.
    ///
    /// # Errors
    ///
    /// Propagates core selection errors.
    pub fn get_bkg_vols(
        &self,
        selection: impl Into<EventSelection>,
        unique: bool,
    ) -> Result<Vec<i64>> {
        self.get_hit_vols(selection, unique, HitKind::Background)
    }

    /// Returns a dense 0/1 vector over all geometry points, 1 where the
    /// selected events have a hit.
    ///
    /// # Errors
    ///
    /// Propagates core selection errors; fails with
    /// [`Error::PointOutOfRange`] if an id column was overwritten with
    /// ids the geometry does not have.
    pub fn get_hit_vector(&self, selection: impl Into<EventSelection>) -> Result<Array1<f64>> {
        let mut vector = Array1::zeros(self.geometry.n_points());
        for vol in self.get_hit_vols(selection, true, HitKind::Both)? {
            vector[self.check_point(vol)?] = 1.0;
        }
        Ok(vector)
    }

    /// Returns a dense hit-type vector over all geometry points: 0 for
    /// no hit, 1 for signal, 2 for background. Signal wins when both
    /// kinds land on one point.
    ///
    /// # Errors
    ///
    /// Propagates core selection errors and [`Error::PointOutOfRange`].
    pub fn get_hit_types(&self, selection: impl Into<EventSelection>) -> Result<Array1<i64>> {
        let selection = selection.into();
        let mut types = Array1::zeros(self.geometry.n_points());
        for vol in self.get_hit_vols(selection.clone(), true, HitKind::Background)? {
            types[self.check_point(vol)?] = 2;
        }
        for vol in self.get_hit_vols(selection, true, HitKind::Signal)? {
            types[self.check_point(vol)?] = 1;
        }
        Ok(types)
    }

    /// Returns one `f64` measurement per hit of the selected events.
    ///
    /// # Errors
    ///
    /// Propagates core selection and column errors.
    pub fn get_measurement(
        &self,
        field: &str,
        selection: impl Into<EventSelection>,
    ) -> Result<Vec<f64>> {
        let rows = self.get_events(selection)?;
        Ok(self.table.gather_f64(field, &rows)?)
    }

    /// Returns the energy deposit of every selected hit.
    ///
    /// # Errors
    ///
    /// Propagates core selection errors.
    pub fn get_energy_deposits(
        &self,
        selection: impl Into<EventSelection>,
    ) -> Result<Vec<f64>> {
        self.get_measurement(&self.energy_field, selection)
    }

    /// Returns the time of every selected hit.
    ///
    /// # Errors
    ///
    /// Propagates core selection errors.
    pub fn get_hit_time(&self, selection: impl Into<EventSelection>) -> Result<Vec<f64>> {
        self.get_measurement(&self.time_field, selection)
    }

    /// Returns the trigger time of every selected hit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TriggerNotSet`] until trigger times carry real
    /// data.
    pub fn get_trigger_time(&self, selection: impl Into<EventSelection>) -> Result<Vec<f64>> {
        if !self.trigger_set {
            return Err(Error::TriggerNotSet);
        }
        self.get_measurement(&self.trigger_field, selection)
    }

    /// Returns hit time minus trigger time for every selected hit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TriggerNotSet`] until trigger times carry real
    /// data.
    pub fn get_relative_time(&self, selection: impl Into<EventSelection>) -> Result<Vec<f64>> {
        let selection = selection.into();
        let trigger = self.get_trigger_time(selection.clone())?;
        let time = self.get_hit_time(selection)?;
        Ok(time
            .iter()
            .zip(trigger.iter())
            .map(|(&t, &trig)| t - trig)
            .collect())
    }

    /// Writes one trigger time per event, broadcast to that event's
    /// hits, and marks the trigger column populated.
    ///
    /// # Errors
    ///
    /// Returns a core `FieldLength` error unless exactly one value per
    /// event is given.
    pub fn set_trigger_time(&mut self, per_event: &[f64]) -> Result<()> {
        if per_event.len() != self.n_events() {
            return Err(hitframe_core::Error::FieldLength {
                field: self.trigger_field.clone(),
                len: per_event.len(),
                n_events: self.n_events(),
                n_hits: self.n_hits(),
            }
            .into());
        }
        let broadcast: Vec<f64> = self
            .table
            .index()
            .hits_to_events()
            .iter()
            .map(|&event| per_event[event])
            .collect();
        self.table.set_column(&self.trigger_field, broadcast)?;
        self.trigger_set = true;
        Ok(())
    }

    /// Adds a column holding each hit's geometry layer.
    ///
    /// # Errors
    ///
    /// Propagates core column errors and [`Error::PointOutOfRange`].
    pub fn derive_layer_column(&mut self, field: &str) -> Result<()> {
        let layers = self.map_points(|geometry, point| geometry.point_layer(point))?;
        Ok(self.table.push_column(field, layers)?)
    }

    /// Adds a column holding each hit's in-layer index.
    ///
    /// # Errors
    ///
    /// Propagates core column errors and [`Error::PointOutOfRange`].
    pub fn derive_index_column(&mut self, field: &str) -> Result<()> {
        let indices = self.map_points(|geometry, point| geometry.point_index(point))?;
        Ok(self.table.push_column(field, indices)?)
    }

    /// Keeps only hits matching the filter; emptied events are dropped.
    ///
    /// # Errors
    ///
    /// Propagates core errors.
    pub fn trim_hits(&mut self, field: &str, filter: &Filter) -> Result<()> {
        Ok(self.table.trim_hits(field, filter)?)
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
        Ok(self.table.trim_hits_with(field, filter, empty)?)
    }

    /// Keeps only the listed events.
    ///
    /// # Errors
    ///
    /// Propagates core errors.
    pub fn trim_events(&mut self, events: &[usize]) -> Result<()> {
        Ok(self.table.trim_events(events)?)
    }

    /// Sorts hits within each event by one field.
    ///
    /// # Errors
    ///
    /// Propagates core errors.
    pub fn sort_hits(&mut self, field: &str, ascending: bool, reset_index: bool) -> Result<()> {
        Ok(self.table.sort_hits(field, ascending, reset_index)?)
    }

    /// Appends another overlay's hits; both must share one geometry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GeometryMismatch`] for differing point counts,
    /// otherwise propagates core append errors.
    pub fn add_hits(&mut self, other: &GeomTable<G>) -> Result<()> {
        if self.geometry.n_points() != other.geometry.n_points() {
            return Err(Error::GeometryMismatch {
                first: self.geometry.n_points(),
                second: other.geometry.n_points(),
            });
        }
        Ok(self.table.add_hits(&other.table)?)
    }

    /// Replaces an existing column. Writing the trigger column marks it
    /// populated.
    ///
    /// # Errors
    ///
    /// Propagates core errors.
    pub fn set_column<C: Into<hitframe_core::Column>>(
        &mut self,
        field: &str,
        column: C,
    ) -> Result<()> {
        self.table.set_column(field, column)?;
        if field == self.trigger_field {
            self.trigger_set = true;
        }
        Ok(())
    }

    /// Rewrites every value of an `f64` column in place.
    ///
    /// # Errors
    ///
    /// Propagates core errors.
    pub fn transform_f64<F: Fn(f64) -> f64>(&mut self, field: &str, f: F) -> Result<()> {
        Ok(self.table.transform_f64(field, f)?)
    }

    /// Converts a flat id cell to a checked point index.
    pub(crate) fn check_point(&self, id: i64) -> Result<usize> {
        usize::try_from(id)
            .ok()
            .filter(|&point| point < self.geometry.n_points())
            .ok_or(Error::PointOutOfRange {
                point: id,
                n_points: self.geometry.n_points(),
            })
    }

    fn map_points<F>(&self, f: F) -> Result<Vec<i64>>
    where
        F: Fn(&G, usize) -> Option<i64>,
    {
        let ids = self.table.values_i64(&self.flat_field)?;
        let mut mapped = Vec::with_capacity(ids.len());
        for &id in ids {
            let point = self.check_point(id)?;
            mapped.push(f(&self.geometry, point).ok_or(Error::PointOutOfRange {
                point: id,
                n_points: self.geometry.n_points(),
            })?);
        }
        Ok(mapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::UniformCylinder;
    use crate::resolve::RowIndexResolver;
    use approx::assert_relative_eq;
    use hitframe_core::{Grouping, ImportConfig, MemorySource};

    // two events over a 2-layer, 4-wire-per-layer cylinder
    fn overlay() -> GeomTable<UniformCylinder> {
        let source = MemorySource::new(vec![3, 2])
            .with_event_field("nhits", vec![3i64, 2])
            .unwrap()
            .with_hit_field("layer_id", vec![0i64, 0, 1, 1, 0])
            .unwrap()
            .with_hit_field("cell_id", vec![2i64, 1, 3, 0, 2])
            .unwrap()
            .with_hit_field("edep", vec![0.5, 0.25, 1.0, 2.0, 0.75])
            .unwrap()
            .with_hit_field("t", vec![20.0, 10.0, 30.0, 15.0, 5.0])
            .unwrap()
            .with_hit_field("hit_type", vec![1i64, 2, 1, 1, 2])
            .unwrap();
        let config = ImportConfig::new(Grouping::Counts("nhits".to_owned()), "hit_type")
            .with_fields(["layer_id", "cell_id", "edep", "t"])
            .with_placeholder_fields(["trig"])
            .with_time_field("t");
        let table = HitTable::from_source(&source, &config).unwrap();
        GeomTable::new(
            table,
            UniformCylinder::uniform(2, 4),
            &RowIndexResolver::new("layer_id", "cell_id"),
            &GeomConfig::new("edep", "t", "trig"),
        )
        .unwrap()
    }

    #[test]
    fn test_construction_sorts_by_time() {
        let overlay = overlay();
        assert_eq!(
            overlay.table().values_f64("t").unwrap(),
            &[10.0, 20.0, 30.0, 5.0, 15.0]
        );
        // ids follow their hits through the sort
        assert_eq!(
            overlay.table().values_i64(FLAT_ID).unwrap(),
            &[1, 2, 7, 2, 4]
        );
        overlay.table().index().validate().unwrap();
    }

    #[test]
    fn test_hit_vols_unique_and_multiset() {
        let overlay = overlay();
        assert_eq!(
            overlay.get_hit_vols(EventSelection::All, true, HitKind::Both).unwrap(),
            vec![1, 2, 4, 7]
        );
        assert_eq!(
            overlay.get_hit_vols(EventSelection::All, false, HitKind::Both).unwrap(),
            vec![1, 2, 7, 2, 4]
        );
        assert_eq!(overlay.get_sig_vols(0, true).unwrap(), vec![2, 7]);
        assert_eq!(overlay.get_bkg_vols(0, true).unwrap(), vec![1]);
    }

    #[test]
    fn test_hit_vector_dense() {
        let overlay = overlay();
        let vector = overlay.get_hit_vector(0).unwrap();
        assert_eq!(vector.len(), 8);
        assert_relative_eq!(vector[1], 1.0);
        assert_relative_eq!(vector[2], 1.0);
        assert_relative_eq!(vector[7], 1.0);
        assert_relative_eq!(vector[0], 0.0);
    }

    #[test]
    fn test_hit_types_signal_priority() {
        // wire 2 carries a signal hit in event 0 and a background hit in
        // event 1; selecting both events must report signal
        let overlay = overlay();
        let types = overlay.get_hit_types(EventSelection::All).unwrap();
        assert_eq!(types[2], 1);
        assert_eq!(types[1], 2);
        assert_eq!(types[4], 1);
        assert_eq!(types[7], 1);
        assert_eq!(types[0], 0);
    }

    #[test]
    fn test_trigger_time_lifecycle() {
        let mut overlay = overlay();
        assert!(!overlay.has_trigger_time());
        assert!(matches!(
            overlay.get_trigger_time(EventSelection::All),
            Err(Error::TriggerNotSet)
        ));
        overlay.set_trigger_time(&[8.0, 3.0]).unwrap();
        assert!(overlay.has_trigger_time());
        assert_eq!(
            overlay.get_trigger_time(EventSelection::All).unwrap(),
            vec![8.0, 8.0, 8.0, 3.0, 3.0]
        );
        let relative = overlay.get_relative_time(EventSelection::All).unwrap();
        assert_eq!(relative, vec![2.0, 12.0, 22.0, 2.0, 12.0]);
        assert!(overlay.set_trigger_time(&[1.0]).is_err());
    }

    #[test]
    fn test_derived_layer_and_index_columns() {
        let mut overlay = overlay();
        overlay.derive_layer_column("layer").unwrap();
        overlay.derive_index_column("cell").unwrap();
        assert_eq!(
            overlay.table().values_i64("layer").unwrap(),
            &[0, 0, 1, 0, 1]
        );
        assert_eq!(
            overlay.table().values_i64("cell").unwrap(),
            &[1, 2, 3, 2, 0]
        );
    }

    #[test]
    fn test_trim_keeps_ids_aligned() {
        let mut overlay = overlay();
        let window = Filter::new().with_greater_than(7.0).with_less_than(25.0);
        overlay.trim_hits("t", &window).unwrap();
        assert_eq!(overlay.n_events(), 2);
        assert_eq!(overlay.table().values_f64("t").unwrap(), &[10.0, 20.0, 15.0]);
        assert_eq!(overlay.table().values_i64(FLAT_ID).unwrap(), &[1, 2, 4]);
        overlay.table().index().validate().unwrap();
    }
}
