//! Cylindrical-tracker adapter with dense per-wire measurements.

use ndarray::{Array1, Array2};

use hitframe_core::{EmptyEvents, EventSelection, EventSource, Filter, HitTable, ImportConfig};

use crate::error::{Error, Result};
use crate::layout::Geometry;
use crate::overlay::{GeomConfig, GeomTable, HitKind};
use crate::resolve::RowIndexResolver;

/// Import-plus-overlay settings for a tracker source.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    import: ImportConfig,
    geom: GeomConfig,
    row_field: String,
    index_field: String,
}

impl TrackerConfig {
    /// Creates a config over the given import and overlay settings; the
    /// wire address defaults to the `layer_id` / `cell_id` columns.
    #[must_use]
    pub fn new(import: ImportConfig, geom: GeomConfig) -> Self {
        Self {
            import,
            geom,
            row_field: "layer_id".to_owned(),
            index_field: "cell_id".to_owned(),
        }
    }

    /// Renames the layer address column.
    #[must_use]
    pub fn with_row_field(mut self, field: &str) -> Self {
        self.row_field = field.to_owned();
        self
    }

    /// Renames the in-layer address column.
    #[must_use]
    pub fn with_index_field(mut self, field: &str) -> Self {
        self.index_field = field.to_owned();
        self
    }
}

/// Wire-level view of a cylindrical tracker.
///
/// Measurement accessors scatter per-hit values into dense
/// `[selected events x n_points]` matrices; where two hits of one event
/// land on one wire, the later row silently overwrites the earlier.
#[derive(Debug, Clone)]
pub struct TrackerHits<G: Geometry> {
    overlay: GeomTable<G>,
}

impl<G: Geometry> TrackerHits<G> {
    /// Wraps a finished overlay.
    #[must_use]
    pub fn new(overlay: GeomTable<G>) -> Self {
        Self { overlay }
    }

    /// Imports a source and builds the overlay in one step.
    ///
    /// # Errors
    ///
    /// Propagates import and overlay construction errors.
    pub fn from_source<S: EventSource>(
        source: &S,
        geometry: G,
        config: &TrackerConfig,
    ) -> Result<Self> {
        let table = HitTable::from_source(source, &config.import)?;
        let resolver = RowIndexResolver::new(&config.row_field, &config.index_field);
        Ok(Self::new(GeomTable::new(
            table,
            geometry,
            &resolver,
            &config.geom,
        )?))
    }

    /// Returns the geometry overlay.
    #[must_use]
    pub fn overlay(&self) -> &GeomTable<G> {
        &self.overlay
    }

    /// Returns the geometry overlay for mutation.
    pub fn overlay_mut(&mut self) -> &mut GeomTable<G> {
        &mut self.overlay
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

    /// Returns a dense measurement matrix, one row per selected event and
    /// one column per geometry point, zero-filled away from hits.
    ///
    /// A non-zero `shift` scatters each hit onto its cyclically shifted
    /// wire instead of its own.
    ///
    /// # Errors
    ///
    /// Propagates core selection and column errors.
    pub fn get_measurement(
        &self,
        field: &str,
        selection: impl Into<EventSelection>,
        shift: i64,
    ) -> Result<Array2<f64>> {
        let events = self.overlay.table().selected_events(selection)?;
        self.dense_measurement(field, &events, shift)
    }

    /// Returns one value per selected hit, read back from the dense
    /// matrix at the hit's own wire.
    ///
    /// With a non-zero `shift` each hit reads its shifted neighbor's
    /// value, zero when the neighbor wire is unhit.
    ///
    /// # Errors
    ///
    /// Propagates core selection and column errors.
    pub fn get_measurement_on_hits(
        &self,
        field: &str,
        selection: impl Into<EventSelection>,
        shift: i64,
    ) -> Result<Vec<f64>> {
        Ok(self.get_measurement_by_event(field, selection, shift)?.concat())
    }

    /// Returns per-hit measurement values nested per selected event.
    ///
    /// # Errors
    ///
    /// Propagates core selection and column errors.
    pub fn get_measurement_by_event(
        &self,
        field: &str,
        selection: impl Into<EventSelection>,
        shift: i64,
    ) -> Result<Vec<Vec<f64>>> {
        let events = self.overlay.table().selected_events(selection)?;
        let dense = self.dense_measurement(field, &events, shift)?;
        let ids = self.overlay.table().values_i64(self.overlay.flat_field())?;
        let mut nested = Vec::with_capacity(events.len());
        for (pos, &event) in events.iter().enumerate() {
            let mut per_event = Vec::new();
            for row in self.overlay.table().index().event_hits(event)? {
                per_event.push(dense[[pos, self.overlay.check_point(ids[row])?]]);
            }
            nested.push(per_event);
        }
        Ok(nested)
    }

    /// Splits the touched wires of a selection into even-layer and
    /// odd-layer sets.
    ///
    /// # Errors
    ///
    /// Propagates core selection errors.
    pub fn get_hit_wires_even_odd(
        &self,
        selection: impl Into<EventSelection>,
    ) -> Result<(Vec<i64>, Vec<i64>)> {
        let mut even = Vec::new();
        let mut odd = Vec::new();
        for vol in self.overlay.get_hit_vols(selection, true, HitKind::Both)? {
            let point = self.overlay.check_point(vol)?;
            let parity = self
                .overlay
                .geometry()
                .point_parity(point)
                .ok_or(Error::PointOutOfRange {
                    point: vol,
                    n_points: self.overlay.geometry().n_points(),
                })?;
            if parity == 0 {
                even.push(vol);
            } else {
                odd.push(vol);
            }
        }
        Ok((even, odd))
    }

    /// Returns dense 0/1 hit vectors restricted to even and odd layers.
    ///
    /// # Errors
    ///
    /// Propagates core selection errors.
    pub fn get_hit_vector_even_odd(
        &self,
        selection: impl Into<EventSelection>,
    ) -> Result<(Array1<f64>, Array1<f64>)> {
        let (even_wires, odd_wires) = self.get_hit_wires_even_odd(selection)?;
        let n_points = self.overlay.geometry().n_points();
        let mut even = Array1::zeros(n_points);
        let mut odd = Array1::zeros(n_points);
        for vol in even_wires {
            even[self.overlay.check_point(vol)?] = 1.0;
        }
        for vol in odd_wires {
            odd[self.overlay.check_point(vol)?] = 1.0;
        }
        Ok((even, odd))
    }

    /// Returns the deepest layer holding a signal hit of one event, or
    /// -1 when the event has no signal hits.
    ///
    /// # Errors
    ///
    /// Propagates core selection errors.
    pub fn deepest_signal_layer(&self, event: usize) -> Result<i64> {
        let rows = self.overlay.get_signal_hits(event)?;
        let ids = self
            .overlay
            .table()
            .gather_i64(self.overlay.flat_field(), &rows)?;
        let mut deepest = -1;
        for id in ids {
            let point = self.overlay.check_point(id)?;
            if let Some(layer) = self.overlay.geometry().point_layer(point) {
                deepest = deepest.max(layer);
            }
        }
        Ok(deepest)
    }

    /// Keeps only hits matching the filter; emptied events are dropped.
    ///
    /// # Errors
    ///
    /// Propagates core errors.
    pub fn trim_hits(&mut self, field: &str, filter: &Filter) -> Result<()> {
        self.overlay.trim_hits(field, filter)
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
        self.overlay.trim_hits_with(field, filter, empty)
    }

    /// Keeps only the listed events.
    ///
    /// # Errors
    ///
    /// Propagates core errors.
    pub fn trim_events(&mut self, events: &[usize]) -> Result<()> {
        self.overlay.trim_events(events)
    }

    /// Sorts hits within each event by one field.
    ///
    /// # Errors
    ///
    /// Propagates core errors.
    pub fn sort_hits(&mut self, field: &str, ascending: bool, reset_index: bool) -> Result<()> {
        self.overlay.sort_hits(field, ascending, reset_index)
    }

    /// Writes one trigger time per event.
    ///
    /// # Errors
    ///
    /// Propagates overlay errors.
    pub fn set_trigger_time(&mut self, per_event: &[f64]) -> Result<()> {
        self.overlay.set_trigger_time(per_event)
    }

    /// Appends another tracker's hits over the same geometry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GeometryMismatch`] or core append errors.
    pub fn add_hits(&mut self, other: &TrackerHits<G>) -> Result<()> {
        self.overlay.add_hits(&other.overlay)
    }

    fn dense_measurement(&self, field: &str, events: &[usize], shift: i64) -> Result<Array2<f64>> {
        let values = self.overlay.table().values_f64(field)?;
        let ids = self.overlay.table().values_i64(self.overlay.flat_field())?;
        let perm = self.overlay.geometry().shift_wires(shift);
        let mut dense = Array2::zeros((events.len(), self.overlay.geometry().n_points()));
        for (pos, &event) in events.iter().enumerate() {
            for row in self.overlay.table().index().event_hits(event)? {
                dense[[pos, perm[self.overlay.check_point(ids[row])?]]] = values[row];
            }
        }
        Ok(dense)
    }
}
