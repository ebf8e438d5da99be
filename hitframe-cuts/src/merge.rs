//! Read-only merging of two overlays into combined dense views.

use std::collections::HashMap;

use ndarray::{Array1, Array2};

use hitframe_core::EventSelection;
use hitframe_geom::{GeomTable, Geometry, HitKind};

use crate::error::{Error, Result};

/// How one field combines where both sources hit the same point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeRule {
    /// Add the two values.
    Sum,
    /// Take the smaller value.
    Min,
    /// Take the value from the source whose hit arrived earlier; ties go
    /// to the primary.
    Earliest,
}

/// Field-name to rule mapping; unmapped fields take the primary value.
#[derive(Debug, Clone, Default)]
pub struct MergePolicy {
    rules: HashMap<String, MergeRule>,
}

impl MergePolicy {
    /// Creates an empty policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a rule to one field.
    #[must_use]
    pub fn with_rule(mut self, field: &str, rule: MergeRule) -> Self {
        self.rules.insert(field.to_owned(), rule);
        self
    }

    /// Looks up the rule for a field.
    #[must_use]
    pub fn rule(&self, field: &str) -> Option<MergeRule> {
        self.rules.get(field).copied()
    }
}

/// Combined read-only view over a primary and a secondary overlay.
///
/// Both overlays must agree on schema, geometry size, and event count;
/// event `e` of the merged view covers event `e` of both sources.
pub struct HitsMerger<'a, G: Geometry> {
    first: &'a GeomTable<G>,
    second: &'a GeomTable<G>,
    policy: MergePolicy,
}

impl<'a, G: Geometry> HitsMerger<'a, G> {
    /// Couples the two overlays under a merge policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMismatch`] naming the first disagreement
    /// in fields, geometry size, event count, or configured columns.
    pub fn new(
        first: &'a GeomTable<G>,
        second: &'a GeomTable<G>,
        policy: MergePolicy,
    ) -> Result<Self> {
        if first.table().field_names() != second.table().field_names() {
            return Err(Error::SchemaMismatch(
                "merged tables carry different fields".to_owned(),
            ));
        }
        if first.geometry().n_points() != second.geometry().n_points() {
            return Err(Error::SchemaMismatch(format!(
                "geometries differ: {} vs {} points",
                first.geometry().n_points(),
                second.geometry().n_points()
            )));
        }
        if first.n_events() != second.n_events() {
            return Err(Error::SchemaMismatch(format!(
                "event counts differ: {} vs {}",
                first.n_events(),
                second.n_events()
            )));
        }
        if first.flat_field() != second.flat_field() || first.time_field() != second.time_field()
        {
            return Err(Error::SchemaMismatch(
                "merged tables configure different id or time columns".to_owned(),
            ));
        }
        Ok(Self {
            first,
            second,
            policy,
        })
    }

    /// Returns the number of events.
    #[must_use]
    pub fn n_events(&self) -> usize {
        self.first.n_events()
    }

    /// Returns the number of geometry points.
    #[must_use]
    pub fn n_points(&self) -> usize {
        self.first.geometry().n_points()
    }

    /// Returns the dense combined measurement matrix.
    ///
    /// Points hit by one source pass that source's value through under
    /// any explicit rule; without a rule the primary's hit points pass
    /// and the secondary is ignored.
    ///
    /// # Errors
    ///
    /// Propagates selection and column errors.
    pub fn get_measurement(
        &self,
        field: &str,
        selection: impl Into<EventSelection>,
    ) -> Result<Array2<f64>> {
        let events = self.first.table().selected_events(selection)?;
        let (first_values, first_mask) = scatter(self.first, &events, field)?;
        let (second_values, second_mask) = scatter(self.second, &events, field)?;
        let rule = self.policy.rule(field);
        let times = if rule == Some(MergeRule::Earliest) {
            let time_field = self.first.time_field();
            Some((
                scatter(self.first, &events, time_field)?.0,
                scatter(self.second, &events, time_field)?.0,
            ))
        } else {
            None
        };

        let mut combined = Array2::zeros(first_values.dim());
        for pos in 0..events.len() {
            for point in 0..self.n_points() {
                let cell = [pos, point];
                combined[cell] = match (first_mask[cell], second_mask[cell]) {
                    (false, false) => 0.0,
                    (true, false) => first_values[cell],
                    (false, true) => {
                        if rule.is_some() {
                            second_values[cell]
                        } else {
                            0.0
                        }
                    }
                    (true, true) => match rule {
                        Some(MergeRule::Sum) => first_values[cell] + second_values[cell],
                        Some(MergeRule::Min) => first_values[cell].min(second_values[cell]),
                        Some(MergeRule::Earliest) => match &times {
                            Some((first_times, second_times))
                                if second_times[cell] < first_times[cell] =>
                            {
                                second_values[cell]
                            }
                            _ => first_values[cell],
                        },
                        None => first_values[cell],
                    },
                };
            }
        }
        Ok(combined)
    }

    /// Returns both sources' touched geometry ids, concatenated; sorted
    /// and deduplicated when `unique`.
    ///
    /// # Errors
    ///
    /// Propagates selection errors.
    pub fn get_hit_vols(
        &self,
        selection: impl Into<EventSelection>,
        unique: bool,
    ) -> Result<Vec<i64>> {
        let selection = selection.into();
        let mut vols = self
            .first
            .get_hit_vols(selection.clone(), false, HitKind::Both)?;
        vols.extend(self.second.get_hit_vols(selection, false, HitKind::Both)?);
        if unique {
            vols.sort_unstable();
            vols.dedup();
        }
        Ok(vols)
    }

    /// Returns the dense 0/1 union of both sources' hit vectors.
    ///
    /// # Errors
    ///
    /// Propagates selection errors.
    pub fn get_hit_vector(&self, selection: impl Into<EventSelection>) -> Result<Array1<f64>> {
        let selection = selection.into();
        let mut vector = self.first.get_hit_vector(selection.clone())?;
        let second = self.second.get_hit_vector(selection)?;
        for (value, other) in vector.iter_mut().zip(second.iter()) {
            *value = value.max(*other);
        }
        Ok(vector)
    }

    /// Returns the dense hit-type union; signal wins over background
    /// across both sources.
    ///
    /// # Errors
    ///
    /// Propagates selection errors.
    pub fn get_hit_types(&self, selection: impl Into<EventSelection>) -> Result<Array1<i64>> {
        let selection = selection.into();
        let mut types = Array1::zeros(self.n_points());
        for source in [self.first, self.second] {
            for vol in source.get_bkg_vols(selection.clone(), true)? {
                types[check_point(vol, self.n_points())?] = 2;
            }
        }
        for source in [self.first, self.second] {
            for vol in source.get_sig_vols(selection.clone(), true)? {
                types[check_point(vol, self.n_points())?] = 1;
            }
        }
        Ok(types)
    }
}

fn scatter<G: Geometry>(
    table: &GeomTable<G>,
    events: &[usize],
    field: &str,
) -> Result<(Array2<f64>, Array2<bool>)> {
    let values = table.table().values_f64(field)?;
    let ids = table.table().values_i64(table.flat_field())?;
    let n_points = table.geometry().n_points();
    let mut dense = Array2::zeros((events.len(), n_points));
    let mut mask = Array2::from_elem((events.len(), n_points), false);
    for (pos, &event) in events.iter().enumerate() {
        for row in table.table().index().event_hits(event)? {
            let point = check_point(ids[row], n_points)?;
            dense[[pos, point]] = values[row];
            mask[[pos, point]] = true;
        }
    }
    Ok((dense, mask))
}

fn check_point(id: i64, n_points: usize) -> Result<usize> {
    usize::try_from(id)
        .ok()
        .filter(|&point| point < n_points)
        .ok_or(Error::GeomError(
            hitframe_geom::Error::PointOutOfRange {
                point: id,
                n_points,
            },
        ))
}
