//! Detector geometry provider contract and reference layouts.
//!
//! The engine never hard-codes a detector: everything geometric comes
//! through the [`Geometry`] trait. The reference implementations here
//! model a cylindrical wire tracker ([`UniformCylinder`]) and a two-ring
//! trigger hodoscope ([`RingHodoscope`]); production providers live
//! outside this crate.

/// A detector layout addressed by flat point ids.
///
/// Points are numbered `0..n_points`, layer by layer, ascending in-layer
/// index within each layer. Name-based methods have empty defaults so
/// purely numeric layouts only implement the core lookups.
pub trait Geometry {
    /// Returns the total number of geometry points.
    fn n_points(&self) -> usize;

    /// Resolves a (layer row, in-layer index) pair to a flat point id.
    fn point_lookup(&self, row: i64, index: i64) -> Option<usize>;

    /// Returns the layer of a point.
    fn point_layer(&self, point: usize) -> Option<i64>;

    /// Returns the in-layer index of a point.
    fn point_index(&self, point: usize) -> Option<i64>;

    /// Returns the layer parity of a point, 0 for even layers and 1 for
    /// odd layers.
    fn point_parity(&self, point: usize) -> Option<i64>;

    /// Returns the permutation that maps each point to the point `offset`
    /// places away within its layer, wrapping cyclically.
    fn shift_wires(&self, offset: i64) -> Vec<usize>;

    /// Translates a volume name to a layer row.
    fn name_to_row(&self, _name: &str) -> Option<i64> {
        None
    }

    /// Returns the active volume base names.
    fn active_names(&self) -> &[String] {
        &[]
    }

    /// Returns the passive volume base names.
    fn passive_names(&self) -> &[String] {
        &[]
    }

    /// Translates a position token (such as an upstream/downstream
    /// suffix) to a tag value.
    fn pos_to_col(&self, _token: &str) -> Option<i64> {
        None
    }
}

/// A cylindrical layout: concentric layers, each with its own number of
/// points, numbered innermost layer first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformCylinder {
    points_per_layer: Vec<usize>,
    first_point: Vec<usize>,
    n_points: usize,
}

impl UniformCylinder {
    /// Creates a cylinder from per-layer point counts.
    #[must_use]
    pub fn new(points_per_layer: Vec<usize>) -> Self {
        let mut first_point = Vec::with_capacity(points_per_layer.len());
        let mut total = 0usize;
        for &count in &points_per_layer {
            first_point.push(total);
            total += count;
        }
        Self {
            points_per_layer,
            first_point,
            n_points: total,
        }
    }

    /// Creates a cylinder with the same number of points in every layer.
    #[must_use]
    pub fn uniform(n_layers: usize, points_per_layer: usize) -> Self {
        Self::new(vec![points_per_layer; n_layers])
    }

    /// Returns the number of layers.
    #[must_use]
    pub fn n_layers(&self) -> usize {
        self.points_per_layer.len()
    }

    fn layer_of(&self, point: usize) -> Option<usize> {
        if point >= self.n_points {
            return None;
        }
        Some(self.first_point.partition_point(|&first| first <= point) - 1)
    }
}

impl Geometry for UniformCylinder {
    fn n_points(&self) -> usize {
        self.n_points
    }

    fn point_lookup(&self, row: i64, index: i64) -> Option<usize> {
        let row = usize::try_from(row).ok()?;
        let index = usize::try_from(index).ok()?;
        if row >= self.points_per_layer.len() || index >= self.points_per_layer[row] {
            return None;
        }
        Some(self.first_point[row] + index)
    }

    #[allow(clippy::cast_possible_wrap)]
    fn point_layer(&self, point: usize) -> Option<i64> {
        self.layer_of(point).map(|layer| layer as i64)
    }

    #[allow(clippy::cast_possible_wrap)]
    fn point_index(&self, point: usize) -> Option<i64> {
        let layer = self.layer_of(point)?;
        Some((point - self.first_point[layer]) as i64)
    }

    #[allow(clippy::cast_possible_wrap)]
    fn point_parity(&self, point: usize) -> Option<i64> {
        self.layer_of(point).map(|layer| (layer % 2) as i64)
    }

    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    fn shift_wires(&self, offset: i64) -> Vec<usize> {
        let mut shifted = Vec::with_capacity(self.n_points);
        for (layer, &count) in self.points_per_layer.iter().enumerate() {
            let first = self.first_point[layer];
            let size = count as i64;
            for index in 0..count {
                let rotated = (index as i64 + offset).rem_euclid(size) as usize;
                shifted.push(first + rotated);
            }
        }
        shifted
    }
}

/// A trigger hodoscope laid out as named rings of counters: one row per
/// volume name, active rows first, then passive rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingHodoscope {
    rings: UniformCylinder,
    active: Vec<String>,
    passive: Vec<String>,
}

impl RingHodoscope {
    /// Creates a hodoscope with `counters` points in every named ring.
    #[must_use]
    pub fn new<S: Into<String>>(
        active: Vec<S>,
        passive: Vec<S>,
        counters: usize,
    ) -> Self {
        let active: Vec<String> = active.into_iter().map(Into::into).collect();
        let passive: Vec<String> = passive.into_iter().map(Into::into).collect();
        let rings = UniformCylinder::uniform(active.len() + passive.len(), counters);
        Self {
            rings,
            active,
            passive,
        }
    }
}

impl Geometry for RingHodoscope {
    fn n_points(&self) -> usize {
        self.rings.n_points()
    }

    fn point_lookup(&self, row: i64, index: i64) -> Option<usize> {
        self.rings.point_lookup(row, index)
    }

    fn point_layer(&self, point: usize) -> Option<i64> {
        self.rings.point_layer(point)
    }

    fn point_index(&self, point: usize) -> Option<i64> {
        self.rings.point_index(point)
    }

    fn point_parity(&self, point: usize) -> Option<i64> {
        self.rings.point_parity(point)
    }

    fn shift_wires(&self, offset: i64) -> Vec<usize> {
        self.rings.shift_wires(offset)
    }

    #[allow(clippy::cast_possible_wrap)]
    fn name_to_row(&self, name: &str) -> Option<i64> {
        if let Some(row) = self.active.iter().position(|n| n == name) {
            return Some(row as i64);
        }
        self.passive
            .iter()
            .position(|n| n == name)
            .map(|row| (self.active.len() + row) as i64)
    }

    fn active_names(&self) -> &[String] {
        &self.active
    }

    fn passive_names(&self) -> &[String] {
        &self.passive
    }

    fn pos_to_col(&self, token: &str) -> Option<i64> {
        match token {
            "U" => Some(1),
            "D" => Some(0),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cylinder_lookup_round_trip() {
        let geom = UniformCylinder::new(vec![4, 6, 8]);
        assert_eq!(geom.n_points(), 18);
        assert_eq!(geom.point_lookup(0, 3), Some(3));
        assert_eq!(geom.point_lookup(1, 0), Some(4));
        assert_eq!(geom.point_lookup(2, 7), Some(17));
        assert_eq!(geom.point_lookup(1, 6), None);
        assert_eq!(geom.point_lookup(3, 0), None);
        assert_eq!(geom.point_lookup(-1, 0), None);

        for point in 0..geom.n_points() {
            let row = geom.point_layer(point).unwrap();
            let index = geom.point_index(point).unwrap();
            assert_eq!(geom.point_lookup(row, index), Some(point));
        }
        assert_eq!(geom.point_layer(18), None);
    }

    #[test]
    fn test_cylinder_parity() {
        let geom = UniformCylinder::new(vec![2, 2, 2]);
        assert_eq!(geom.point_parity(0), Some(0));
        assert_eq!(geom.point_parity(2), Some(1));
        assert_eq!(geom.point_parity(5), Some(0));
    }

    #[test]
    fn test_shift_wires_is_cyclic_permutation() {
        let geom = UniformCylinder::new(vec![3, 4]);
        let right = geom.shift_wires(1);
        assert_eq!(right, vec![1, 2, 0, 4, 5, 6, 3]);
        let left = geom.shift_wires(-1);
        assert_eq!(left, vec![2, 0, 1, 6, 3, 4, 5]);
        // shifting by a full turn is the identity
        let identity: Vec<usize> = (0..geom.n_points()).collect();
        assert_eq!(geom.shift_wires(0), identity);
        let mut sorted = right;
        sorted.sort_unstable();
        assert_eq!(sorted, identity);
    }

    #[test]
    fn test_hodoscope_names() {
        let geom = RingHodoscope::new(
            vec!["Cherenkov", "Scintillator"],
            vec!["CherenkovGuide"],
            4,
        );
        assert_eq!(geom.n_points(), 12);
        assert_eq!(geom.name_to_row("Cherenkov"), Some(0));
        assert_eq!(geom.name_to_row("Scintillator"), Some(1));
        assert_eq!(geom.name_to_row("CherenkovGuide"), Some(2));
        assert_eq!(geom.name_to_row("Mirror"), None);
        assert_eq!(geom.pos_to_col("U"), Some(1));
        assert_eq!(geom.pos_to_col("D"), Some(0));
        assert_eq!(geom.pos_to_col("X"), None);
    }
}
