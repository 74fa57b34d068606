//! Clamped multi-axis lookup tables.

use std::collections::BTreeMap;

/// A sorted axis of grid values.
///
/// Lookups clamp the input to the axis range and then snap to the greatest
/// grid value at or below it, so every continuous input maps to a tabulated
/// row.
#[derive(Debug, Clone, PartialEq)]
pub struct GridAxis {
    values: Vec<f64>,
}

impl GridAxis {
    /// # Panics
    ///
    /// Panics on an empty or non-increasing axis (contract violation).
    pub fn new(values: Vec<f64>) -> Self {
        assert!(!values.is_empty(), "grid axis must not be empty");
        assert!(
            values.windows(2).all(|w| w[0] < w[1]),
            "grid axis must be strictly increasing"
        );
        Self { values }
    }

    /// Index of the grid value the clamped input snaps to.
    pub fn snap(&self, x: f64) -> usize {
        if x <= self.values[0] {
            return 0;
        }
        if x >= self.values[self.values.len() - 1] {
            return self.values.len() - 1;
        }
        self.values.partition_point(|&v| v <= x) - 1
    }

    pub fn value(&self, index: usize) -> f64 {
        self.values[index]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// An `N`-axis table of f64 values with clamped lookups.
///
/// Built from observed rows; the axes are the sorted unique coordinates seen
/// in the rows. A lookup snaps every coordinate and reads the cell; a cell
/// that was never populated is a domain anomaly — the table warns once on
/// stderr and falls back to the nearest populated cell.
#[derive(Debug, Clone)]
pub struct Table<const N: usize> {
    axes: [GridAxis; N],
    cells: BTreeMap<[usize; N], f64>,
}

impl<const N: usize> Table<N> {
    /// Build from `(coordinates, value)` rows.
    ///
    /// # Panics
    ///
    /// Panics on an empty row set or on duplicate coordinates (contract
    /// violation).
    pub fn from_rows(rows: &[([f64; N], f64)]) -> Self {
        assert!(!rows.is_empty(), "table must have at least one row");
        let axes: [GridAxis; N] = std::array::from_fn(|dim| {
            let mut values: Vec<f64> = rows.iter().map(|(key, _)| key[dim]).collect();
            values.sort_by(f64::total_cmp);
            values.dedup();
            GridAxis::new(values)
        });
        let mut cells = BTreeMap::new();
        for (key, value) in rows {
            let index: [usize; N] = std::array::from_fn(|dim| axes[dim].snap(key[dim]));
            let previous = cells.insert(index, *value);
            assert!(previous.is_none(), "duplicate table row at {key:?}");
        }
        Self { axes, cells }
    }

    /// Look up the cell for `key`, clamping and snapping each coordinate.
    pub fn get(&self, key: [f64; N]) -> f64 {
        let index: [usize; N] = std::array::from_fn(|dim| self.axes[dim].snap(key[dim]));
        if let Some(&value) = self.cells.get(&index) {
            return value;
        }
        // Sparse surface: warn and take the nearest populated cell.
        eprintln!("table cell missing at {key:?}; using nearest row");
        let (_, &value) = self
            .cells
            .iter()
            .min_by_key(|(cell, _)| {
                cell.iter()
                    .zip(index.iter())
                    .map(|(a, b)| a.abs_diff(*b))
                    .sum::<usize>()
            })
            .expect("table has at least one row");
        value
    }

    pub fn axis(&self, dim: usize) -> &GridAxis {
        &self.axes[dim]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snap_clamps_and_floors() {
        let axis = GridAxis::new(vec![50.0, 60.0, 70.0]);
        assert_eq!(axis.snap(40.0), 0);
        assert_eq!(axis.snap(50.0), 0);
        assert_eq!(axis.snap(65.0), 1);
        assert_eq!(axis.snap(70.0), 2);
        assert_eq!(axis.snap(99.0), 2);
    }

    #[test]
    fn table_lookup_snaps_every_axis() {
        let table = Table::from_rows(&[
            ([50.0, 0.0], 0.1),
            ([50.0, 1.0], 0.2),
            ([60.0, 0.0], 0.3),
            ([60.0, 1.0], 0.4),
        ]);
        assert_eq!(table.get([55.0, 0.0]), 0.1);
        assert_eq!(table.get([63.0, 1.0]), 0.4);
        // clamped below and above
        assert_eq!(table.get([10.0, 0.0]), 0.1);
        assert_eq!(table.get([99.0, 5.0]), 0.4);
    }

    #[test]
    fn sparse_cell_falls_back_to_nearest_row() {
        let table = Table::from_rows(&[
            ([0.0, 0.0], 1.0),
            ([1.0, 0.0], 2.0),
            ([1.0, 1.0], 3.0),
        ]);
        // cell (0, 1) was never populated; nearest populated neighbours are
        // (0,0) and (1,1), both at distance 1 — BTreeMap order makes the
        // fallback deterministic
        let v = table.get([0.0, 1.0]);
        assert_eq!(v, 1.0);
    }

    #[test]
    #[should_panic(expected = "duplicate table row")]
    fn duplicate_rows_panic() {
        Table::from_rows(&[([1.0], 0.5), ([1.0], 0.6)]);
    }
}
