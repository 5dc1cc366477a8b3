//! Pairwise distances with greedy closest-pair assignment.
//!
//! [`DistanceMatrix`] measures every (row, column) pair of two ordered
//! collections and hands out matches smallest-distance first. A matched row
//! and column are withdrawn from every later candidate. Ties resolve in
//! discovery (row-major) order. This is a greedy approximation of optimal
//! bipartite matching; partial tracking depends on exactly this order.

/// Outcome for one row or column of a [`DistanceMatrix`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Assignment {
    /// Row and column were paired.
    Matched {
        /// Row index.
        row: usize,
        /// Column index.
        column: usize,
        /// Distance between them (at most the matrix maximum).
        distance: f64,
    },
    /// Row left without a partner.
    UnmatchedRow(usize),
    /// Column left without a partner.
    UnmatchedColumn(usize),
}

impl Assignment {
    /// Row index, if this assignment involves a row.
    pub fn row(&self) -> Option<usize> {
        match *self {
            Assignment::Matched { row, .. } | Assignment::UnmatchedRow(row) => Some(row),
            Assignment::UnmatchedColumn(_) => None,
        }
    }

    /// Column index, if this assignment involves a column.
    pub fn column(&self) -> Option<usize> {
        match *self {
            Assignment::Matched { column, .. } | Assignment::UnmatchedColumn(column) => {
                Some(column)
            }
            Assignment::UnmatchedRow(_) => None,
        }
    }
}

/// Full |rows| × |columns| distance table plus a global ordering of its cells.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    rows: usize,
    columns: usize,
    max_distance: f64,
    cells: Vec<f64>,
    order: Vec<usize>,
}

impl DistanceMatrix {
    /// Measure every pair with `metric`.
    ///
    /// Pairs farther apart than `max_distance` are never matched. A NaN
    /// distance is stored as infinity, so it never matches either.
    pub fn new<R, C>(
        rows: &[R],
        columns: &[C],
        max_distance: f64,
        metric: impl Fn(&R, &C) -> f64,
    ) -> Self {
        let mut cells = Vec::with_capacity(rows.len() * columns.len());
        for r in rows {
            for c in columns {
                let distance = metric(r, c);
                cells.push(if distance.is_nan() {
                    f64::INFINITY
                } else {
                    distance
                });
            }
        }
        let mut order: Vec<usize> = (0..cells.len()).collect();
        // Stable: equal distances keep row-major discovery order.
        order.sort_by(|&a, &b| cells[a].total_cmp(&cells[b]));
        Self {
            rows: rows.len(),
            columns: columns.len(),
            max_distance,
            cells,
            order,
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Maximum distance at which a pair may match.
    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    /// Distance between a row and a column.
    pub fn distance(&self, row: usize, column: usize) -> f64 {
        self.cells[row * self.columns + column]
    }

    /// Greedy matching: matched pairs in the order they were taken, then
    /// unmatched rows ascending, then unmatched columns ascending.
    ///
    /// Every row and every column appears exactly once in the result.
    pub fn closest_pairs(&self) -> Vec<Assignment> {
        let mut row_taken = vec![false; self.rows];
        let mut column_taken = vec![false; self.columns];
        let mut result = Vec::with_capacity(self.rows + self.columns);

        for &cell in &self.order {
            let distance = self.cells[cell];
            if distance > self.max_distance {
                break;
            }
            let row = cell / self.columns;
            let column = cell % self.columns;
            if row_taken[row] || column_taken[column] {
                continue;
            }
            row_taken[row] = true;
            column_taken[column] = true;
            result.push(Assignment::Matched {
                row,
                column,
                distance,
            });
        }

        result.extend(
            row_taken
                .iter()
                .enumerate()
                .filter(|(_, taken)| !**taken)
                .map(|(row, _)| Assignment::UnmatchedRow(row)),
        );
        result.extend(
            column_taken
                .iter()
                .enumerate()
                .filter(|(_, taken)| !**taken)
                .map(|(column, _)| Assignment::UnmatchedColumn(column)),
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abs_diff(a: &f64, b: &f64) -> f64 {
        (a - b).abs()
    }

    #[test]
    fn matches_nearest_first() {
        let rows = [60.0, 64.0, 67.0];
        let columns = [64.2, 60.1, 80.0];
        let matrix = DistanceMatrix::new(&rows, &columns, 1.0, abs_diff);
        let pairs = matrix.closest_pairs();

        assert_eq!(pairs[0].row(), Some(0));
        assert_eq!(pairs[0].column(), Some(1));
        assert_eq!(pairs[1].row(), Some(1));
        assert_eq!(pairs[1].column(), Some(0));
        assert_eq!(pairs[2], Assignment::UnmatchedRow(2));
        assert_eq!(pairs[3], Assignment::UnmatchedColumn(2));
        assert_eq!(pairs.len(), 4);
    }

    #[test]
    fn greedy_is_not_globally_optimal() {
        // Optimal total would pair (0,0) and (1,1); greedy takes (1,0) first.
        let rows = [0.0, 1.0];
        let columns = [1.1, 2.5];
        let matrix = DistanceMatrix::new(&rows, &columns, 2.0, abs_diff);
        let pairs = matrix.closest_pairs();
        assert!(matches!(pairs[0], Assignment::Matched { row: 1, column: 0, .. }));
        assert_eq!(pairs[1], Assignment::UnmatchedRow(0));
        assert_eq!(pairs[2], Assignment::UnmatchedColumn(1));
    }

    #[test]
    fn ties_resolve_in_discovery_order() {
        let rows = [1.0, 3.0];
        let columns = [2.0];
        let matrix = DistanceMatrix::new(&rows, &columns, 5.0, abs_diff);
        let pairs = matrix.closest_pairs();
        assert!(matches!(pairs[0], Assignment::Matched { row: 0, column: 0, .. }));
        assert_eq!(pairs[1], Assignment::UnmatchedRow(1));
    }

    #[test]
    fn empty_sides() {
        let rows: [f64; 0] = [];
        let matrix = DistanceMatrix::new(&rows, &[1.0, 2.0], 1.0, abs_diff);
        assert_eq!(
            matrix.closest_pairs(),
            vec![Assignment::UnmatchedColumn(0), Assignment::UnmatchedColumn(1)]
        );
    }

    #[test]
    fn nan_distances_never_match() {
        let matrix = DistanceMatrix::new(&[1.0], &[1.0], 1.0, |_: &f64, _: &f64| f64::NAN);
        assert_eq!(
            matrix.closest_pairs(),
            vec![Assignment::UnmatchedRow(0), Assignment::UnmatchedColumn(0)]
        );
        assert_eq!(matrix.distance(0, 0), f64::INFINITY);
    }

    #[test]
    fn negative_nan_does_not_block_valid_pairs() {
        let negative_nan = -f64::NAN;
        assert!(negative_nan.is_sign_negative());
        let rows = [0usize, 1];
        let columns = [0usize, 1];
        let metric = |r: &usize, c: &usize| match (*r, *c) {
            (0, 0) => negative_nan,
            (1, 1) => 0.0,
            _ => 5.0,
        };
        let matrix = DistanceMatrix::new(&rows, &columns, 1.0, metric);
        assert_eq!(
            matrix.closest_pairs(),
            vec![
                Assignment::Matched {
                    row: 1,
                    column: 1,
                    distance: 0.0
                },
                Assignment::UnmatchedRow(0),
                Assignment::UnmatchedColumn(0),
            ]
        );
    }
}
