//! Values anchored at a relative position in time.

/// A value at a position ratio in `[0, 1]` of some span (usually a note).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioPoint<T> {
    /// The anchored value.
    pub value: T,
    /// Relative position, 0 = start, 1 = end.
    pub position: f64,
}

impl<T> RatioPoint<T> {
    /// Anchor `value` at `position` (clamped to `[0, 1]`).
    pub fn new(value: T, position: f64) -> Self {
        Self {
            value,
            position: position.clamp(0.0, 1.0),
        }
    }

    /// Transform the value, keeping the position.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RatioPoint<U> {
        RatioPoint {
            value: f(self.value),
            position: self.position,
        }
    }
}

/// Insert `point` keeping `points` strictly ordered by position.
///
/// A point at an already occupied position replaces the existing value.
/// Returns the index the point now occupies.
pub fn insert_ordered<T>(points: &mut Vec<RatioPoint<T>>, point: RatioPoint<T>) -> usize {
    let index = points.partition_point(|p| p.position < point.position);
    if points
        .get(index)
        .is_some_and(|p| p.position == point.position)
    {
        points[index] = point;
    } else {
        points.insert(index, point);
    }
    index
}

/// Whether positions are non-decreasing.
pub fn is_ordered<T>(points: &[RatioPoint<T>]) -> bool {
    points.windows(2).all(|w| w[0].position <= w[1].position)
}

/// The pair of points surrounding `position` and the ratio between them.
///
/// Positions before the first point or after the last clamp to that point
/// (both indices equal). Returns `None` for an empty slice.
pub fn bracket<T>(points: &[RatioPoint<T>], position: f64) -> Option<(usize, usize, f64)> {
    let last = points.len().checked_sub(1)?;
    let upper = points.partition_point(|p| p.position <= position);
    if upper == 0 {
        return Some((0, 0, 0.0));
    }
    if upper > last {
        return Some((last, last, 0.0));
    }
    let lower = upper - 1;
    let span = points[upper].position - points[lower].position;
    let t = if span > 0.0 {
        (position - points[lower].position) / span
    } else {
        0.0
    };
    Some((lower, upper, t))
}
