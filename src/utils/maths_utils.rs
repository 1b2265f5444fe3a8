use argminmax::ArgMinMax;
use std::cmp::{max, min};

/// A closed price interval split into `n_chunks` equal-width buckets.
#[derive(serde::Deserialize, serde::Serialize, Default, Debug, Clone)]
pub struct RangeF64 {
    pub start_range: f64,
    pub end_range: f64,
    pub n_chunks: usize,
}

impl RangeF64 {
    pub fn new(start_range: f64, end_range: f64, n_chunks: usize) -> Self {
        Self {
            start_range,
            end_range,
            n_chunks,
        }
    }

    #[inline]
    pub fn n_chunks(&self) -> usize {
        self.n_chunks
    }

    pub fn min_max(&self) -> (f64, f64) {
        (self.start_range, self.end_range)
    }

    pub fn count_intersecting_chunks(&self, mut x_low: f64, mut x_high: f64) -> usize {
        // Swap the values over if necessary
        if x_high < x_low {
            (x_low, x_high) = (x_high, x_low);
        }
        let first_chunk_index = max(
            0,
            ((x_low - self.start_range) / self.chunk_size()).floor() as isize,
        );
        let last_chunk_index = min(
            (self.n_chunks - 1) as isize,
            ((x_high - self.start_range) / self.chunk_size()).floor() as isize,
        );

        if last_chunk_index < first_chunk_index {
            return 0;
        }
        // Inclusive of both ends.
        (last_chunk_index - first_chunk_index + 1) as usize
    }

    pub fn range_length(&self) -> f64 {
        self.end_range - self.start_range
    }

    pub fn chunk_size(&self) -> f64 {
        self.range_length() / (self.n_chunks as f64)
    }

    pub fn chunk_index(&self, value: f64) -> usize {
        let index = ((value - self.start_range) / self.chunk_size()).max(0.0);
        let chunk_index = index as usize;

        // Clamping handles floating-point inaccuracies at the boundary.
        chunk_index.min(self.n_chunks - 1)
    }

    pub fn chunk_bounds(&self, chunk_index: usize) -> (f64, f64) {
        debug_assert!(chunk_index < self.n_chunks);
        let lower_bound = self.start_range + chunk_index as f64 * self.chunk_size();
        let upper_bound = self.start_range + (chunk_index + 1) as f64 * self.chunk_size();
        (lower_bound, upper_bound)
    }
}

/// Index of the largest value. Caller guarantees `vec` is non-empty.
pub fn get_max_index(vec: &[f64]) -> usize {
    vec.argmax()
}

pub fn get_max(vec: &[f64]) -> f64 {
    vec[get_max_index(vec)]
}

pub fn get_min(vec: &[f64]) -> f64 {
    let min_index: usize = vec.argmin();
    vec[min_index]
}

/// Length of the intersection of `[a_low, a_high]` and `[b_low, b_high]` (0.0 when disjoint).
pub fn intersection_length(a_low: f64, a_high: f64, b_low: f64, b_high: f64) -> f64 {
    (a_high.min(b_high) - a_low.max(b_low)).max(0.0)
}

/// True when the two closed ranges share at least one point.
pub fn ranges_intersect(a_low: f64, a_high: f64, b_low: f64, b_high: f64) -> bool {
    a_low <= b_high && b_low <= a_high
}

/// Intersection length divided by the length of the union hull.
pub fn intersection_over_union(a_low: f64, a_high: f64, b_low: f64, b_high: f64) -> f64 {
    let intersection = intersection_length(a_low, a_high, b_low, b_high);
    if intersection <= 0.0 {
        return 0.0;
    }
    let union = a_high.max(b_high) - a_low.min(b_low);
    if union <= 0.0 {
        return 0.0;
    }
    intersection / union
}

/// Intersection length divided by the shorter of the two ranges.
pub fn intersection_over_smaller(a_low: f64, a_high: f64, b_low: f64, b_high: f64) -> f64 {
    let intersection = intersection_length(a_low, a_high, b_low, b_high);
    if intersection <= 0.0 {
        return 0.0;
    }
    let smaller = (a_high - a_low).min(b_high - b_low);
    if smaller <= 0.0 {
        return 0.0;
    }
    (intersection / smaller).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_index_clamps_to_last_bucket() {
        let range = RangeF64::new(100.0, 110.0, 10);
        assert_eq!(range.chunk_index(100.0), 0);
        assert_eq!(range.chunk_index(105.5), 5);
        assert_eq!(range.chunk_index(110.0), 9);
        assert_eq!(range.chunk_index(99.0), 0);
    }

    #[test]
    fn test_count_intersecting_chunks() {
        let range = RangeF64::new(0.0, 10.0, 10);
        assert_eq!(range.count_intersecting_chunks(2.5, 4.5), 3);
        assert_eq!(range.count_intersecting_chunks(4.5, 2.5), 3);
        assert_eq!(range.count_intersecting_chunks(0.0, 10.0), 10);
    }

    #[test]
    fn test_intersection_over_union() {
        assert_eq!(intersection_over_union(100.0, 104.0, 103.0, 104.0), 0.25);
        assert_eq!(intersection_over_union(100.0, 101.0, 102.0, 103.0), 0.0);
        assert_eq!(intersection_over_union(100.0, 102.0, 100.0, 102.0), 1.0);
    }

    #[test]
    fn test_intersection_over_smaller() {
        // Small range fully inside a large one.
        assert_eq!(intersection_over_smaller(100.0, 110.0, 103.0, 104.0), 1.0);
        assert_eq!(intersection_over_smaller(100.0, 102.0, 101.0, 105.0), 0.5);
    }

    #[test]
    fn test_ranges_intersect_touching_edges() {
        assert!(ranges_intersect(100.0, 101.0, 101.0, 102.0));
        assert!(!ranges_intersect(100.0, 101.0, 101.01, 102.0));
    }

    #[test]
    fn test_get_min_max() {
        let values = [3.0, 9.0, 1.0, 4.0];
        assert_eq!(get_max(&values), 9.0);
        assert_eq!(get_min(&values), 1.0);
        assert_eq!(get_max_index(&values), 1);
    }
}
