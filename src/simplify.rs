//! Douglas-Peucker track simplification.
//!
//! Points are projected to a local planar approximation
//! (`x = lon·cos(lat)·R`, `y = lat·R`) so the tolerance is expressed in meters.
//! The recursion runs over index ranges with a keep mask; the input is never
//! modified and survivors are reported as indices, so callers can carry any
//! data (such as the source [`PointRef`](crate::PointRef)) alongside each point.
//!
//! Time complexity: O(n²) worst case, O(n log n) typical.

use crate::geo_utils::EARTH_RADIUS_M;
use crate::TrackPoint;

/// Point projected onto the local plane, in meters.
#[derive(Debug, Clone, Copy)]
struct Projected {
    x: f64,
    y: f64,
}

impl Projected {
    #[inline]
    fn from_point(p: &TrackPoint) -> Self {
        let lat = p.latitude.to_radians();
        let lon = p.longitude.to_radians();
        Self {
            x: lon * lat.cos() * EARTH_RADIUS_M,
            y: lat * EARTH_RADIUS_M,
        }
    }

    #[inline]
    fn distance(&self, other: &Projected) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Distance from `p` to the segment `start`-`end`.
///
/// A zero-length segment degrades to point-to-point distance.
fn segment_distance(p: &Projected, start: &Projected, end: &Projected) -> f64 {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length_sq = dx * dx + dy * dy;

    if length_sq == 0.0 {
        return p.distance(start);
    }

    let t = ((p.x - start.x) * dx + (p.y - start.y) * dy) / length_sq;
    if t < 0.0 {
        return p.distance(start);
    }
    if t > 1.0 {
        return p.distance(end);
    }

    let cross = (p.x - start.x) * dy - (p.y - start.y) * dx;
    cross.abs() / length_sq.sqrt()
}

/// Simplify a track and return the indices of retained points, in order.
///
/// Always includes index 0 and the last index. Inputs with two or fewer points
/// are returned whole.
///
/// # Example
/// ```
/// use track_merger::{TrackPoint, simplify_indices};
///
/// let points: Vec<TrackPoint> = (0..5)
///     .map(|i| TrackPoint::new(0.0, i as f64 * 0.001))
///     .collect();
///
/// assert_eq!(simplify_indices(&points, 1.0), vec![0, 4]);
/// ```
pub fn simplify_indices(points: &[TrackPoint], tolerance: f64) -> Vec<usize> {
    simplify_point_indices(points, tolerance)
}

/// Same as [`simplify_indices`], for points that live inside other records.
///
/// Index `i` in the result refers to the `i`-th item yielded by `points`.
/// Negative or non-finite tolerances are treated as 0.
pub fn simplify_point_indices<'a, I>(points: I, tolerance: f64) -> Vec<usize>
where
    I: IntoIterator<Item = &'a TrackPoint>,
{
    let tolerance = if tolerance.is_finite() { tolerance.max(0.0) } else { 0.0 };
    let projected: Vec<Projected> = points.into_iter().map(Projected::from_point).collect();
    let n = projected.len();
    if n <= 2 {
        return (0..n).collect();
    }

    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    simplify_range(&projected, 0, n - 1, tolerance, &mut keep);

    keep.iter()
        .enumerate()
        .filter_map(|(i, &k)| if k { Some(i) } else { None })
        .collect()
}

/// Simplify a track and return the retained points.
pub fn simplify_track(points: &[TrackPoint], tolerance: f64) -> Vec<TrackPoint> {
    simplify_indices(points, tolerance)
        .into_iter()
        .map(|i| points[i].clone())
        .collect()
}

/// Process the range `start..=end`, marking survivors in `keep`.
///
/// Uses an explicit stack so long tracks cannot overflow the call stack.
fn simplify_range(
    points: &[Projected],
    start: usize,
    end: usize,
    tolerance: f64,
    keep: &mut [bool],
) {
    let mut ranges = vec![(start, end)];

    while let Some((start, end)) = ranges.pop() {
        if end <= start + 1 {
            continue;
        }

        let mut max_dist = 0.0;
        let mut max_idx = start;

        for i in (start + 1)..end {
            let dist = segment_distance(&points[i], &points[start], &points[end]);
            if dist > max_dist {
                max_dist = dist;
                max_idx = i;
            }
        }

        if max_idx > start && max_dist > tolerance {
            keep[max_idx] = true;
            ranges.push((max_idx, end));
            ranges.push((start, max_idx));
        }
    }
}
