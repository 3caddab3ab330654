//! Transition smoothing for the interpolated strategy.
//!
//! A transition is a consecutive pair of merged points that either crosses a
//! time-segment boundary or switches source document. Long transitions are filled
//! with evenly spaced synthetic points so the merged track has no visible jump.

use chrono::Duration;
use log::debug;

use crate::geo_utils::haversine_distance;
use crate::merge::Timeline;
use crate::{timestamp, MergeConfiguration, MergeEntry, TrackPoint};

/// Default spacing between synthetic points, in meters.
pub const INTERPOLATION_STEP_METERS: f64 = 25.0;

/// Default cap on synthetic points added to one transition.
pub const MAX_INTERPOLATED_POINTS: usize = 100;

/// Spacing settings for synthetic points.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InterpolationConfig {
    /// Target distance between consecutive points across a transition.
    /// Default: 25.0
    pub step_meters: f64,

    /// Upper bound on synthetic points per transition.
    /// Default: 100
    pub max_points_per_transition: usize,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            step_meters: INTERPOLATION_STEP_METERS,
            max_points_per_transition: MAX_INTERPOLATED_POINTS,
        }
    }
}

impl InterpolationConfig {
    /// Number of synthetic points for a gap of `distance` meters.
    pub fn steps_for(&self, distance: f64) -> usize {
        if !(distance > self.step_meters) || self.step_meters <= 0.0 {
            return 0;
        }
        let steps = (distance / self.step_meters).ceil() as usize - 1;
        steps.min(self.max_points_per_transition)
    }
}

/// Synthetic points strictly between `from` and `to`.
///
/// Latitude and longitude are interpolated linearly. Elevation is interpolated when
/// both ends carry one, and so is the timestamp when both ends parse.
///
/// # Example
/// ```
/// use track_merger::{interpolate, InterpolationConfig, TrackPoint};
///
/// let from = TrackPoint::new(0.0, 0.0);
/// let to = TrackPoint::new(0.0, 0.001); // ~111 m
///
/// let filled = interpolate::interpolate_between(&from, &to, &InterpolationConfig::default());
/// assert_eq!(filled.len(), 4);
/// assert!(filled.windows(2).all(|w| w[0].longitude < w[1].longitude));
/// ```
pub fn interpolate_between(
    from: &TrackPoint,
    to: &TrackPoint,
    config: &InterpolationConfig,
) -> Vec<TrackPoint> {
    let steps = config.steps_for(haversine_distance(from, to));
    if steps == 0 {
        return Vec::new();
    }

    let times = match (parse_time(from), parse_time(to)) {
        (Some(start), Some(end)) => Some((start, end - start)),
        _ => None,
    };

    (1..=steps)
        .map(|i| {
            let t = i as f64 / (steps + 1) as f64;
            TrackPoint {
                latitude: lerp(from.latitude, to.latitude, t),
                longitude: lerp(from.longitude, to.longitude, t),
                elevation: match (from.elevation, to.elevation) {
                    (Some(a), Some(b)) => Some(lerp(a, b, t)),
                    _ => None,
                },
                time: times.map(|(start, span)| {
                    let offset = (span.num_milliseconds() as f64 * t).round() as i64;
                    timestamp::format(&(start + Duration::milliseconds(offset)))
                }),
            }
        })
        .collect()
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn parse_time(point: &TrackPoint) -> Option<chrono::DateTime<chrono::Utc>> {
    point
        .time
        .as_deref()
        .and_then(|raw| timestamp::parse(raw).ok())
}

/// Turn a timeline into a configuration, filling every transition.
///
/// Synthetic points are placed in the segment of the point that follows them.
pub(crate) fn smooth_transitions(
    timeline: &Timeline<'_>,
    config: &InterpolationConfig,
) -> MergeConfiguration {
    let points = &timeline.points;
    let mut entries = Vec::with_capacity(points.len());
    let mut segment_starts = Vec::with_capacity(timeline.segment_starts.len());
    let mut boundaries = timeline.segment_starts.iter().copied().peekable();
    let mut added = 0usize;

    for (i, current) in points.iter().enumerate() {
        let starts_segment = boundaries.next_if_eq(&i).is_some();

        if let Some(previous) = i.checked_sub(1).map(|p| &points[p]) {
            let switches_document =
                previous.candidate.reference.document_id != current.candidate.reference.document_id;

            if starts_segment {
                segment_starts.push(entries.len());
            }

            if starts_segment || switches_document {
                let filled =
                    interpolate_between(previous.candidate.point, current.candidate.point, config);
                added += filled.len();
                entries.extend(filled.into_iter().map(MergeEntry::Interpolated));
            }
        }

        entries.push(MergeEntry::Source(current.candidate.reference.clone()));
    }

    debug!(
        "[Merge] Added {} interpolated points across {} source points",
        added,
        points.len()
    );

    MergeConfiguration {
        entries,
        segment_starts,
    }
}
