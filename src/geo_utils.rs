//! # Geographic Utilities
//!
//! Core geographic computation utilities for GPS track merging.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two GPS points |
//! | [`polyline_length`] | Total length of a GPS track in meters |
//! | [`compute_bounds`] | Bounding box of a GPS track |
//! | [`compute_center`] | Centroid of a GPS track |
//! | [`elevation_change`] | Cumulative climb and descent |
//! | [`duration_seconds`] | Time between the first and last point |
//! | [`format_distance`] / [`format_duration`] | Human-readable values for previews |
//!
//! ## Example
//!
//! ```rust
//! use track_merger::{TrackPoint, geo_utils};
//!
//! let track = vec![
//!     TrackPoint::new(51.5074, -0.1278),  // London
//!     TrackPoint::new(51.5080, -0.1290),
//!     TrackPoint::new(51.5090, -0.1300),
//! ];
//!
//! let length = geo_utils::polyline_length(&track);
//! println!("Track length: {}", geo_utils::format_distance(length));
//!
//! let dist = geo_utils::haversine_distance(&track[0], &track[2]);
//! assert!(dist > 0.0);
//! ```
//!
//! ## Algorithm Notes
//!
//! ### Haversine Formula
//!
//! Distances assume a spherical Earth with radius [`EARTH_RADIUS_M`]. This is the
//! same radius the simplifier uses for its planar projection, so tolerances and
//! distances are measured on the same scale.
//!
//! ### Centroid
//!
//! The centroid is the arithmetic mean of all coordinates. It is the only center
//! definition used in this crate.

use geo::{BoundingRect, Centroid, MultiPoint, Point};

use crate::timestamp;
use crate::TrackPoint;

/// Earth radius in meters used for all distance calculations.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two GPS points using the Haversine formula.
///
/// # Example
///
/// ```rust
/// use track_merger::{TrackPoint, geo_utils};
///
/// let london = TrackPoint::new(51.5074, -0.1278);
/// let paris = TrackPoint::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(p1: &TrackPoint, p2: &TrackPoint) -> f64 {
    let lat1 = p1.latitude.to_radians();
    let lat2 = p2.latitude.to_radians();
    let delta_lat = (p2.latitude - p1.latitude).to_radians();
    let delta_lon = (p2.longitude - p1.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Calculate the total length of a polyline in meters.
///
/// Empty or single-point tracks return 0.0.
pub fn polyline_length(points: &[TrackPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

// =============================================================================
// Bounding Box and Center
// =============================================================================

/// Bounding box of a set of points, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

fn to_multi_point(points: &[TrackPoint]) -> MultiPoint<f64> {
    MultiPoint::new(
        points
            .iter()
            .map(|p| Point::new(p.longitude, p.latitude))
            .collect(),
    )
}

/// Compute the bounding box of a GPS track.
///
/// Returns `None` for empty input.
///
/// # Example
///
/// ```rust
/// use track_merger::{TrackPoint, geo_utils};
///
/// let track = vec![
///     TrackPoint::new(51.5000, -0.1300),
///     TrackPoint::new(51.5100, -0.1200),
///     TrackPoint::new(51.5050, -0.1250),
/// ];
///
/// let bounds = geo_utils::compute_bounds(&track).unwrap();
/// assert_eq!(bounds.min_lat, 51.5000);
/// assert_eq!(bounds.max_lng, -0.1200);
/// ```
pub fn compute_bounds(points: &[TrackPoint]) -> Option<Bounds> {
    let rect = to_multi_point(points).bounding_rect()?;
    Some(Bounds {
        min_lat: rect.min().y,
        max_lat: rect.max().y,
        min_lng: rect.min().x,
        max_lng: rect.max().x,
    })
}

/// Compute the centroid of a GPS track as `(latitude, longitude)`.
///
/// Returns the arithmetic mean of all coordinates, or `(0.0, 0.0)` for empty input.
///
/// # Notes
///
/// For tracks crossing the antimeridian this simple averaging is wrong; merged
/// tracks are assumed to cover a small area.
///
/// # Example
///
/// ```rust
/// use track_merger::{TrackPoint, geo_utils};
///
/// let track = vec![
///     TrackPoint::new(51.50, -0.10),
///     TrackPoint::new(51.52, -0.12),
///     TrackPoint::new(51.51, -0.17),
/// ];
///
/// let (lat, lng) = geo_utils::compute_center(&track);
/// assert!((lat - 51.51).abs() < 1e-9);
/// assert!((lng - (-0.13)).abs() < 1e-9);
/// ```
pub fn compute_center(points: &[TrackPoint]) -> (f64, f64) {
    match to_multi_point(points).centroid() {
        Some(center) => (center.y(), center.x()),
        None => (0.0, 0.0),
    }
}

// =============================================================================
// Elevation and Time
// =============================================================================

/// Cumulative climb and descent in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElevationChange {
    pub gain: f64,
    pub loss: f64,
}

/// Sum elevation gain and loss over the points that carry an elevation.
///
/// Points without elevation are skipped rather than treated as zero.
pub fn elevation_change(points: &[TrackPoint]) -> ElevationChange {
    let mut change = ElevationChange::default();
    let mut previous: Option<f64> = None;

    for elevation in points.iter().filter_map(|p| p.elevation) {
        if let Some(prev) = previous {
            let diff = elevation - prev;
            if diff > 0.0 {
                change.gain += diff;
            } else {
                change.loss += -diff;
            }
        }
        previous = Some(elevation);
    }

    change
}

/// Seconds between the first and last point.
///
/// `None` when there are fewer than two points or either endpoint lacks a
/// parseable timestamp.
pub fn duration_seconds(points: &[TrackPoint]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }
    let start = timestamp::parse(points.first()?.time.as_deref()?).ok()?;
    let end = timestamp::parse(points.last()?.time.as_deref()?).ok()?;
    Some((end - start).num_milliseconds() as f64 / 1000.0)
}

// =============================================================================
// Formatting
// =============================================================================

/// Format a distance: whole meters below 1 km, kilometers with two decimals above.
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{} m", meters.round())
    } else {
        format!("{:.2} km", meters / 1000.0)
    }
}

/// Format a duration as `2h 30m` / `45m`, or `02:30:05` when `detailed`.
pub fn format_duration(seconds: f64, detailed: bool) -> String {
    if !seconds.is_finite() {
        return "N/A".to_string();
    }

    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;

    if detailed {
        return format!("{:02}:{:02}:{:02}", hours, minutes, total % 60);
    }
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
