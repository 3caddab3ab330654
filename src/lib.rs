//! # Track Merger
//!
//! GPS track merging and simplification engine.
//!
//! This library provides:
//! - Four merge strategies (sequential, chronological, simplified, interpolated)
//! - Douglas-Peucker simplification that keeps every survivor tied to its source point
//! - A single-flight recompute coordinator for interactive option changes
//! - Preview statistics and commit into a new, independent document
//!
//! The crate only reads [`SourceDocument`]s; parsing GPX files, storing documents and
//! rendering them is left to the caller.
//!
//! ## Features
//!
//! - **`parallel`** - Parse timestamps per document with rayon
//! - **`serde`** - Serialize/Deserialize on the data model
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use track_merger::{
//!     merge, resolve, MergeOptions, MergeStrategy, SourceDocument, Track, TrackPoint,
//! };
//!
//! let morning = SourceDocument::new("a", "morning.gpx", vec![Track::new(vec![
//!     TrackPoint::new(51.5074, -0.1278),
//!     TrackPoint::new(51.5080, -0.1290),
//! ])]);
//! let evening = SourceDocument::new("b", "evening.gpx", vec![Track::new(vec![
//!     TrackPoint::new(51.5090, -0.1300),
//!     TrackPoint::new(51.5100, -0.1310),
//! ])]);
//! let documents = vec![morning, evening];
//!
//! let options = MergeOptions::for_documents(["a", "b"])
//!     .with_strategy(MergeStrategy::Sequential);
//!
//! let outcome = merge(&documents, &options);
//! assert!(outcome.notice.is_none());
//!
//! let points = resolve(&outcome.configuration, &documents);
//! assert_eq!(points.len(), 4);
//! ```

pub mod coordinator;
pub mod geo_utils;
pub mod interpolate;
pub mod merge;
pub mod preview;
pub mod resolve;
pub mod simplify;
pub mod timestamp;

pub use coordinator::{
    CoordinatorState, CoordinatorStats, DocumentSource, MergeSnapshot, RecomputeCoordinator,
    Submission,
};
pub use interpolate::InterpolationConfig;
pub use merge::{merge, MergeInput, MergeOptions, MergeStrategy};
pub use preview::{DocumentContribution, PreviewStatistics, TrackSummary};
pub use resolve::{commit, commit_at, resolve, resolve_segments};
pub use simplify::{simplify_indices, simplify_point_indices, simplify_track};

use std::ops::Range;

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by the merge engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MergeError {
    #[error("Invalid timestamp: {value}")]
    InvalidTimestamp { value: String },

    #[error("Invalid option {name}: {value}")]
    InvalidOption { name: &'static str, value: f64 },

    #[error("Merge produced no points")]
    EmptyMerge,
}

pub type Result<T> = std::result::Result<T, MergeError>;

// ============================================================================
// Core Types
// ============================================================================

/// A recorded GPS position.
///
/// # Example
/// ```
/// use track_merger::TrackPoint;
/// let point = TrackPoint::new(51.5074, -0.1278)
///     .with_elevation(11.0)
///     .with_time("2024-05-01T08:00:00Z");
/// assert_eq!(point.elevation, Some(11.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Elevation in meters, when the recording device provided one
    pub elevation: Option<f64>,
    /// ISO-8601 timestamp exactly as it appeared in the source file
    pub time: Option<String>,
}

impl TrackPoint {
    /// Create a point without elevation or timestamp.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: None,
            time: None,
        }
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }

    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }

    /// Exact coordinate key used for duplicate detection.
    ///
    /// Compares bit patterns, so `0.0` and `-0.0` are distinct keys.
    #[inline]
    pub(crate) fn coordinate_key(&self) -> (u64, u64) {
        (self.latitude.to_bits(), self.longitude.to_bits())
    }
}

/// An ordered sequence of points.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Track {
    pub name: Option<String>,
    pub points: Vec<TrackPoint>,
}

impl Track {
    pub fn new(points: Vec<TrackPoint>) -> Self {
        Self { name: None, points }
    }

    pub fn named(name: impl Into<String>, points: Vec<TrackPoint>) -> Self {
        Self {
            name: Some(name.into()),
            points,
        }
    }
}

/// Document-level metadata carried over from the source file.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DocumentMetadata {
    pub name: Option<String>,
    pub description: Option<String>,
    pub time: Option<String>,
}

/// A parsed GPS file as held by the storage collaborator.
///
/// The merge engine only ever borrows documents; a commit mints a new one.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceDocument {
    /// Unique identifier assigned by the store
    pub id: String,
    /// Original file name
    pub file_name: String,
    pub metadata: DocumentMetadata,
    pub tracks: Vec<Track>,
}

impl SourceDocument {
    pub fn new(id: impl Into<String>, file_name: impl Into<String>, tracks: Vec<Track>) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            metadata: DocumentMetadata::default(),
            tracks,
        }
    }

    pub fn with_metadata(mut self, metadata: DocumentMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Total number of points across all tracks.
    pub fn point_count(&self) -> usize {
        self.tracks.iter().map(|t| t.points.len()).sum()
    }

    /// Look up a point by track and point index.
    #[inline]
    pub fn point(&self, track_index: usize, point_index: usize) -> Option<&TrackPoint> {
        self.tracks.get(track_index)?.points.get(point_index)
    }

    /// Human-readable name: the metadata name, else the file name without `.gpx`.
    pub fn display_name(&self) -> &str {
        match self.metadata.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => strip_gpx_extension(&self.file_name),
        }
    }
}

fn strip_gpx_extension(file_name: &str) -> &str {
    let split = file_name.len().saturating_sub(4);
    match (file_name.get(..split), file_name.get(split..)) {
        (Some(stem), Some(ext)) if ext.eq_ignore_ascii_case(".gpx") => stem,
        _ => file_name,
    }
}

/// Locator for a point inside a stored document. Not a copy of the point.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PointRef {
    pub document_id: String,
    pub track_index: usize,
    pub point_index: usize,
}

impl PointRef {
    pub fn new(document_id: impl Into<String>, track_index: usize, point_index: usize) -> Self {
        Self {
            document_id: document_id.into(),
            track_index,
            point_index,
        }
    }
}

/// One slot of a merge result.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MergeEntry {
    /// A point taken from a source document
    Source(PointRef),
    /// A synthetic point added while smoothing a transition
    Interpolated(TrackPoint),
}

impl MergeEntry {
    pub fn source(&self) -> Option<&PointRef> {
        match self {
            MergeEntry::Source(r) => Some(r),
            MergeEntry::Interpolated(_) => None,
        }
    }
}

/// The ordered output of a merge strategy.
///
/// Entry order is the exact order of the merged track. `segment_starts` holds the
/// entry indices (never 0) at which a new time segment begins.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MergeConfiguration {
    pub entries: Vec<MergeEntry>,
    pub segment_starts: Vec<usize>,
}

impl MergeConfiguration {
    /// Build a single-segment configuration from references.
    pub fn from_refs(refs: impl IntoIterator<Item = PointRef>) -> Self {
        Self {
            entries: refs.into_iter().map(MergeEntry::Source).collect(),
            segment_starts: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Source references in output order, skipping synthetic points.
    pub fn references(&self) -> impl Iterator<Item = &PointRef> {
        self.entries.iter().filter_map(MergeEntry::source)
    }

    /// Number of synthetic points.
    pub fn interpolated_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, MergeEntry::Interpolated(_)))
            .count()
    }

    /// Entry index ranges, one per segment. Empty configurations have no segments.
    pub fn segments(&self) -> Vec<Range<usize>> {
        if self.entries.is_empty() {
            return Vec::new();
        }
        let mut ranges = Vec::with_capacity(self.segment_starts.len() + 1);
        let mut start = 0;
        for &next in &self.segment_starts {
            if next > start && next < self.entries.len() {
                ranges.push(start..next);
                start = next;
            }
        }
        ranges.push(start..self.entries.len());
        ranges
    }
}

/// Conditions the caller should surface to the user. Not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MergeNotice {
    /// Fewer than two documents are included in the merge
    NotEnoughDocuments { selected: usize },
    /// A time-based merge found no point with a usable timestamp
    NoTimestampedPoints,
}

impl std::fmt::Display for MergeNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeNotice::NotEnoughDocuments { selected } => {
                write!(f, "Select at least two files to merge ({} selected)", selected)
            }
            MergeNotice::NoTimestampedPoints => {
                write!(f, "None of the selected files have points with timestamps")
            }
        }
    }
}

/// Result of running a merge strategy.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MergeOutcome {
    pub configuration: MergeConfiguration,
    pub notice: Option<MergeNotice>,
}

impl MergeOutcome {
    pub fn new(configuration: MergeConfiguration) -> Self {
        Self {
            configuration,
            notice: None,
        }
    }

    pub fn with_notice(notice: MergeNotice) -> Self {
        Self {
            configuration: MergeConfiguration::default(),
            notice: Some(notice),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
