//! Turning a merge configuration back into points, and committing it.
//!
//! A [`MergeConfiguration`] only holds locators. [`resolve`] looks every reference
//! up in the stored documents at the moment of the call; [`commit`] does the same
//! and packages the result as a brand new [`SourceDocument`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::merge::{MergeInput, MergeOptions};
use crate::{
    timestamp, DocumentMetadata, MergeConfiguration, MergeEntry, MergeError, Result,
    SourceDocument, Track, TrackPoint,
};

/// Name of the single track in a committed document.
pub const MERGED_TRACK_NAME: &str = "Merged Track";

static COMMIT_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Document lookup by id.
struct DocumentIndex<'a> {
    by_id: HashMap<&'a str, &'a SourceDocument>,
}

impl<'a> DocumentIndex<'a> {
    fn new(documents: &'a [SourceDocument]) -> Self {
        Self {
            by_id: documents.iter().map(|d| (d.id.as_str(), d)).collect(),
        }
    }

    fn get(&self, id: &str) -> Option<&'a SourceDocument> {
        self.by_id.get(id).copied()
    }

    fn resolve_entry(&self, entry: &MergeEntry) -> Option<TrackPoint> {
        match entry {
            MergeEntry::Interpolated(point) => Some(point.clone()),
            MergeEntry::Source(reference) => {
                let point = self
                    .get(&reference.document_id)
                    .and_then(|doc| doc.point(reference.track_index, reference.point_index));
                if point.is_none() {
                    debug!("[Resolve] Skipping dangling reference {:?}", reference);
                }
                point.cloned()
            }
        }
    }

    fn resolve_entries(&self, entries: &[MergeEntry]) -> Vec<TrackPoint> {
        entries
            .iter()
            .filter_map(|entry| self.resolve_entry(entry))
            .collect()
    }
}

/// Look up every entry of `configuration` in `documents`, in order.
///
/// References to documents, tracks or points that no longer exist are skipped.
pub fn resolve(
    configuration: &MergeConfiguration,
    documents: &[SourceDocument],
) -> Vec<TrackPoint> {
    DocumentIndex::new(documents).resolve_entries(&configuration.entries)
}

/// Like [`resolve`], split at the configuration's segment boundaries.
///
/// Segments whose references all dangle come back empty rather than disappearing.
pub fn resolve_segments(
    configuration: &MergeConfiguration,
    documents: &[SourceDocument],
) -> Vec<Vec<TrackPoint>> {
    let index = DocumentIndex::new(documents);
    configuration
        .segments()
        .into_iter()
        .map(|range| index.resolve_entries(&configuration.entries[range]))
        .collect()
}

/// Commit a merge result as a new document, stamped with the current time.
///
/// See [`commit_at`].
pub fn commit(
    configuration: &MergeConfiguration,
    documents: &[SourceDocument],
    options: &MergeOptions,
) -> Result<SourceDocument> {
    commit_at(configuration, documents, options, Utc::now())
}

/// Commit a merge result as a new document created at `now`.
///
/// The returned document is independent of its sources: it holds copies of the
/// resolved points in one track named [`MERGED_TRACK_NAME`]. Elevations are dropped
/// when `options.include_elevation` is false.
///
/// # Errors
///
/// [`MergeError::EmptyMerge`] when no entry resolves to a point.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use track_merger::{commit_at, merge, MergeOptions, SourceDocument, Track, TrackPoint};
///
/// let docs = vec![
///     SourceDocument::new("a", "Morning.gpx", vec![Track::new(vec![TrackPoint::new(0.0, 0.0)])]),
///     SourceDocument::new("b", "Evening.gpx", vec![Track::new(vec![TrackPoint::new(0.0, 1.0)])]),
/// ];
/// let options = MergeOptions::for_documents(["a", "b"]);
/// let outcome = merge(&docs, &options);
///
/// let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
/// let merged = commit_at(&outcome.configuration, &docs, &options, now).unwrap();
///
/// assert_eq!(merged.metadata.name.as_deref(), Some("Merged: Morning + Evening"));
/// assert_eq!(merged.file_name, format!("merged_{}.gpx", now.timestamp_millis()));
/// assert_eq!(merged.point_count(), 2);
/// ```
pub fn commit_at(
    configuration: &MergeConfiguration,
    documents: &[SourceDocument],
    options: &MergeOptions,
    now: DateTime<Utc>,
) -> Result<SourceDocument> {
    let index = DocumentIndex::new(documents);

    let mut points = index.resolve_entries(&configuration.entries);
    if points.is_empty() {
        return Err(MergeError::EmptyMerge);
    }

    if !options.include_elevation {
        for point in &mut points {
            point.elevation = None;
        }
    }

    // Display names in order of first contribution
    let mut names: Vec<&str> = Vec::new();
    let mut seen: Vec<&str> = Vec::new();
    for reference in configuration.references() {
        let id = reference.document_id.as_str();
        if seen.contains(&id) {
            continue;
        }
        if let Some(doc) = index.get(id) {
            seen.push(id);
            names.push(doc.display_name());
        }
    }

    let file_count = MergeInput::select(documents, options).documents.len();
    let millis = now.timestamp_millis();
    let sequence = COMMIT_COUNTER.fetch_add(1, Ordering::Relaxed);

    let metadata = DocumentMetadata {
        name: Some(format!("Merged: {}", names.join(" + "))),
        description: Some(format!(
            "Merged from {} files using {} method",
            file_count, options.strategy
        )),
        time: Some(timestamp::format(&now)),
    };

    let document = SourceDocument::new(
        format!("merged-{}-{}", millis, sequence),
        format!("merged_{}.gpx", millis),
        vec![Track::named(MERGED_TRACK_NAME, points)],
    )
    .with_metadata(metadata);

    info!(
        "[Resolve] Committed {} ({} points from {} documents)",
        document.id,
        document.point_count(),
        names.len()
    );

    Ok(document)
}
