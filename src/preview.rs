//! Preview statistics for a pending merge.

use std::collections::HashMap;

use crate::geo_utils::{self, ElevationChange};
use crate::merge::MergeOptions;
use crate::{MergeConfiguration, SourceDocument, TrackPoint};

/// Approximate serialized size of one track point, in bytes.
pub const BYTES_PER_POINT: usize = 120;

/// Counts shown next to the merge preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PreviewStatistics {
    /// Points across all included documents
    pub original_point_count: usize,
    /// Entries in the merge result, synthetic points included
    pub merged_point_count: usize,
    /// `original - merged` when duplicate skipping is on, else 0.
    ///
    /// This also counts points dropped by simplification or missing timestamps.
    pub duplicates_removed: usize,
    pub estimated_output_size_bytes: usize,
}

impl PreviewStatistics {
    pub fn compute(
        included: &[&SourceDocument],
        configuration: &MergeConfiguration,
        options: &MergeOptions,
    ) -> Self {
        let original_point_count: usize = included.iter().map(|d| d.point_count()).sum();
        let merged_point_count = configuration.len();

        let duplicates_removed = if options.skip_duplicate_points {
            original_point_count.saturating_sub(merged_point_count)
        } else {
            0
        };

        Self {
            original_point_count,
            merged_point_count,
            duplicates_removed,
            estimated_output_size_bytes: merged_point_count * BYTES_PER_POINT,
        }
    }

    /// Human-readable estimated size, e.g. `"12 KB"` or `"1.5 MB"`.
    pub fn estimated_size_label(&self) -> String {
        format_size(self.estimated_output_size_bytes)
    }
}

/// Format a byte count as rounded KB below one megabyte, else MB with one decimal.
///
/// # Example
/// ```
/// use track_merger::preview::format_size;
///
/// assert_eq!(format_size(12_000), "12 KB");
/// assert_eq!(format_size(1_572_864), "1.5 MB");
/// ```
pub fn format_size(bytes: usize) -> String {
    const MB: f64 = 1024.0 * 1024.0;
    let bytes = bytes as f64;
    if bytes < MB {
        format!("{} KB", (bytes / 1024.0).round())
    } else {
        format!("{:.1} MB", bytes / MB)
    }
}

/// How many merged entries came from one document.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DocumentContribution {
    pub document_id: String,
    pub name: String,
    pub point_count: usize,
}

/// Per-document entry counts, in the order of `included`.
///
/// Documents that contribute nothing are left out.
pub fn document_contributions(
    included: &[&SourceDocument],
    configuration: &MergeConfiguration,
) -> Vec<DocumentContribution> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for reference in configuration.references() {
        *counts.entry(reference.document_id.as_str()).or_default() += 1;
    }

    included
        .iter()
        .filter_map(|doc| {
            let point_count = counts.get(doc.id.as_str()).copied()?;
            Some(DocumentContribution {
                document_id: doc.id.clone(),
                name: doc.display_name().to_string(),
                point_count,
            })
        })
        .collect()
}

/// Shape of a resolved track.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackSummary {
    pub point_count: usize,
    pub distance_meters: f64,
    pub elevation: ElevationChange,
    /// First to last timestamp, when both parse
    pub duration_seconds: Option<f64>,
    /// Mean (lat, lng)
    pub center: (f64, f64),
}

impl TrackSummary {
    pub fn from_points(points: &[TrackPoint]) -> Self {
        Self {
            point_count: points.len(),
            distance_meters: geo_utils::polyline_length(points),
            elevation: geo_utils::elevation_change(points),
            duration_seconds: geo_utils::duration_seconds(points),
            center: geo_utils::compute_center(points),
        }
    }
}
