//! Merge strategies.
//!
//! A strategy is a pure function from a [`MergeInput`] (the included documents in
//! merge order, plus options) to a [`MergeOutcome`]. Strategies are looked up in a
//! fixed table indexed by [`MergeStrategy`], so adding one means adding a variant
//! and a function.
//!
//! | Strategy | Output order |
//! |----------|--------------|
//! | [`Sequential`](MergeStrategy::Sequential) | Document, track, then point order |
//! | [`Chronological`](MergeStrategy::Chronological) | Ascending timestamp, ties in source order |
//! | [`Simplified`](MergeStrategy::Simplified) | Time or input order, then Douglas-Peucker |
//! | [`Interpolated`](MergeStrategy::Interpolated) | Chronological, plus filled transitions |

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::interpolate::{self, InterpolationConfig};
use crate::{
    simplify, timestamp, MergeConfiguration, MergeError, MergeNotice, MergeOutcome, PointRef,
    Result, SourceDocument, TrackPoint,
};

// ============================================================================
// Options
// ============================================================================

/// How source points are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MergeStrategy {
    #[default]
    Sequential = 0,
    Chronological = 1,
    Simplified = 2,
    Interpolated = 3,
}

impl MergeStrategy {
    pub const ALL: [MergeStrategy; 4] = [
        MergeStrategy::Sequential,
        MergeStrategy::Chronological,
        MergeStrategy::Simplified,
        MergeStrategy::Interpolated,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MergeStrategy::Sequential => "sequential",
            MergeStrategy::Chronological => "chronological",
            MergeStrategy::Simplified => "simplified",
            MergeStrategy::Interpolated => "interpolated",
        }
    }

    /// Whether the strategy only keeps points with timestamps.
    pub fn requires_timestamps(self, options: &MergeOptions) -> bool {
        match self {
            MergeStrategy::Sequential => false,
            MergeStrategy::Chronological | MergeStrategy::Interpolated => true,
            MergeStrategy::Simplified => options.include_elevation,
        }
    }

    #[inline]
    fn handler(self) -> StrategyFn {
        STRATEGIES[self as usize]
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// User-controlled merge settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MergeOptions {
    pub strategy: MergeStrategy,

    /// Drop any point whose exact (lat, lon) was already emitted.
    /// Default: true
    pub skip_duplicate_points: bool,

    /// For the simplified strategy, build the base list chronologically.
    /// Also keeps elevations when committing. Default: true
    pub include_elevation: bool,

    /// For the interpolated strategy, add synthetic points across transitions.
    /// Default: true
    pub auto_smooth_transitions: bool,

    /// Douglas-Peucker tolerance in meters. Default: 10.0
    pub simplification_tolerance_meters: f64,

    /// Gaps longer than this start a new time segment; 0 disables segmentation.
    /// Default: 30.0 minutes
    pub time_gap_threshold_minutes: f64,

    /// Documents taking part in the merge
    pub included_document_ids: BTreeSet<String>,

    /// Merge order of the included documents
    pub document_order: Vec<String>,

    /// Spacing of synthetic points for the interpolated strategy
    pub interpolation: InterpolationConfig,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            strategy: MergeStrategy::Sequential,
            skip_duplicate_points: true,
            include_elevation: true,
            auto_smooth_transitions: true,
            simplification_tolerance_meters: 10.0,
            time_gap_threshold_minutes: 30.0,
            included_document_ids: BTreeSet::new(),
            document_order: Vec::new(),
            interpolation: InterpolationConfig::default(),
        }
    }
}

impl MergeOptions {
    /// Default options including the given documents, merged in the given order.
    pub fn for_documents<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let document_order: Vec<String> = ids.into_iter().map(Into::into).collect();
        Self {
            included_document_ids: document_order.iter().cloned().collect(),
            document_order,
            ..Self::default()
        }
    }

    pub fn with_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_skip_duplicates(mut self, skip: bool) -> Self {
        self.skip_duplicate_points = skip;
        self
    }

    pub fn with_include_elevation(mut self, include: bool) -> Self {
        self.include_elevation = include;
        self
    }

    pub fn with_auto_smooth(mut self, smooth: bool) -> Self {
        self.auto_smooth_transitions = smooth;
        self
    }

    pub fn with_tolerance(mut self, meters: f64) -> Self {
        self.simplification_tolerance_meters = meters;
        self
    }

    pub fn with_time_gap(mut self, minutes: f64) -> Self {
        self.time_gap_threshold_minutes = minutes;
        self
    }

    pub fn with_document_order<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.document_order = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Move a document to the end of the merge order.
    pub fn move_to_end(&mut self, id: &str) {
        self.document_order.retain(|d| d != id);
        self.document_order.push(id.to_string());
    }

    /// Restore the advanced settings to their defaults, keeping strategy and selection.
    pub fn reset_advanced(&mut self) {
        let defaults = Self::default();
        self.skip_duplicate_points = defaults.skip_duplicate_points;
        self.simplification_tolerance_meters = defaults.simplification_tolerance_meters;
        self.include_elevation = defaults.include_elevation;
        self.time_gap_threshold_minutes = defaults.time_gap_threshold_minutes;
    }

    /// Reject settings no strategy can work with.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("simplification_tolerance_meters", self.simplification_tolerance_meters),
            ("time_gap_threshold_minutes", self.time_gap_threshold_minutes),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(MergeError::InvalidOption { name, value });
            }
        }

        let step = self.interpolation.step_meters;
        if !step.is_finite() || step <= 0.0 {
            return Err(MergeError::InvalidOption {
                name: "interpolation.step_meters",
                value: step,
            });
        }

        Ok(())
    }
}

// ============================================================================
// Input selection
// ============================================================================

/// The documents a merge runs over, already filtered and ordered.
#[derive(Debug, Clone)]
pub struct MergeInput<'a> {
    pub documents: Vec<&'a SourceDocument>,
    pub options: &'a MergeOptions,
}

impl<'a> MergeInput<'a> {
    /// Keep the included documents, ordered by `document_order`.
    ///
    /// Included documents missing from `document_order` follow in storage order.
    /// Ids in `document_order` that are unknown or not included are ignored.
    pub fn select(documents: &'a [SourceDocument], options: &'a MergeOptions) -> Self {
        let included: Vec<&SourceDocument> = documents
            .iter()
            .filter(|d| options.included_document_ids.contains(&d.id))
            .collect();

        let mut ordered: Vec<&SourceDocument> = Vec::with_capacity(included.len());
        let mut placed: HashSet<&str> = HashSet::with_capacity(included.len());

        let by_order = options
            .document_order
            .iter()
            .filter_map(|id| included.iter().find(|d| &d.id == id).copied());

        for doc in by_order.chain(included.iter().copied()) {
            if placed.insert(doc.id.as_str()) {
                ordered.push(doc);
            }
        }

        Self {
            documents: ordered,
            options,
        }
    }

    /// Total number of points across the included documents.
    pub fn point_count(&self) -> usize {
        self.documents.iter().map(|d| d.point_count()).sum()
    }
}

// ============================================================================
// Strategy table
// ============================================================================

type StrategyFn = fn(&MergeInput<'_>) -> MergeOutcome;

const STRATEGIES: [StrategyFn; 4] = [sequential, chronological, simplified, interpolated];

/// Run the configured strategy over the stored documents.
///
/// Fewer than two included documents yield an empty configuration with
/// [`MergeNotice::NotEnoughDocuments`].
///
/// # Example
/// ```
/// use track_merger::{merge, MergeNotice, MergeOptions, SourceDocument, Track, TrackPoint};
///
/// let track = Track::new(vec![TrackPoint::new(0.0, 0.0)]);
/// let docs = vec![SourceDocument::new("a", "a.gpx", vec![track])];
/// let outcome = merge(&docs, &MergeOptions::for_documents(["a"]));
///
/// assert!(outcome.configuration.is_empty());
/// assert_eq!(outcome.notice, Some(MergeNotice::NotEnoughDocuments { selected: 1 }));
/// ```
pub fn merge(documents: &[SourceDocument], options: &MergeOptions) -> MergeOutcome {
    merge_input(&MergeInput::select(documents, options))
}

/// Run the configured strategy over an already selected input.
pub fn merge_input(input: &MergeInput<'_>) -> MergeOutcome {
    let selected = input.documents.len();
    if selected < 2 {
        debug!("[Merge] {} document(s) selected, nothing to merge", selected);
        return MergeOutcome::with_notice(MergeNotice::NotEnoughDocuments { selected });
    }

    let strategy = input.options.strategy;
    let outcome = (strategy.handler())(input);

    info!(
        "[Merge] {} merge of {} documents: {} -> {} points",
        strategy,
        selected,
        input.point_count(),
        outcome.configuration.len()
    );

    outcome
}

// ============================================================================
// Strategies
// ============================================================================

/// Concatenate documents, tracks and points in order.
pub fn sequential(input: &MergeInput<'_>) -> MergeOutcome {
    let candidates = sequential_candidates(input);
    MergeOutcome::new(MergeConfiguration::from_refs(
        candidates.into_iter().map(|c| c.reference),
    ))
}

/// Order every timestamped point by time.
pub fn chronological(input: &MergeInput<'_>) -> MergeOutcome {
    let timeline = Timeline::build(input);
    if timeline.is_empty() {
        return MergeOutcome::with_notice(MergeNotice::NoTimestampedPoints);
    }
    MergeOutcome::new(timeline.into_configuration())
}

/// Build a chronological or sequential base, then simplify it.
///
/// The simplifier runs over indices into the base list, so each surviving point
/// keeps the exact reference it came from even when coordinates repeat.
pub fn simplified(input: &MergeInput<'_>) -> MergeOutcome {
    let options = input.options;

    let base: Vec<Candidate<'_>> = if options.include_elevation {
        let timeline = Timeline::build(input);
        if timeline.is_empty() {
            return MergeOutcome::with_notice(MergeNotice::NoTimestampedPoints);
        }
        timeline.points.into_iter().map(|t| t.candidate).collect()
    } else {
        sequential_candidates(input)
    };

    let tolerance = options.simplification_tolerance_meters;
    if base.len() < 2 || tolerance <= 0.0 {
        return MergeOutcome::new(MergeConfiguration::from_refs(
            base.into_iter().map(|c| c.reference),
        ));
    }

    let kept = simplify::simplify_point_indices(base.iter().map(|c| c.point), tolerance);
    debug!(
        "[Merge] Simplified {} -> {} points at {}m tolerance",
        base.len(),
        kept.len(),
        tolerance
    );

    MergeOutcome::new(MergeConfiguration::from_refs(
        kept.into_iter().map(|i| base[i].reference.clone()),
    ))
}

/// Chronological merge with synthetic points across transitions.
pub fn interpolated(input: &MergeInput<'_>) -> MergeOutcome {
    let timeline = Timeline::build(input);
    if timeline.is_empty() {
        return MergeOutcome::with_notice(MergeNotice::NoTimestampedPoints);
    }

    if !input.options.auto_smooth_transitions {
        return MergeOutcome::new(timeline.into_configuration());
    }

    MergeOutcome::new(interpolate::smooth_transitions(
        &timeline,
        &input.options.interpolation,
    ))
}

// ============================================================================
// Building blocks
// ============================================================================

/// A source point paired with its locator.
#[derive(Debug, Clone)]
pub(crate) struct Candidate<'a> {
    pub reference: PointRef,
    pub point: &'a TrackPoint,
}

/// A candidate whose timestamp parsed.
#[derive(Debug, Clone)]
pub(crate) struct TimedCandidate<'a> {
    pub candidate: Candidate<'a>,
    pub time: DateTime<Utc>,
}

/// Timestamp-ordered points with segment boundaries.
#[derive(Debug, Default)]
pub(crate) struct Timeline<'a> {
    pub points: Vec<TimedCandidate<'a>>,
    pub segment_starts: Vec<usize>,
}

impl<'a> Timeline<'a> {
    /// Collect, sort, dedup and segment the timestamped points of `input`.
    pub fn build(input: &MergeInput<'a>) -> Self {
        let options = input.options;

        #[cfg(feature = "parallel")]
        let per_document: Vec<Vec<TimedCandidate<'a>>> = {
            use rayon::prelude::*;
            input
                .documents
                .par_iter()
                .map(|&doc| timed_candidates(doc))
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let per_document: Vec<Vec<TimedCandidate<'a>>> = input
            .documents
            .iter()
            .map(|&doc| timed_candidates(doc))
            .collect();

        let mut points: Vec<TimedCandidate<'a>> = per_document.into_iter().flatten().collect();

        // Stable: equal timestamps keep document/track/point order
        points.sort_by_key(|p| p.time);

        let mut filter = DuplicateFilter::new(options.skip_duplicate_points);
        points.retain(|p| filter.admit(p.candidate.point));

        let segment_starts = segment_starts(&points, options.time_gap_threshold_minutes);

        Self {
            points,
            segment_starts,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn into_configuration(self) -> MergeConfiguration {
        let mut configuration =
            MergeConfiguration::from_refs(self.points.into_iter().map(|p| p.candidate.reference));
        configuration.segment_starts = self.segment_starts;
        configuration
    }
}

/// Indices where the gap to the previous point exceeds the threshold.
fn segment_starts(points: &[TimedCandidate<'_>], threshold_minutes: f64) -> Vec<usize> {
    if threshold_minutes <= 0.0 {
        return Vec::new();
    }
    let threshold_ms = threshold_minutes * 60_000.0;

    points
        .windows(2)
        .enumerate()
        .filter(|(_, w)| (w[1].time - w[0].time).num_milliseconds() as f64 > threshold_ms)
        .map(|(i, _)| i + 1)
        .collect()
}

/// Exact-coordinate duplicate filter.
struct DuplicateFilter {
    enabled: bool,
    seen: HashSet<(u64, u64)>,
}

impl DuplicateFilter {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            seen: HashSet::new(),
        }
    }

    /// Returns `false` for a coordinate already admitted.
    #[inline]
    fn admit(&mut self, point: &TrackPoint) -> bool {
        !self.enabled || self.seen.insert(point.coordinate_key())
    }
}

fn document_candidates(doc: &SourceDocument) -> impl Iterator<Item = Candidate<'_>> {
    doc.tracks
        .iter()
        .enumerate()
        .flat_map(move |(track_index, track)| {
            track
                .points
                .iter()
                .enumerate()
                .map(move |(point_index, point)| Candidate {
                    reference: PointRef::new(doc.id.as_str(), track_index, point_index),
                    point,
                })
        })
}

fn sequential_candidates<'a>(input: &MergeInput<'a>) -> Vec<Candidate<'a>> {
    let mut filter = DuplicateFilter::new(input.options.skip_duplicate_points);
    input
        .documents
        .iter()
        .flat_map(|&doc| document_candidates(doc))
        .filter(|c| filter.admit(c.point))
        .collect()
}

fn timed_candidates(doc: &SourceDocument) -> Vec<TimedCandidate<'_>> {
    document_candidates(doc)
        .filter_map(|candidate| {
            let raw = candidate.point.time.as_deref()?;
            match timestamp::parse(raw) {
                Ok(time) => Some(TimedCandidate { candidate, time }),
                Err(e) => {
                    debug!("[Merge] Skipping {:?}: {}", candidate.reference, e);
                    None
                }
            }
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{resolve, MergeEntry, Track};

    fn doc(id: &str, coords: &[(f64, f64)]) -> SourceDocument {
        let points = coords.iter().map(|&(lat, lon)| TrackPoint::new(lat, lon)).collect();
        SourceDocument::new(id, format!("{}.gpx", id), vec![Track::new(points)])
    }

    fn timed(lat: f64, lon: f64, time: &str) -> TrackPoint {
        TrackPoint::new(lat, lon).with_time(time)
    }

    fn coords(points: &[TrackPoint]) -> Vec<(f64, f64)> {
        points.iter().map(|p| (p.latitude, p.longitude)).collect()
    }

    #[test]
    fn test_strategy_table_matches_variants() {
        for (i, strategy) in MergeStrategy::ALL.iter().enumerate() {
            assert_eq!(*strategy as usize, i);
        }
    }

    #[test]
    fn test_select_orders_by_document_order() {
        let docs = vec![doc("a", &[]), doc("b", &[]), doc("c", &[]), doc("d", &[])];
        let options = MergeOptions::for_documents(["a", "c", "d"])
            .with_document_order(["d", "missing", "a", "b", "d"]);

        let input = MergeInput::select(&docs, &options);
        let ids: Vec<&str> = input.documents.iter().map(|d| d.id.as_str()).collect();
        // b is ordered but not included; c is included but not ordered
        assert_eq!(ids, vec!["d", "a", "c"]);
    }

    #[test]
    fn test_not_enough_documents() {
        let docs = vec![doc("a", &[(0.0, 0.0)]), doc("b", &[(0.0, 1.0)])];
        for strategy in MergeStrategy::ALL {
            let options = MergeOptions::for_documents(["a"]).with_strategy(strategy);
            let outcome = merge(&docs, &options);
            assert!(outcome.configuration.is_empty());
            assert_eq!(
                outcome.notice,
                Some(MergeNotice::NotEnoughDocuments { selected: 1 })
            );
        }
    }

    #[test]
    fn test_sequential_scenario() {
        let docs = vec![
            doc("doc1", &[(0.0, 0.0), (0.0, 1.0)]),
            doc("doc2", &[(0.0, 2.0), (0.0, 3.0)]),
        ];
        let options = MergeOptions::for_documents(["doc1", "doc2"]).with_skip_duplicates(true);

        let outcome = merge(&docs, &options);
        assert!(outcome.notice.is_none());

        let points = resolve(&outcome.configuration, &docs);
        assert_eq!(coords(&points), vec![(0.0, 0.0), (0.0, 1.0), (0.0, 2.0), (0.0, 3.0)]);
    }

    #[test]
    fn test_sequential_respects_order_and_tracks() {
        let mut first = doc("first", &[(1.0, 1.0)]);
        first.tracks.push(Track::new(vec![TrackPoint::new(1.0, 2.0)]));
        let docs = vec![first, doc("second", &[(2.0, 1.0)])];

        let options = MergeOptions::for_documents(["second", "first"]);
        let outcome = merge(&docs, &options);

        let refs: Vec<&PointRef> = outcome.configuration.references().collect();
        assert_eq!(
            refs,
            vec![
                &PointRef::new("second", 0, 0),
                &PointRef::new("first", 0, 0),
                &PointRef::new("first", 1, 0),
            ]
        );
    }

    #[test]
    fn test_sequential_without_dedup_keeps_every_point() {
        let docs = vec![
            doc("a", &[(0.0, 0.0), (0.0, 1.0), (0.0, 0.0)]),
            doc("b", &[(0.0, 1.0), (5.0, 5.0)]),
        ];
        let options = MergeOptions::for_documents(["a", "b"]).with_skip_duplicates(false);
        let outcome = merge(&docs, &options);
        assert_eq!(outcome.configuration.len(), 5);
    }

    #[test]
    fn test_sequential_dedup_shared_coordinate() {
        let docs = vec![
            doc("a", &[(10.0, 10.0), (10.5, 10.5)]),
            doc("b", &[(10.5, 10.5), (11.0, 11.0)]),
        ];
        let options = MergeOptions::for_documents(["a", "b"]);
        let outcome = merge(&docs, &options);

        let points = resolve(&outcome.configuration, &docs);
        assert_eq!(points.len(), 3);
        let shared = points.iter().filter(|p| p.latitude == 10.5).count();
        assert_eq!(shared, 1);
        // The first occurrence wins
        assert_eq!(
            outcome.configuration.references().nth(1),
            Some(&PointRef::new("a", 0, 1))
        );
    }

    #[test]
    fn test_chronological_sorts_out_of_order_points() {
        let a = SourceDocument::new(
            "a",
            "a.gpx",
            vec![Track::new(vec![
                timed(0.0, 2.0, "2024-05-01T08:02:00Z"),
                timed(0.0, 1.0, "2024-05-01T08:01:00Z"),
            ])],
        );
        let b = SourceDocument::new(
            "b",
            "b.gpx",
            vec![Track::new(vec![timed(0.0, 3.0, "2024-05-01T08:03:00Z")])],
        );
        let docs = vec![a, b];
        let options =
            MergeOptions::for_documents(["a", "b"]).with_strategy(MergeStrategy::Chronological);

        let points = resolve(&merge(&docs, &options).configuration, &docs);
        let times: Vec<&str> = points.iter().filter_map(|p| p.time.as_deref()).collect();
        assert_eq!(
            times,
            vec![
                "2024-05-01T08:01:00Z",
                "2024-05-01T08:02:00Z",
                "2024-05-01T08:03:00Z"
            ]
        );
    }

    #[test]
    fn test_chronological_ties_are_deterministic() {
        let same = "2024-05-01T08:00:00Z";
        let docs = vec![
            SourceDocument::new(
                "a",
                "a.gpx",
                vec![Track::new(vec![timed(1.0, 0.0, same), timed(2.0, 0.0, same)])],
            ),
            SourceDocument::new(
                "b",
                "b.gpx",
                vec![Track::new(vec![
                    timed(3.0, 0.0, "2024-05-01T07:59:00Z"),
                    timed(4.0, 0.0, same),
                ])],
            ),
        ];
        let options =
            MergeOptions::for_documents(["a", "b"]).with_strategy(MergeStrategy::Chronological);

        let first = merge(&docs, &options);
        let second = merge(&docs, &options);
        assert_eq!(first, second);

        let refs: Vec<&PointRef> = first.configuration.references().collect();
        assert_eq!(
            refs,
            vec![
                &PointRef::new("b", 0, 0),
                &PointRef::new("a", 0, 0),
                &PointRef::new("a", 0, 1),
                &PointRef::new("b", 0, 1),
            ]
        );
    }

    #[test]
    fn test_chronological_output_is_non_decreasing() {
        let docs: Vec<SourceDocument> = (0..3)
            .map(|d| {
                let points = (0..20)
                    .map(|i| {
                        let minute = (i * 7 + d * 13) % 60;
                        let time = format!("2024-05-01T08:{:02}:00Z", minute);
                        timed(d as f64, i as f64 * 0.001, &time)
                    })
                    .collect();
                SourceDocument::new(format!("d{}", d), "x.gpx", vec![Track::new(points)])
            })
            .collect();
        let options = MergeOptions::for_documents(["d0", "d1", "d2"])
            .with_strategy(MergeStrategy::Chronological)
            .with_skip_duplicates(false);

        let points = resolve(&merge(&docs, &options).configuration, &docs);
        assert_eq!(points.len(), 60);
        let times: Vec<DateTime<Utc>> = points
            .iter()
            .map(|p| timestamp::parse(p.time.as_deref().unwrap()).unwrap())
            .collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_chronological_skips_bad_timestamps() {
        let docs = vec![
            SourceDocument::new(
                "a",
                "a.gpx",
                vec![Track::new(vec![
                    timed(0.0, 0.0, "2024-05-01T08:00:00Z"),
                    timed(0.0, 1.0, "garbage"),
                    TrackPoint::new(0.0, 2.0),
                ])],
            ),
            SourceDocument::new(
                "b",
                "b.gpx",
                vec![Track::new(vec![timed(0.0, 3.0, "2024-05-01T08:05:00Z")])],
            ),
        ];
        let options =
            MergeOptions::for_documents(["a", "b"]).with_strategy(MergeStrategy::Chronological);
        let outcome = merge(&docs, &options);
        assert!(outcome.notice.is_none());
        assert_eq!(outcome.configuration.len(), 2);
    }

    #[test]
    fn test_chronological_without_timestamps() {
        let docs = vec![doc("a", &[(0.0, 0.0)]), doc("b", &[(0.0, 1.0)])];
        for strategy in [MergeStrategy::Chronological, MergeStrategy::Interpolated] {
            let options = MergeOptions::for_documents(["a", "b"]).with_strategy(strategy);
            let outcome = merge(&docs, &options);
            assert!(outcome.configuration.is_empty());
            assert_eq!(outcome.notice, Some(MergeNotice::NoTimestampedPoints));
        }
    }

    #[test]
    fn test_chronological_dedup_in_time_order() {
        // The later-stored copy is earlier in time, so it is the one kept
        let docs = vec![
            SourceDocument::new(
                "a",
                "a.gpx",
                vec![Track::new(vec![timed(5.0, 5.0, "2024-05-01T09:00:00Z")])],
            ),
            SourceDocument::new(
                "b",
                "b.gpx",
                vec![Track::new(vec![timed(5.0, 5.0, "2024-05-01T08:00:00Z")])],
            ),
        ];
        let options =
            MergeOptions::for_documents(["a", "b"]).with_strategy(MergeStrategy::Chronological);
        let outcome = merge(&docs, &options);
        let refs: Vec<&PointRef> = outcome.configuration.references().collect();
        assert_eq!(refs, vec![&PointRef::new("b", 0, 0)]);
    }

    #[test]
    fn test_chronological_segments_on_gaps() {
        let docs = vec![
            SourceDocument::new(
                "a",
                "a.gpx",
                vec![Track::new(vec![
                    timed(0.0, 0.0, "2024-05-01T08:00:00Z"),
                    timed(0.0, 0.1, "2024-05-01T08:10:00Z"),
                ])],
            ),
            SourceDocument::new(
                "b",
                "b.gpx",
                vec![Track::new(vec![
                    timed(0.0, 0.2, "2024-05-01T09:00:00Z"),
                    timed(0.0, 0.3, "2024-05-01T09:30:00Z"),
                ])],
            ),
        ];
        let options = MergeOptions::for_documents(["a", "b"])
            .with_strategy(MergeStrategy::Chronological)
            .with_time_gap(30.0);

        let configuration = merge(&docs, &options).configuration;
        // 50 minute gap splits; exactly 30 minutes does not
        assert_eq!(configuration.len(), 4);
        assert_eq!(configuration.segment_starts, vec![2]);
        assert_eq!(configuration.segments(), vec![0..2, 2..4]);

        let flat = merge(&docs, &options.clone().with_time_gap(0.0)).configuration;
        assert!(flat.segment_starts.is_empty());
        assert_eq!(flat.entries, configuration.entries);
    }

    #[test]
    fn test_simplified_sequential_base() {
        let docs = vec![
            doc("a", &[(0.0, 0.000), (0.0, 0.001), (0.0, 0.002)]),
            doc("b", &[(0.0, 0.003), (0.0, 0.004)]),
        ];
        let options = MergeOptions::for_documents(["a", "b"])
            .with_strategy(MergeStrategy::Simplified)
            .with_include_elevation(false)
            .with_tolerance(1.0);

        let refs: Vec<PointRef> = merge(&docs, &options)
            .configuration
            .references()
            .cloned()
            .collect();
        assert_eq!(refs, vec![PointRef::new("a", 0, 0), PointRef::new("b", 0, 1)]);
    }

    #[test]
    fn test_simplified_zero_tolerance_returns_base() {
        let docs = vec![
            doc("a", &[(0.0, 0.000), (0.0, 0.001), (0.0, 0.002)]),
            doc("b", &[(0.0, 0.003)]),
        ];
        let options = MergeOptions::for_documents(["a", "b"])
            .with_strategy(MergeStrategy::Simplified)
            .with_include_elevation(false)
            .with_tolerance(0.0);
        assert_eq!(merge(&docs, &options).configuration.len(), 4);
    }

    #[test]
    fn test_simplified_maps_duplicates_to_exact_reference() {
        // Same coordinate visited twice; without dedup both visits are distinct references
        let docs = vec![
            doc("a", &[(0.0, 0.0), (0.001, 0.001), (0.0, 0.002)]),
            doc("b", &[(0.001, 0.001), (0.0, 0.004)]),
        ];
        let options = MergeOptions::for_documents(["a", "b"])
            .with_strategy(MergeStrategy::Simplified)
            .with_include_elevation(false)
            .with_skip_duplicates(false)
            .with_tolerance(10.0);

        let refs: Vec<PointRef> = merge(&docs, &options)
            .configuration
            .references()
            .cloned()
            .collect();
        assert_eq!(
            refs,
            vec![
                PointRef::new("a", 0, 0),
                PointRef::new("a", 0, 1),
                PointRef::new("a", 0, 2),
                PointRef::new("b", 0, 0),
                PointRef::new("b", 0, 1),
            ]
        );
    }

    #[test]
    fn test_simplified_chronological_base() {
        let docs = vec![
            SourceDocument::new(
                "a",
                "a.gpx",
                vec![Track::new(vec![
                    timed(0.0, 0.002, "2024-05-01T08:02:00Z"),
                    TrackPoint::new(0.0, 0.9),
                ])],
            ),
            SourceDocument::new(
                "b",
                "b.gpx",
                vec![Track::new(vec![
                    timed(0.0, 0.000, "2024-05-01T08:00:00Z"),
                    timed(0.0, 0.001, "2024-05-01T08:01:00Z"),
                ])],
            ),
        ];
        let options = MergeOptions::for_documents(["a", "b"])
            .with_strategy(MergeStrategy::Simplified)
            .with_include_elevation(true)
            .with_tolerance(1.0);

        let refs: Vec<PointRef> = merge(&docs, &options)
            .configuration
            .references()
            .cloned()
            .collect();
        // The untimed point is dropped, the rest ordered by time, then collapsed
        assert_eq!(refs, vec![PointRef::new("b", 0, 0), PointRef::new("a", 0, 0)]);

        let untimed = vec![doc("a", &[(0.0, 0.0)]), doc("b", &[(0.0, 1.0)])];
        assert_eq!(
            merge(&untimed, &options).notice,
            Some(MergeNotice::NoTimestampedPoints)
        );
    }

    #[test]
    fn test_interpolated_without_smoothing_equals_chronological() {
        let docs = vec![
            SourceDocument::new(
                "a",
                "a.gpx",
                vec![Track::new(vec![timed(0.0, 0.0, "2024-05-01T08:00:00Z")])],
            ),
            SourceDocument::new(
                "b",
                "b.gpx",
                vec![Track::new(vec![timed(0.0, 0.01, "2024-05-01T08:10:00Z")])],
            ),
        ];
        let base = MergeOptions::for_documents(["a", "b"]).with_auto_smooth(false);
        let chrono = merge(&docs, &base.clone().with_strategy(MergeStrategy::Chronological));
        let interp = merge(&docs, &base.with_strategy(MergeStrategy::Interpolated));
        assert_eq!(chrono, interp);
    }

    #[test]
    fn test_interpolated_fills_document_transition() {
        let docs = vec![
            SourceDocument::new(
                "a",
                "a.gpx",
                vec![Track::new(vec![timed(0.0, 0.0, "2024-05-01T08:00:00Z")])],
            ),
            SourceDocument::new(
                "b",
                "b.gpx",
                vec![Track::new(vec![timed(0.0, 0.001, "2024-05-01T08:01:00Z")])],
            ),
        ];
        let options = MergeOptions::for_documents(["a", "b"])
            .with_strategy(MergeStrategy::Interpolated)
            .with_auto_smooth(true);

        let configuration = merge(&docs, &options).configuration;
        // ~111 m at 25 m spacing: 4 synthetic points between the two sources
        assert_eq!(configuration.len(), 6);
        assert_eq!(configuration.interpolated_count(), 4);
        assert!(matches!(configuration.entries[0], MergeEntry::Source(_)));
        assert!(matches!(configuration.entries[5], MergeEntry::Source(_)));
    }

    #[test]
    fn test_validate_options() {
        assert!(MergeOptions::default().validate().is_ok());
        assert!(MergeOptions::default().with_tolerance(-1.0).validate().is_err());
        assert!(MergeOptions::default().with_time_gap(f64::NAN).validate().is_err());

        let mut options = MergeOptions::default();
        options.interpolation.step_meters = 0.0;
        assert_eq!(
            options.validate(),
            Err(MergeError::InvalidOption {
                name: "interpolation.step_meters",
                value: 0.0
            })
        );
    }

    #[test]
    fn test_reset_advanced_keeps_selection() {
        let mut options = MergeOptions::for_documents(["a", "b"])
            .with_strategy(MergeStrategy::Simplified)
            .with_tolerance(50.0)
            .with_skip_duplicates(false)
            .with_time_gap(5.0);
        options.reset_advanced();

        assert_eq!(options.strategy, MergeStrategy::Simplified);
        assert_eq!(options.simplification_tolerance_meters, 10.0);
        assert!(options.skip_duplicate_points);
        assert_eq!(options.time_gap_threshold_minutes, 30.0);
        assert_eq!(options.document_order, vec!["a", "b"]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_options_serde_roundtrip() {
        let options = MergeOptions::for_documents(["a", "b"])
            .with_strategy(MergeStrategy::Interpolated)
            .with_tolerance(2.5);
        let json = serde_json::to_string(&options).unwrap();
        let back: MergeOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, options);
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(MergeStrategy::Chronological.to_string(), "chronological");
        assert_eq!(format!("{:>8}", MergeStrategy::Simplified), "simplified");
        assert_eq!(format!("{:>12}", MergeStrategy::Sequential), "  sequential");
    }

    #[test]
    fn test_move_to_end() {
        let mut options = MergeOptions::for_documents(["a", "b", "c"]);
        options.move_to_end("a");
        assert_eq!(options.document_order, vec!["b", "c", "a"]);
    }
}
