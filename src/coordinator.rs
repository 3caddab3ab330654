//! Single-flight recompute coordinator.
//!
//! Interactive option changes arrive faster than merges complete. The coordinator
//! runs at most one merge at a time and keeps at most one request waiting; a newer
//! request replaces the waiting one. When a merge finishes, the waiting request (if
//! any) runs next with the latest options, so the published snapshot always
//! converges on the most recent submission.
//!
//! ```text
//!            submit                      drive
//!   Idle ─────────────► Idle+pending ─────────────► Computing
//!    ▲                                                  │
//!    └──────────── no pending left ◄── publish ◄────────┘
//! ```
//!
//! The lock is never held while a merge runs, so submissions arriving mid-merge,
//! from another thread or reentrantly from the [`DocumentSource`], only touch the
//! pending slot.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};

use crate::merge::{self, MergeInput, MergeOptions};
use crate::preview::PreviewStatistics;
use crate::{MergeOutcome, SourceDocument};

/// Read access to the stored documents.
pub trait DocumentSource {
    fn documents(&self) -> &[SourceDocument];
}

impl DocumentSource for [SourceDocument] {
    fn documents(&self) -> &[SourceDocument] {
        self
    }
}

impl DocumentSource for Vec<SourceDocument> {
    fn documents(&self) -> &[SourceDocument] {
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinatorState {
    #[default]
    Idle,
    Computing,
}

/// What happened to a submitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The pending slot was empty
    Queued,
    /// An older pending request was discarded in favor of this one
    Coalesced,
}

/// A published merge result. Immutable once published.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeSnapshot {
    /// Increases by one per published snapshot, starting at 1
    pub generation: u64,
    pub options: MergeOptions,
    pub outcome: MergeOutcome,
    pub statistics: PreviewStatistics,
}

impl MergeSnapshot {
    /// Merge and measure in one go.
    fn compute(generation: u64, options: MergeOptions, documents: &[SourceDocument]) -> Self {
        let input = MergeInput::select(documents, &options);
        let outcome = merge::merge_input(&input);
        let statistics =
            PreviewStatistics::compute(&input.documents, &outcome.configuration, &options);
        Self {
            generation,
            options,
            outcome,
            statistics,
        }
    }
}

/// Lifetime counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoordinatorStats {
    pub submitted: u64,
    /// Merges that ran to completion and were published
    pub computations: u64,
    /// Pending requests replaced before they started
    pub discarded: u64,
    /// Requests dropped because their options failed validation
    pub rejected: u64,
}

#[derive(Debug, Default)]
struct Inner {
    state: CoordinatorState,
    pending: Option<MergeOptions>,
    latest: Option<Arc<MergeSnapshot>>,
    next_generation: u64,
    stats: CoordinatorStats,
}

/// Coalescing driver for merge recomputation.
///
/// # Example
/// ```
/// use track_merger::{
///     MergeOptions, MergeStrategy, RecomputeCoordinator, SourceDocument, Track, TrackPoint,
/// };
///
/// let docs = vec![
///     SourceDocument::new("a", "a.gpx", vec![Track::new(vec![TrackPoint::new(0.0, 0.0)])]),
///     SourceDocument::new("b", "b.gpx", vec![Track::new(vec![TrackPoint::new(0.0, 1.0)])]),
/// ];
/// let coordinator = RecomputeCoordinator::new();
///
/// // Rapid changes: only the last one is computed
/// let options = MergeOptions::for_documents(["a", "b"]);
/// coordinator.submit(options.clone().with_strategy(MergeStrategy::Chronological));
/// coordinator.submit(options);
///
/// let snapshot = coordinator.drive(&docs).unwrap();
/// assert_eq!(snapshot.generation, 1);
/// assert_eq!(snapshot.outcome.configuration.len(), 2);
/// assert_eq!(coordinator.stats().discarded, 1);
/// ```
#[derive(Debug, Default)]
pub struct RecomputeCoordinator {
    inner: Mutex<Inner>,
}

impl RecomputeCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking merge cannot leave Inner half-written
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `options` as the pending request, replacing any older one.
    pub fn submit(&self, options: MergeOptions) -> Submission {
        let mut inner = self.lock();
        inner.stats.submitted += 1;
        match inner.pending.replace(options) {
            Some(_) => {
                inner.stats.discarded += 1;
                debug!("[Coordinator] Replaced pending request");
                Submission::Coalesced
            }
            None => Submission::Queued,
        }
    }

    /// Submit and drive in one call.
    pub fn request<S>(&self, options: MergeOptions, source: &S) -> Option<Arc<MergeSnapshot>>
    where
        S: DocumentSource + ?Sized,
    {
        self.submit(options);
        self.drive(source)
    }

    /// Run pending requests until none is left, then return the latest snapshot.
    ///
    /// Returns `None` immediately when another call is already computing; that
    /// call picks up whatever is pending. Also `None` when nothing has ever been
    /// published.
    pub fn drive<S>(&self, source: &S) -> Option<Arc<MergeSnapshot>>
    where
        S: DocumentSource + ?Sized,
    {
        let mut inner = self.lock();
        if inner.state == CoordinatorState::Computing {
            debug!("[Coordinator] Merge in flight, leaving request pending");
            return None;
        }

        loop {
            let Some(options) = inner.pending.take() else {
                inner.state = CoordinatorState::Idle;
                return inner.latest.clone();
            };

            if let Err(e) = options.validate() {
                warn!("[Coordinator] Rejected request: {}", e);
                inner.stats.rejected += 1;
                continue;
            }

            inner.next_generation += 1;
            let generation = inner.next_generation;
            inner.state = CoordinatorState::Computing;
            drop(inner);

            let snapshot = {
                let _reset = ResetOnUnwind(self);
                MergeSnapshot::compute(generation, options, source.documents())
            };

            inner = self.lock();
            info!(
                "[Coordinator] Published generation {} ({} points)",
                snapshot.generation,
                snapshot.outcome.configuration.len()
            );
            inner.latest = Some(Arc::new(snapshot));
            inner.stats.computations += 1;
        }
    }

    /// Most recently published snapshot.
    pub fn latest(&self) -> Option<Arc<MergeSnapshot>> {
        self.lock().latest.clone()
    }

    pub fn state(&self) -> CoordinatorState {
        self.lock().state
    }

    pub fn has_pending(&self) -> bool {
        self.lock().pending.is_some()
    }

    pub fn stats(&self) -> CoordinatorStats {
        self.lock().stats
    }
}

/// Returns the coordinator to `Idle` if a merge panics.
struct ResetOnUnwind<'a>(&'a RecomputeCoordinator);

impl Drop for ResetOnUnwind<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.lock().state = CoordinatorState::Idle;
        }
    }
}
