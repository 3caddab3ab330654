//! Drive the recompute coordinator from several threads, like a UI firing
//! option changes while the previous merge is still running.
//!
//! Run with: cargo run --example recompute

use std::sync::Arc;
use std::thread;

use track_merger::{
    MergeOptions, MergeStrategy, RecomputeCoordinator, SourceDocument, Track, TrackPoint,
};

fn synthetic_document(id: usize, points: usize) -> SourceDocument {
    let track = (0..points)
        .map(|i| {
            let t = i as f64 / points as f64;
            let lat = 45.0 + t * 0.05 + (t * 40.0).sin() * 0.0004;
            let lon = 7.0 + t * 0.08 + id as f64 * 0.0001;
            TrackPoint::new(lat, lon)
                .with_time(format!(
                    "2024-05-01T{:02}:{:02}:{:02}Z",
                    8 + id,
                    (i / 60) % 60,
                    i % 60
                ))
        })
        .collect();
    SourceDocument::new(format!("doc-{}", id), format!("ride-{}.gpx", id), vec![Track::new(track)])
}

fn main() {
    let documents: Arc<Vec<SourceDocument>> =
        Arc::new((0..4).map(|i| synthetic_document(i, 3_000)).collect());
    let ids: Vec<String> = documents.iter().map(|d| d.id.clone()).collect();
    let coordinator = Arc::new(RecomputeCoordinator::new());

    // Slider drags: many tolerance changes in quick succession
    let handles: Vec<_> = (1..=20)
        .map(|step| {
            let documents = Arc::clone(&documents);
            let coordinator = Arc::clone(&coordinator);
            let options = MergeOptions::for_documents(ids.clone())
                .with_strategy(MergeStrategy::Simplified)
                .with_tolerance(step as f64 * 2.5);
            thread::spawn(move || coordinator.request(options, documents.as_slice()))
        })
        .collect();

    for handle in handles {
        if handle.join().is_err() {
            eprintln!("worker panicked");
        }
    }
    coordinator.drive(documents.as_slice());

    let stats = coordinator.stats();
    println!("Recompute Coordinator\n");
    println!("  submitted:    {}", stats.submitted);
    println!("  computed:     {}", stats.computations);
    println!("  coalesced:    {}", stats.discarded);

    if let Some(snapshot) = coordinator.latest() {
        println!("\nLatest snapshot (generation {}):", snapshot.generation);
        println!(
            "  tolerance {}m: {} -> {} points, {} estimated",
            snapshot.options.simplification_tolerance_meters,
            snapshot.statistics.original_point_count,
            snapshot.statistics.merged_point_count,
            snapshot.statistics.estimated_size_label()
        );
    }
}
