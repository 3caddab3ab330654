//! Merge two recordings of the same outing with every strategy.
//!
//! Run with: cargo run --example basic_merge

use track_merger::{
    commit, geo_utils, merge, resolve, MergeOptions, MergeStrategy, SourceDocument, Track,
    TrackPoint, TrackSummary,
};

fn recording(id: &str, file_name: &str, start_minute: u32, offset: f64) -> SourceDocument {
    let points = (0..6)
        .map(|i| {
            TrackPoint::new(51.5074 + i as f64 * 0.0008, -0.1278 + offset + i as f64 * 0.0011)
                .with_elevation(20.0 + i as f64 * 1.5)
                .with_time(format!("2024-05-01T08:{:02}:00Z", start_minute + i))
        })
        .collect();
    SourceDocument::new(id, file_name, vec![Track::new(points)])
}

fn main() {
    // Two devices on the same ride, the second one started later
    let documents = vec![
        recording("watch", "Watch.gpx", 0, 0.0),
        recording("phone", "Phone.gpx", 3, 0.00002),
    ];

    println!("Track Merge Examples\n");

    for strategy in MergeStrategy::ALL {
        let options = MergeOptions::for_documents(["watch", "phone"]).with_strategy(strategy);
        let outcome = merge(&documents, &options);

        if let Some(notice) = outcome.notice {
            println!("{:>13}: {}", strategy, notice);
            continue;
        }

        let points = resolve(&outcome.configuration, &documents);
        let summary = TrackSummary::from_points(&points);
        println!(
            "{:>13}: {} points ({} interpolated), {}, {}",
            strategy,
            summary.point_count,
            outcome.configuration.interpolated_count(),
            geo_utils::format_distance(summary.distance_meters),
            summary
                .duration_seconds
                .map(|s| geo_utils::format_duration(s, false))
                .unwrap_or_else(|| "N/A".to_string()),
        );
    }

    let options =
        MergeOptions::for_documents(["watch", "phone"]).with_strategy(MergeStrategy::Chronological);
    let outcome = merge(&documents, &options);

    match commit(&outcome.configuration, &documents, &options) {
        Ok(merged) => {
            println!("\nCommitted document:");
            println!("  id: {}", merged.id);
            println!("  file: {}", merged.file_name);
            println!("  name: {}", merged.display_name());
            if let Some(description) = &merged.metadata.description {
                println!("  description: {}", description);
            }
            println!("  points: {}", merged.point_count());
        }
        Err(e) => println!("\nCommit failed: {}", e),
    }
}
