//! Record an input journal into a session.

use std::path::PathBuf;

use inkcast_common::clock::ManualClock;
use inkcast_common::config::AppConfig;
use inkcast_input::backends::JournalBackend;
use inkcast_input::{CanvasGeometry, CanvasInput, InputTracker};

pub async fn run(config: &AppConfig, path: PathBuf, journal: PathBuf) -> anyhow::Result<()> {
    let clock = ManualClock::new();
    let (mut session, mut timeline) =
        super::open_timeline(config, &path, Box::new(clock.clone()))?;

    let backend = JournalBackend::open(&journal, clock)
        .map_err(|e| anyhow::anyhow!("Failed to open journal: {e}"))?;
    let geometry = backend
        .header()
        .map(|h| h.canvas)
        .unwrap_or_else(|| CanvasGeometry {
            ratio: session.meta.canvas.ratio,
            ..CanvasGeometry::default()
        });

    println!("Ingesting {} into {}", journal.display(), path.display());
    println!("  Records: {}", backend.remaining());
    println!("  Recording from: {} ms", timeline.total_time_recorded());

    let events_before = timeline.log().len();
    let mut tracker = InputTracker::new(Box::new(backend), CanvasInput::new(geometry));

    let stop = tracker.stop_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.store(true, std::sync::atomic::Ordering::SeqCst);
        }
    });

    let applied = tracker.run(&mut timeline).await?;

    super::save_timeline(&timeline, &mut session)?;

    println!();
    println!("Ingest complete:");
    println!("  Applied: {applied}");
    println!("  Rejected: {}", tracker.records_rejected());
    println!(
        "  New events: {}",
        timeline.log().len().saturating_sub(events_before)
    );
    println!("  Recorded time: {} ms", timeline.total_time_recorded());

    Ok(())
}
