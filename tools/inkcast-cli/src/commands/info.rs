//! Show session information.

use std::collections::BTreeMap;
use std::path::PathBuf;

use inkcast_common::clock::RecordingClock;
use inkcast_session_model::LoadedSession;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let session =
        LoadedSession::load(&path).map_err(|e| anyhow::anyhow!("Failed to load session: {e}"))?;

    let m = &session.meta;

    println!("Session: {}", m.name);
    println!("  ID: {}", m.id);
    println!("  Created: {}", m.created_at);
    println!("  Modified: {}", m.modified_at);
    println!();

    println!("Canvas:");
    println!("  Ratio: {}", m.canvas.ratio);
    println!(
        "  Resample spacing: {} (y scale {})",
        m.canvas.resample.spacing, m.canvas.resample.y_scale
    );
    println!(
        "  Points: {} / {}",
        session.points.len(),
        m.canvas.point_capacity
    );
    println!();

    println!("Audio:");
    println!(
        "  Format: {} Hz, {} byte(s) per sample",
        m.audio.sample_rate, m.audio.sample_size
    );
    match &m.audio_file {
        Some(file) => println!("  File: {file}"),
        None => println!("  File: none"),
    }
    println!();

    let mut per_kind: BTreeMap<String, usize> = BTreeMap::new();
    for ev in &session.events {
        *per_kind.entry(format!("{:?}", ev.kind())).or_default() += 1;
    }
    println!("Timeline:");
    println!(
        "  Recorded: {:.1}s",
        RecordingClock::ms_to_secs(m.total_time_recorded)
    );
    println!("  Events: {}", session.events.len());
    for (kind, count) in &per_kind {
        println!("    {kind}: {count}");
    }
    let open = session.events.iter().filter(|e| e.is_open()).count();
    if open > 0 {
        println!("  Open events: {open}");
    }

    Ok(())
}
