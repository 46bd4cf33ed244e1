//! Replay a session up to a time.

use std::path::PathBuf;

use inkcast_common::clock::{ManualClock, TimeMs};
use inkcast_common::config::AppConfig;
use inkcast_timeline::RecordingBackend;

pub fn run(config: &AppConfig, path: PathBuf, at: TimeMs, json: bool) -> anyhow::Result<()> {
    let (_session, mut timeline) =
        super::open_timeline(config, &path, Box::new(ManualClock::new()))?;

    let t = timeline
        .seek(at)
        .map_err(|e| anyhow::anyhow!("Seek failed: {e}"))?;
    let mut backend = RecordingBackend::new();
    let issued = timeline.frame(&mut backend);

    if json {
        for request in &backend.requests {
            println!("{}", serde_json::to_string(request)?);
        }
        return Ok(());
    }

    println!("Replay at {t} ms (of {} ms):", timeline.total_time_recorded());
    println!("  Draw requests: {issued}");
    println!(
        "  Points visible: {} / {}",
        backend.covered().len(),
        timeline.points().len()
    );
    match backend.cursor {
        Some(p) => println!("  Cursor: ({:.3}, {:.3})", p.x, p.y),
        None => println!("  Cursor: none"),
    }
    for request in &backend.requests {
        let [r, g, b] = request.color.to_u8();
        println!(
            "    {} points {}..{} #{r:02x}{g:02x}{b:02x} size {}",
            request.event,
            request.from,
            request.from + request.count,
            request.point_size
        );
    }

    Ok(())
}
