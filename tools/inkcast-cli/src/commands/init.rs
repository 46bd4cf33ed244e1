//! Create a new Inkcast session.

use std::path::PathBuf;

use inkcast_common::config::AppConfig;
use inkcast_session_model::LoadedSession;

pub fn run(config: &AppConfig, name: String, output: Option<PathBuf>) -> anyhow::Result<()> {
    let output = output.unwrap_or_else(|| config.sessions_dir.clone());
    let session_dir = output.join(&name);
    println!("Creating session '{}' at {}", name, session_dir.display());

    let session = LoadedSession::create(&session_dir, &name, &config.recording)
        .map_err(|e| anyhow::anyhow!("Failed to create session: {e}"))?;

    println!("Session created successfully:");
    println!("  Directory: {}", session.root.display());
    println!(
        "  Audio: {} Hz, {} byte(s) per sample",
        session.meta.audio.sample_rate, session.meta.audio.sample_size
    );
    println!("  Canvas ratio: {}", session.meta.canvas.ratio);
    println!();
    println!("Directory structure:");
    println!("  {}/", name);
    println!("  ├── meta/        (session.json, events.jsonl, points.json)");
    println!("  └── audio/       (raw narration PCM)");

    Ok(())
}
