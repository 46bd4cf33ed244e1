pub mod edit;
pub mod info;
pub mod ingest;
pub mod init;
pub mod play;
pub mod replay;
pub mod validate;

use std::path::Path;

use inkcast_common::clock::TimeSource;
use inkcast_common::config::AppConfig;
use inkcast_session_model::LoadedSession;
use inkcast_timeline::Timeline;

/// Load a session and rebuild its timeline on `clock`.
pub fn open_timeline(
    config: &AppConfig,
    path: &Path,
    clock: Box<dyn TimeSource>,
) -> anyhow::Result<(LoadedSession, Timeline)> {
    let session =
        LoadedSession::load(path).map_err(|e| anyhow::anyhow!("Failed to load session: {e}"))?;
    let timeline = Timeline::from_session(&session, &config.thumbnail, clock)
        .map_err(|e| anyhow::anyhow!("Failed to open timeline: {e}"))?;
    Ok((session, timeline))
}

/// Write the timeline back into its session directory.
pub fn save_timeline(timeline: &Timeline, session: &mut LoadedSession) -> anyhow::Result<()> {
    timeline
        .save_into(session)
        .map_err(|e| anyhow::anyhow!("Failed to update session: {e}"))?;
    session
        .save()
        .map_err(|e| anyhow::anyhow!("Failed to save session: {e}"))?;
    Ok(())
}
