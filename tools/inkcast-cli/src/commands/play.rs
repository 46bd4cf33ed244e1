//! Play a session back in real time.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use inkcast_common::clock::{RateController, RecordingClock, TimeMs};
use inkcast_common::config::AppConfig;
use inkcast_session_model::PointBuffer;
use inkcast_timeline::{DrawRequest, RenderBackend, TransportState};

/// Counts what playback draws without keeping the requests.
#[derive(Debug, Default)]
struct DrawTally {
    requests: usize,

    /// Points drawn since the last clear.
    points: usize,
}

impl RenderBackend for DrawTally {
    fn clear(&mut self) {
        self.points = 0;
    }

    fn draw(&mut self, _points: &PointBuffer, request: &DrawRequest) {
        self.requests += 1;
        self.points += request.count;
    }
}

pub async fn run(config: &AppConfig, path: PathBuf, from: TimeMs) -> anyhow::Result<()> {
    let (_session, mut timeline) =
        super::open_timeline(config, &path, Box::new(RecordingClock::start()))?;

    timeline.seek(from)?;
    let start = timeline.play()?;
    println!(
        "Playing {} from {start} ms to {} ms. Press Ctrl+C to stop.",
        path.display(),
        timeline.total_time_recorded()
    );

    let mut tally = DrawTally::default();
    let mut rate = RateController::new(config.recording.display_refresh_hz);
    let mut ticker = tokio::time::interval(Duration::from_millis(1));
    let epoch = Instant::now();
    let mut frames = 0u64;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                timeline.stop();
                break;
            }
            _ = ticker.tick() => {}
        }
        if !rate.should_tick(epoch.elapsed().as_nanos() as u64) {
            continue;
        }

        frames += 1;
        timeline.frame(&mut tally);
        if timeline.state() == TransportState::Idle {
            break;
        }
    }

    println!();
    println!("Playback stopped at {} ms", timeline.current_time());
    println!("  Frames: {frames}");
    println!("  Draw requests: {}", tally.requests);
    println!(
        "  Points drawn: {} / {}",
        tally.points,
        timeline.points().len()
    );
    tracing::debug!(
        frames,
        requests = tally.requests,
        elapsed_ms = epoch.elapsed().as_millis() as u64,
        "Playback finished"
    );

    Ok(())
}
