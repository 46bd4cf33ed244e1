//! Edit a time window of a session.

use std::path::PathBuf;

use inkcast_common::clock::{ManualClock, TimeMs};
use inkcast_common::config::AppConfig;

use crate::EditOperation;

pub fn run(
    config: &AppConfig,
    path: PathBuf,
    from: TimeMs,
    to: TimeMs,
    exact: bool,
    operation: EditOperation,
) -> anyhow::Result<()> {
    let (mut session, mut timeline) =
        super::open_timeline(config, &path, Box::new(ManualClock::new()))?;

    let Some(selection) = timeline.select(from, to, exact)? else {
        println!("Nothing selected in [{from}, {to}) ms; session unchanged.");
        return Ok(());
    };
    println!(
        "Selected [{}, {}) ms ({:?})",
        selection.from, selection.to, operation
    );

    match operation {
        EditOperation::Delete => {
            let summary = timeline.delete_selection()?;
            println!(
                "  Removed {}, trimmed {}, split {}",
                summary.removed, summary.trimmed, summary.split
            );
        }
        EditOperation::Move { by, scale } => {
            timeline.begin_move()?;
            let preview = timeline.preview_move(by, scale)?;
            if preview.collides {
                println!(
                    "  Warning: [{}, {}) ms overlaps existing content",
                    preview.from, preview.to
                );
            }
            let landing = timeline.commit_move(by, scale)?;
            println!("  Moved to [{}, {}) ms", landing.from, landing.to);
        }
        EditOperation::Scale { scale, at } => {
            let copied = timeline.copy()?;
            timeline.scale_clipboard(scale, 0)?;
            let ids = timeline.paste(at)?;
            println!(
                "  Copied {copied} event(s), pasted {} at {at} ms scaled by {scale}",
                ids.len()
            );
        }
        EditOperation::Duplicate { at } => {
            let copied = timeline.copy()?;
            let ids = timeline.paste(at)?;
            println!("  Copied {copied} event(s), pasted {} at {at} ms", ids.len());
        }
    }

    super::save_timeline(&timeline, &mut session)?;
    println!(
        "Saved: {} event(s), {} ms recorded",
        timeline.log().len(),
        timeline.total_time_recorded()
    );
    Ok(())
}
