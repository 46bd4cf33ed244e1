//! Validate an Inkcast session directory.

use std::path::PathBuf;

use inkcast_session_model::LoadedSession;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating session at: {}", path.display());

    let session =
        LoadedSession::load(&path).map_err(|e| anyhow::anyhow!("Failed to load session: {e}"))?;

    println!("  Name: {}", session.meta.name);
    println!("  Version: {}", session.meta.version);
    println!("  Events: {}", session.events.len());
    println!("  Points: {}", session.points.len());

    let errors = session.validate();
    if errors.is_empty() {
        println!("\nSession is valid.");
    } else {
        println!("\nValidation issues:");
        for error in &errors {
            println!("  - {error}");
        }
        println!(
            "\n{} issue(s) found. Session cannot be opened for editing.",
            errors.len()
        );
    }

    Ok(())
}
