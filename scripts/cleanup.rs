//! Removes uploads orphaned by a process that did not shut down cleanly,
//! and ages out no-speech copies kept in DEBUG_DIR.
//!
//! Run with: cargo run --bin cleanup

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use bridge::config::logging;
use bridge::services::artifacts::sweep_stale;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    logging::init(false);

    let min_age = Duration::from_secs(
        env::var("CLEANUP_MIN_AGE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600),
    );

    let mut dirs = vec![PathBuf::from(
        env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
    )];
    if let Some(debug_dir) = env::var("DEBUG_DIR").ok().filter(|d| !d.trim().is_empty()) {
        dirs.push(PathBuf::from(debug_dir));
    }

    for dir in &dirs {
        println!(
            "Sweeping {} (files older than {}s)...",
            dir.display(),
            min_age.as_secs()
        );
        let report = sweep_stale(dir, min_age).await?;
        println!(
            "✓ Removed {} file(s), kept {} recent file(s)",
            report.removed, report.kept
        );
    }

    Ok(())
}
