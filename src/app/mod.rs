mod format;
mod playback;
mod session;
mod tui;

#[cfg(test)]
mod tests;

use std::path::Path;

use anyhow::Result;
use chrono::Utc;

use crate::cli::{Cli, Command};
use crate::db::Database;
use crate::identity::identify_file;
use crate::paths::database_file_path;
use crate::store::{StateStore, SweepOutcome, retention_window};

use self::format::{
    format_last_opened_display, format_position, format_position_with_mode, format_rate,
    short_identity, truncate,
};
use self::session::PlayerSession;

pub fn run(cli: Cli) -> Result<()> {
    let store = open_store()?;
    let sweep = startup_sweep(&store);

    match cli.command {
        Some(Command::Play { file }) => run_play(&store, &file)?,
        Some(Command::List) => run_list(&store)?,
        Some(Command::Forget { file }) => run_forget(&store, &file)?,
        Some(Command::Sweep) => report_sweep(sweep.as_ref()),
        Some(Command::Tui) | None => tui::run_tui(&store)?,
    }

    Ok(())
}

fn open_store() -> Result<StateStore> {
    let db_path = database_file_path()?;
    let db = Database::open(&db_path)?;
    db.migrate()?;
    Ok(StateStore::new(db))
}

/// Runs once per launch. A failed sweep is a warning, never a reason to stop
/// the player from starting.
fn startup_sweep(store: &StateStore) -> Option<SweepOutcome> {
    match store.sweep_expired(Utc::now(), retention_window()) {
        Ok(outcome) => {
            for warning in &outcome.warnings {
                eprintln!("Warning: {warning}");
            }
            Some(outcome)
        }
        Err(err) => {
            eprintln!("Warning: expiry sweep failed: {err}");
            None
        }
    }
}

fn report_sweep(outcome: Option<&SweepOutcome>) {
    match outcome {
        Some(outcome) if outcome.removed == 1 => println!("Removed 1 stale saved position."),
        Some(outcome) => println!("Removed {} stale saved positions.", outcome.removed),
        None => println!("Expiry sweep did not run; see warnings above."),
    }
}

fn run_play(store: &StateStore, file: &Path) -> Result<()> {
    let message = play_and_record(store, file)?;
    println!("\n{message}");
    Ok(())
}

/// The whole play flow: open (restores saved state), hand the terminal to the
/// player, then record where playback stopped. Shared by the CLI and the TUI.
pub(crate) fn play_and_record(store: &StateStore, path: &Path) -> Result<String> {
    let mut session = PlayerSession::new(store);
    let restored = session.open(path)?;
    let title = session.title().unwrap_or_default().to_string();

    match restored.as_ref() {
        Some(record) => println!(
            "Resuming {title} at {} ({}).",
            format_position(record.position_seconds),
            format_rate(record.playback_rate)
        ),
        None => println!("No saved position for {title}; starting from the beginning."),
    }

    let outcome = playback::run_player(path, restored.as_ref())?;
    if !outcome.success {
        return Ok("Playback failed/interrupted. Saved position not updated.".to_string());
    }

    match outcome.resume {
        Some(snapshot) => {
            session.record_progress(snapshot.position_seconds, snapshot.playback_rate)?;
            Ok(format!(
                "Saved position {} ({}) for {title}.",
                format_position(snapshot.position_seconds),
                format_rate(snapshot.playback_rate)
            ))
        }
        None => {
            session.finished()?;
            Ok(format!("{title} finished; saved position cleared."))
        }
    }
}

fn run_list(store: &StateStore) -> Result<()> {
    let entries = store.list()?;
    if entries.is_empty() {
        println!("No saved positions yet. Run `vidmark play <file>` first.");
        return Ok(());
    }

    println!(
        "{:<36} {:<16} {:<8} {:<18} {:<14}",
        "TITLE", "POSITION", "SPEED", "LAST OPENED", "CONTENT ID"
    );
    for entry in entries {
        let record = &entry.record;
        let title = record
            .title
            .clone()
            .unwrap_or_else(|| "(unknown)".to_string());
        println!(
            "{:<36} {:<16} {:<8} {:<18} {:<14}",
            truncate(&title, 36),
            format_position_with_mode(record.position_seconds, record.display_mode),
            format_rate(record.playback_rate),
            format_last_opened_display(record.last_opened_at_ms),
            short_identity(&entry.identity)
        );
    }
    Ok(())
}

fn run_forget(store: &StateStore, file: &Path) -> Result<()> {
    let identity = identify_file(file)?;
    if !store.has(&identity)? {
        println!("No saved position for {}.", file.display());
        return Ok(());
    }
    store.delete(&identity)?;
    println!("Forgot saved position for {}.", file.display());
    Ok(())
}
