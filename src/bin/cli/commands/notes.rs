use anyhow::{Context, Result};

use pocket_classroom_lib::learn::LearnSession;

use crate::app::App;
use crate::render::terminal::{self, Color};
use crate::OutputFormat;

pub fn run(app: &App, query: &str, needle: &str, format: &OutputFormat, use_color: bool) -> Result<()> {
    let entry = app.find_entry(query)?;
    let session = LearnSession::open(&app.store, &entry.id)
        .with_context(|| format!("Capsule '{}' could not be loaded", entry.title))?;
    let notes = session.filter_notes(needle);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&notes)?);
        }
        OutputFormat::Plain => {
            if notes.is_empty() {
                println!("No notes found.");
                return Ok(());
            }
            for note in &notes {
                println!("  - {}", highlight(note, needle, use_color));
            }
            println!("\n{} of {} notes", notes.len(), session.capsule().notes.len());
        }
    }

    Ok(())
}

/// Emphasize the first case-insensitive occurrence of `needle`
fn highlight(note: &str, needle: &str, use_color: bool) -> String {
    if !use_color || needle.is_empty() {
        return note.to_string();
    }
    let lower = note.to_lowercase();
    let needle = needle.to_lowercase();
    let Some(start) = lower.find(&needle) else {
        return note.to_string();
    };
    let end = start + needle.len();
    // Lowercasing can shift byte offsets; fall back to the plain note then
    match (note.get(..start), note.get(start..end), note.get(end..)) {
        (Some(before), Some(hit), Some(after)) if lower.len() == note.len() => format!(
            "{}{}{}",
            before,
            terminal::paint(hit, Color::YELLOW, true),
            after
        ),
        _ => note.to_string(),
    }
}
