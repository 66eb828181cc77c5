use anyhow::{Context, Result};

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &mut App, query: &str, format: &OutputFormat) -> Result<()> {
    let entry = app.find_entry(query)?;
    let removed = app.store.delete_capsule(&entry.id)
        .with_context(|| format!("Failed to delete capsule '{}'", entry.title))?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "id": entry.id,
                "title": entry.title,
                "deleted": removed,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Deleted capsule \"{}\"", entry.title);
        }
    }

    Ok(())
}
