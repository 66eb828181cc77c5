use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::app::App;
use crate::OutputFormat;

/// Write a capsule's export to stdout, a file, or a directory
pub fn export(app: &App, query: &str, output: Option<&Path>) -> Result<()> {
    let entry = app.find_entry(query)?;
    let exported = app.store.export_capsule(&entry.id)
        .with_context(|| format!("Failed to export capsule '{}'", entry.title))?;

    let Some(output) = output else {
        println!("{}", exported.contents);
        return Ok(());
    };

    let path = if output.is_dir() {
        output.join(&exported.file_name)
    } else {
        output.to_path_buf()
    };
    fs::write(&path, &exported.contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    eprintln!("Exported \"{}\" to {}", entry.title, path.display());

    Ok(())
}

pub fn import(app: &mut App, file: &Path, format: &OutputFormat) -> Result<()> {
    let id = app.store.import_file(file)
        .with_context(|| format!("Failed to import {}", file.display()))?;
    let entry = app.find_entry(&id)?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "id": entry.id,
                "title": entry.title,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Imported capsule \"{}\"", entry.title);
            println!("  ID: {}", entry.id);
        }
    }

    Ok(())
}
