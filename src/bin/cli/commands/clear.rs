use anyhow::{bail, Context, Result};

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &mut App, yes: bool, format: &OutputFormat) -> Result<()> {
    if !yes {
        let count = app.store.load_index().len();
        bail!("This removes {} capsules and all progress. Re-run with --yes to confirm.", count);
    }

    let removed = app.store.clear_all().context("Failed to clear data")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "removed": removed }))?);
        }
        OutputFormat::Plain => {
            println!("Removed {} stored records", removed);
        }
    }

    Ok(())
}
