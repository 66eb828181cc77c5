use anyhow::{bail, Result};

use pocket_classroom_lib::author::{apply_form, new_capsule, validate_title, CapsuleForm};

use crate::app::App;
use crate::OutputFormat;

pub fn run(
    app: &mut App,
    title: &str,
    subject: Option<String>,
    level: Option<String>,
    desc: Option<String>,
    notes: Option<String>,
    format: &OutputFormat,
) -> Result<()> {
    let form = CapsuleForm {
        title: title.to_string(),
        subject: subject
            .or_else(|| app.config.default_subject.clone())
            .unwrap_or_default(),
        level: level.unwrap_or_else(|| app.config.default_level.clone()),
        desc: desc.unwrap_or_default(),
        notes: notes.unwrap_or_default(),
    };

    let mut capsule = new_capsule();
    apply_form(&mut capsule, &form);
    if !validate_title(&capsule) {
        bail!("A capsule needs a title");
    }
    app.save_capsule(&mut capsule)?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "id": capsule.id,
                "title": capsule.title,
                "subject": capsule.subject,
                "level": capsule.level,
                "noteCount": capsule.notes.len(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Created capsule \"{}\"", capsule.title);
            if !capsule.subject.is_empty() {
                println!("  Subject: {}", capsule.subject);
            }
            println!("  Level: {}", capsule.level);
            if !capsule.notes.is_empty() {
                println!("  Notes: {}", capsule.notes.len());
            }
            println!("  ID: {}", capsule.id);
        }
    }

    Ok(())
}
