use anyhow::Result;

use pocket_classroom_lib::capsules::models::timestamp;
use pocket_classroom_lib::library::time_ago;

use crate::app::App;
use crate::render::terminal::{self, Color};
use crate::OutputFormat;

pub fn run(app: &App, query: &str, format: &OutputFormat, use_color: bool) -> Result<()> {
    let capsule = app.find_capsule(query)?;
    let progress = app.store.load_progress(&capsule.id);

    if let OutputFormat::Json = format {
        let output = serde_json::json!({
            "capsule": capsule,
            "progress": progress,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", terminal::paint(&capsule.title, Color::BOLD, use_color));
    let meta = format!(
        "{} \u{00b7} {} \u{00b7} updated {}",
        if capsule.subject.is_empty() { "no subject" } else { capsule.subject.as_str() },
        capsule.level,
        time_ago(capsule.updated_at, app.store.now()),
    );
    println!("{}", terminal::paint(&meta, Color::DIM, use_color));
    if !capsule.desc.is_empty() {
        println!();
        for line in terminal::wrap_lines(&capsule.desc, "", 80) {
            println!("{}", line);
        }
    }

    if !capsule.notes.is_empty() {
        println!("\n{}", terminal::paint("Notes", Color::CYAN, use_color));
        for note in &capsule.notes {
            for (i, line) in terminal::wrap_lines(note, "    ", 80).into_iter().enumerate() {
                if i == 0 {
                    println!("  - {}", line.trim_start());
                } else {
                    println!("{}", line);
                }
            }
        }
    }

    println!("\n{}", terminal::paint("Contents", Color::CYAN, use_color));
    println!("  Flashcards: {} ({} known)", capsule.flashcards.len(), progress.known_count());
    println!("  Quiz questions: {}", capsule.quiz.len());
    println!("  Best score: {}", terminal::score(progress.best_score, use_color));
    if !capsule.resources.is_empty() {
        println!("  Resources: {}", capsule.resources.len());
    }

    println!();
    println!("  ID: {}", capsule.id);
    println!("  Created: {}", timestamp::format(&capsule.created_at));

    Ok(())
}
