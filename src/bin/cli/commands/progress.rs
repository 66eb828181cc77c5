use anyhow::Result;

use pocket_classroom_lib::library::{list_capsules, summarize, CapsuleSummary, LibraryFilter};

use crate::app::App;
use crate::render::terminal::{self, Color};
use crate::OutputFormat;

pub fn run(app: &App, query: Option<&str>, format: &OutputFormat, use_color: bool) -> Result<()> {
    let summaries: Vec<CapsuleSummary> = match query {
        Some(q) => {
            let entry = app.find_entry(q)?;
            summarize(&app.store, &entry).into_iter().collect()
        }
        None => list_capsules(&app.store, &LibraryFilter::default())
            .iter()
            .filter_map(|e| summarize(&app.store, e))
            .collect(),
    };

    match format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = summaries.iter().map(|s| {
                serde_json::json!({
                    "id": s.id,
                    "title": s.title,
                    "knownFlashcards": s.known_flashcards,
                    "flashcardCount": s.flashcard_count,
                    "bestScore": s.best_score,
                })
            }).collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if summaries.is_empty() {
                println!("No capsules found.");
                return Ok(());
            }

            for s in &summaries {
                println!("{}", terminal::paint(&s.title, Color::BOLD, use_color));
                if s.flashcard_count > 0 {
                    println!(
                        "  Flashcards {} {}/{} known",
                        terminal::progress_bar(s.known_flashcards, s.flashcard_count, 20),
                        s.known_flashcards,
                        s.flashcard_count
                    );
                }
                if s.quiz_count > 0 {
                    println!("  Quiz best  {}", terminal::score(s.best_score, use_color));
                }
                if s.flashcard_count == 0 && s.quiz_count == 0 {
                    println!("  {}", terminal::paint("Nothing to practice yet", Color::DIM, use_color));
                }
            }
        }
    }

    Ok(())
}
