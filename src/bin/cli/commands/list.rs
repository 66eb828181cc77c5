use anyhow::Result;

use pocket_classroom_lib::library::{list_capsules, summarize, time_ago, LibraryFilter, SortOrder};

use crate::app::App;
use crate::render::terminal::{self, Color};
use crate::OutputFormat;

pub fn run(
    app: &App,
    subject: Option<String>,
    level: Option<String>,
    query: Option<String>,
    recent: bool,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let filter = LibraryFilter {
        subject,
        level,
        query,
        sort: if recent { SortOrder::RecentFirst } else { SortOrder::Index },
    };
    let entries = list_capsules(&app.store, &filter);
    let summaries: Vec<_> = entries.iter().filter_map(|e| summarize(&app.store, e)).collect();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        OutputFormat::Plain => {
            if summaries.is_empty() {
                println!("No capsules found.");
                return Ok(());
            }

            let now = app.store.now();
            let title_width = summaries.iter().map(|s| s.title.chars().count()).max().unwrap_or(5).min(40).max(5);
            let subject_width = 12;
            let level_width = 12;

            // Header
            println!("{:<title_w$} {:<subject_w$} {:<level_w$} {:>5} {:>5} {:>5} {:>5}  {}",
                "Title", "Subject", "Level", "Notes", "Cards", "Quiz", "Best", "Updated",
                title_w = title_width, subject_w = subject_width, level_w = level_width);
            println!("{} {} {} {} {} {} {}  {}",
                "\u{2500}".repeat(title_width),
                "\u{2500}".repeat(subject_width),
                "\u{2500}".repeat(level_width),
                "\u{2500}".repeat(5),
                "\u{2500}".repeat(5),
                "\u{2500}".repeat(5),
                "\u{2500}".repeat(5),
                "\u{2500}".repeat(10));

            for summary in &summaries {
                let title = terminal::truncate(&summary.title, title_width);
                let best = format!("{}%", summary.best_score);
                let updated = time_ago(summary.updated_at, now);
                // Pad before coloring so ANSI codes don't skew the columns
                let title = format!("{:<w$}", title, w = title_width);

                println!("{} {:<subject_w$} {:<level_w$} {:>5} {:>5} {:>5} {:>5}  {}",
                    terminal::paint(&title, Color::BOLD, use_color),
                    terminal::truncate(&summary.subject, subject_width),
                    terminal::truncate(&summary.level, level_width),
                    summary.note_count,
                    format!("{}/{}", summary.known_flashcards, summary.flashcard_count),
                    summary.quiz_count,
                    best,
                    terminal::paint(&updated, Color::DIM, use_color),
                    subject_w = subject_width, level_w = level_width);
            }

            println!("\n{} capsules total", summaries.len());
        }
    }

    Ok(())
}
