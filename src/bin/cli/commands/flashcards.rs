use anyhow::{bail, Context, Result};

use pocket_classroom_lib::learn::LearnSession;

use crate::app::App;
use crate::render::terminal::{self, Color};
use crate::OutputFormat;

pub fn run(app: &App, query: &str, reveal: bool, format: &OutputFormat, use_color: bool) -> Result<()> {
    let entry = app.find_entry(query)?;
    let mut session = LearnSession::open(&app.store, &entry.id)
        .with_context(|| format!("Capsule '{}' could not be loaded", entry.title))?;

    let Some(status) = session.flash_status() else {
        if let OutputFormat::Json = format {
            println!("[]");
        } else {
            println!("No flashcards in \"{}\".", entry.title);
        }
        return Ok(());
    };

    match format {
        OutputFormat::Json => {
            let cards: Vec<serde_json::Value> = session.capsule().flashcards.iter().enumerate().map(|(i, card)| {
                serde_json::json!({
                    "card": i + 1,
                    "front": card.front,
                    "back": card.back,
                    "known": session.progress().is_known(i),
                })
            }).collect();
            println!("{}", serde_json::to_string_pretty(&cards)?);
        }
        OutputFormat::Plain => {
            println!("{}", terminal::paint(&session.capsule().title, Color::BOLD, use_color));
            println!();

            for _ in 0..status.total {
                let Some(card) = session.current_card() else { break };
                let position = session.card_index() + 1;
                let known = session.progress().is_known(session.card_index());
                let mark = if known {
                    terminal::paint("\u{2713}", Color::GREEN, use_color)
                } else {
                    " ".to_string()
                };

                println!("{} {:>3}. {}", mark, position, card.front);
                if reveal {
                    session.flip();
                    if let Some(card) = session.current_card() {
                        println!("       {}", terminal::paint(&card.back, Color::DIM, use_color));
                    }
                }
                session.next_card();
            }

            println!(
                "\n{} {}/{} known",
                terminal::progress_bar(status.known, status.total, 20),
                status.known,
                status.total
            );
        }
    }

    Ok(())
}

/// Set a card's known flag; `card` counts from 1
pub fn mark(app: &mut App, query: &str, card: usize, known: bool, format: &OutputFormat) -> Result<()> {
    let entry = app.find_entry(query)?;
    let mut session = LearnSession::open(&app.store, &entry.id)
        .with_context(|| format!("Capsule '{}' could not be loaded", entry.title))?;

    let total = session.capsule().flashcards.len();
    if card == 0 || !session.go_to_card(card - 1) {
        bail!("Card {} does not exist; \"{}\" has {} flashcards", card, entry.title, total);
    }

    let saved = if known {
        session.mark_known(&mut app.store)
    } else {
        session.mark_unknown(&mut app.store)
    };
    saved.context("Failed to save progress")?;

    let status = session.flash_status().context("Capsule has no flashcards")?;
    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "id": entry.id,
                "card": status.position,
                "known": status.current_known,
                "knownCount": status.known,
                "total": status.total,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!(
                "Card {} marked {} ({}/{} known)",
                status.position,
                if status.current_known { "known" } else { "unknown" },
                status.known,
                status.total
            );
        }
    }

    Ok(())
}
