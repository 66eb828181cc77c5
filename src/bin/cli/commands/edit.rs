use anyhow::{bail, Result};

use pocket_classroom_lib::author::{new_flashcard, new_quiz_question, parse_answer_index, QUIZ_OPTION_COUNT};

use crate::app::App;
use crate::OutputFormat;

pub fn add_card(app: &mut App, query: &str, front: &str, back: &str, format: &OutputFormat) -> Result<()> {
    let mut capsule = app.find_capsule(query)?;

    let mut card = new_flashcard();
    card.front = front.trim().to_string();
    card.back = back.trim().to_string();
    if card.front.is_empty() {
        bail!("A flashcard needs a front side");
    }
    capsule.flashcards.push(card);
    app.save_capsule(&mut capsule)?;

    let number = capsule.flashcards.len();
    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "id": capsule.id,
                "card": number,
                "flashcardCount": capsule.flashcards.len(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Added card {} to \"{}\"", number, capsule.title);
        }
    }

    Ok(())
}

pub fn add_question(
    app: &mut App,
    query: &str,
    text: &str,
    options: Vec<String>,
    answer: &str,
    format: &OutputFormat,
) -> Result<()> {
    if options.len() > QUIZ_OPTION_COUNT {
        bail!("A question takes at most {} options", QUIZ_OPTION_COUNT);
    }
    let mut capsule = app.find_capsule(query)?;

    let mut question = new_quiz_question();
    question.question = text.trim().to_string();
    for (slot, option) in question.options.iter_mut().zip(options) {
        *slot = option.trim().to_string();
    }
    question.answer_index = parse_answer_index(answer);
    if question.answer_index >= QUIZ_OPTION_COUNT {
        bail!("Answer index must be between 0 and {}", QUIZ_OPTION_COUNT - 1);
    }
    capsule.quiz.push(question);
    app.save_capsule(&mut capsule)?;

    let number = capsule.quiz.len();
    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "id": capsule.id,
                "question": number,
                "quizCount": capsule.quiz.len(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Added question {} to \"{}\"", number, capsule.title);
        }
    }

    Ok(())
}
