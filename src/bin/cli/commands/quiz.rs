use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};

use pocket_classroom_lib::learn::LearnSession;

use crate::app::App;
use crate::render::terminal::{self, Color};
use crate::OutputFormat;

/// Take the quiz, either from `--answers` or by prompting on stdin
pub fn run(
    app: &mut App,
    query: &str,
    answers: Option<&str>,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let entry = app.find_entry(query)?;
    let mut session = LearnSession::open(&app.store, &entry.id)
        .with_context(|| format!("Capsule '{}' could not be loaded", entry.title))?;
    let Some(mut run) = session.start_quiz() else {
        bail!("\"{}\" has no quiz questions", entry.title);
    };

    let mut preset = match answers {
        Some(text) => Some(parse_answer_list(text, run.total())?.into_iter()),
        None => None,
    };
    let plain = matches!(format, OutputFormat::Plain);
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut feedback_log = Vec::new();

    while let Some(question) = run.current().cloned() {
        if plain {
            println!(
                "\n{} {}",
                terminal::paint(&format!("Q{}/{}", run.position() + 1, run.total()), Color::CYAN, use_color),
                terminal::paint(&question.question, Color::BOLD, use_color)
            );
            for (i, option) in question.options.iter().enumerate() {
                println!("  {}. {}", i + 1, option);
            }
        }

        let choice = match preset.as_mut() {
            Some(iter) => iter.next().context("Not enough answers")?,
            None => prompt_choice(&mut lines, question.options.len().max(1), plain)?,
        };

        let Some(feedback) = run.answer(choice) else { break };
        if plain {
            if feedback.correct {
                println!("{}", terminal::paint("Correct!", Color::GREEN, use_color));
            } else {
                let msg = format!("Wrong. Answer: {}", feedback.correct_label);
                println!("{}", terminal::paint(&msg, Color::RED, use_color));
            }
        }
        feedback_log.push(serde_json::json!({
            "question": question.question,
            "choice": choice,
            "correct": feedback.correct,
            "correctIndex": feedback.correct_index,
        }));
    }

    let result = session
        .record_quiz(&run, &mut app.store)
        .context("Failed to save quiz score")?
        .context("Quiz ended before every question was answered")?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "id": entry.id,
                "answers": feedback_log,
                "correct": result.correct,
                "total": result.total,
                "score": result.score,
                "bestScore": result.best_score,
                "newBest": result.new_best,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!(
                "\nScore: {}/{} ({})",
                result.correct,
                result.total,
                terminal::score(result.score, use_color)
            );
            if result.new_best {
                println!("{}", terminal::paint("New best score!", Color::YELLOW, use_color));
            } else {
                println!("Best: {}", terminal::score(result.best_score, use_color));
            }
        }
    }

    Ok(())
}

/// Parse "1,3,2" into zero-based choices, one per question
fn parse_answer_list(text: &str, expected: usize) -> Result<Vec<usize>> {
    let choices = text
        .split(',')
        .map(|part| parse_choice(part).with_context(|| format!("Invalid answer '{}'", part.trim())))
        .collect::<Result<Vec<_>>>()?;
    if choices.len() != expected {
        bail!("Expected {} answers, got {}", expected, choices.len());
    }
    Ok(choices)
}

/// One-based option number to zero-based index
fn parse_choice(text: &str) -> Option<usize> {
    text.trim().parse::<usize>().ok().filter(|n| *n >= 1).map(|n| n - 1)
}

fn prompt_choice<B: BufRead>(lines: &mut io::Lines<B>, options: usize, show_prompt: bool) -> Result<usize> {
    loop {
        if show_prompt && crate::stdin_is_tty() {
            print!("Your answer (1-{}): ", options);
            io::stdout().flush()?;
        }
        let Some(line) = lines.next() else {
            bail!("Quiz aborted: no more input");
        };
        match parse_choice(&line?) {
            Some(choice) if choice < options => return Ok(choice),
            _ => eprintln!("Enter a number from 1 to {}", options),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_choice() {
        assert_eq!(parse_choice("1"), Some(0));
        assert_eq!(parse_choice(" 4 "), Some(3));
        assert_eq!(parse_choice("0"), None);
        assert_eq!(parse_choice("b"), None);
    }

    #[test]
    fn test_parse_answer_list() {
        assert_eq!(parse_answer_list("1, 3,2", 3).unwrap(), vec![0, 2, 1]);
        assert!(parse_answer_list("1,2", 3).is_err());
        assert!(parse_answer_list("1,x,2", 3).is_err());
    }
}
