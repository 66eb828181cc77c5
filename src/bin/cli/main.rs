mod app;
mod commands;
mod render;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use pocket_classroom_lib::config::AppConfig;

#[derive(Parser)]
#[command(name = "pocket-classroom", about = "Study capsules: notes, flashcards and quizzes", version)]
struct Cli {
    /// Directory holding capsule data (default: from config, then platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (default: <config dir>/pocket-classroom/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// List capsules in the library
    List {
        /// Only capsules with this subject (case-insensitive)
        #[arg(long)]
        subject: Option<String>,
        /// Only capsules at this level (case-insensitive)
        #[arg(long)]
        level: Option<String>,
        /// Only titles containing this text
        #[arg(long, short)]
        query: Option<String>,
        /// Most recently updated first
        #[arg(long)]
        recent: bool,
    },

    /// Show a capsule's details
    Show {
        /// Capsule id or title (case-insensitive prefix match)
        capsule: String,
    },

    /// Search a capsule's notes
    Notes {
        /// Capsule id or title
        capsule: String,
        /// Text to look for (empty shows every note)
        #[arg(default_value = "")]
        query: String,
    },

    /// Create a new capsule
    New {
        title: String,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        level: Option<String>,
        /// Short description
        #[arg(long)]
        desc: Option<String>,
        /// Notes, one per line (use "-" to read from stdin)
        #[arg(long)]
        notes: Option<String>,
    },

    /// Add a flashcard to a capsule
    AddCard {
        capsule: String,
        front: String,
        back: String,
    },

    /// Add a multiple-choice question to a capsule
    AddQuestion {
        capsule: String,
        question: String,
        /// Answer options (up to four)
        #[arg(long = "option", short = 'o')]
        options: Vec<String>,
        /// Zero-based index of the correct option
        #[arg(long, default_value = "0")]
        answer: String,
    },

    /// Delete a capsule and its progress
    Delete {
        capsule: String,
    },

    /// Export a capsule as JSON
    Export {
        capsule: String,
        /// Output file or directory (default: stdout)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Import a capsule from an exported JSON file
    Import {
        file: PathBuf,
    },

    /// Review a capsule's flashcards
    Flashcards {
        capsule: String,
        /// Show the back of every card
        #[arg(long)]
        reveal: bool,
    },

    /// Mark a flashcard as known or unknown
    Mark {
        capsule: String,
        /// Card number, starting at 1
        card: usize,
        /// Mark as unknown instead of known
        #[arg(long)]
        unknown: bool,
    },

    /// Take a capsule's quiz
    Quiz {
        capsule: String,
        /// Comma-separated option numbers (starting at 1); prompts on stdin when omitted
        #[arg(long)]
        answers: Option<String>,
    },

    /// Show learning progress
    Progress {
        /// Capsule id or title (default: every capsule)
        capsule: Option<String>,
    },

    /// Remove every capsule and all progress
    Clear {
        /// Skip the safety check
        #[arg(long)]
        yes: bool,
    },
}

/// Read text from stdin when the argument is "-"
fn resolve_text(text: Option<String>) -> anyhow::Result<Option<String>> {
    match text.as_deref() {
        Some("-") => {
            let mut buf = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf)
                .context("Failed to read stdin")?;
            Ok(Some(buf))
        }
        _ => Ok(text),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => AppConfig::default_path()?,
    };
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;
    let use_color = !cli.no_color && config.color && atty_check();

    let mut app = app::App::new(cli.data_dir, config)?;

    match cli.command {
        Command::List { subject, level, query, recent } => {
            commands::list::run(&app, subject, level, query, recent, &cli.format, use_color)?;
        }
        Command::Show { capsule } => {
            commands::show::run(&app, &capsule, &cli.format, use_color)?;
        }
        Command::Notes { capsule, query } => {
            commands::notes::run(&app, &capsule, &query, &cli.format, use_color)?;
        }
        Command::New { title, subject, level, desc, notes } => {
            let notes = resolve_text(notes)?;
            commands::new::run(&mut app, &title, subject, level, desc, notes, &cli.format)?;
        }
        Command::AddCard { capsule, front, back } => {
            commands::edit::add_card(&mut app, &capsule, &front, &back, &cli.format)?;
        }
        Command::AddQuestion { capsule, question, options, answer } => {
            commands::edit::add_question(&mut app, &capsule, &question, options, &answer, &cli.format)?;
        }
        Command::Delete { capsule } => {
            commands::delete::run(&mut app, &capsule, &cli.format)?;
        }
        Command::Export { capsule, output } => {
            commands::transfer::export(&app, &capsule, output.as_deref())?;
        }
        Command::Import { file } => {
            commands::transfer::import(&mut app, &file, &cli.format)?;
        }
        Command::Flashcards { capsule, reveal } => {
            commands::flashcards::run(&app, &capsule, reveal, &cli.format, use_color)?;
        }
        Command::Mark { capsule, card, unknown } => {
            commands::flashcards::mark(&mut app, &capsule, card, !unknown, &cli.format)?;
        }
        Command::Quiz { capsule, answers } => {
            commands::quiz::run(&mut app, &capsule, answers.as_deref(), &cli.format, use_color)?;
        }
        Command::Progress { capsule } => {
            commands::progress::run(&app, capsule.as_deref(), &cli.format, use_color)?;
        }
        Command::Clear { yes } => {
            commands::clear::run(&mut app, yes, &cli.format)?;
        }
    }

    Ok(())
}

/// Check if stdout is a terminal (for color support)
fn atty_check() -> bool {
    unsafe { libc_isatty(1) != 0 }
}

/// Check if stdin is a terminal (not piped)
fn stdin_is_tty() -> bool {
    unsafe { libc_isatty(0) != 0 }
}

extern "C" {
    #[link_name = "isatty"]
    fn libc_isatty(fd: i32) -> i32;
}
