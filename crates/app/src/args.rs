use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use exam_core::model::{OutcomeFilter, ReportId};

const DEFAULT_DB_URL: &str = "sqlite://exams.sqlite3";

const ENVIRONMENT_HELP: &str = "\
Environment:
  EXAM_DB_URL, RUST_LOG
  EXAM_GITHUB_TOKEN, EXAM_GITHUB_OWNER, EXAM_GITHUB_REPO, EXAM_GITHUB_BRANCH,
  EXAM_GITHUB_API_URL, EXAM_GITHUB_EXAMS_DIR, EXAM_GITHUB_IMAGES_DIR";

#[derive(Debug, Error)]
pub enum ArgsError {
    #[error("invalid range: {raw} (expected <start>-<end>)")]
    InvalidRange { raw: String },

    #[error("invalid --db value: {raw}")]
    InvalidDbUrl { raw: String },

    #[error("not a file name: {0}")]
    InvalidPath(String),
}

/// Practice imported exam question banks from the terminal.
#[derive(Debug, Parser)]
#[command(name = "app", version, after_help = ENVIRONMENT_HELP)]
pub struct Cli {
    /// SQLite database URL or file path
    #[arg(
        long = "db",
        global = true,
        env = "EXAM_DB_URL",
        default_value = DEFAULT_DB_URL,
        value_parser = parse_db_url
    )]
    pub db_url: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Session flags; unset values fall back to the bank defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct SessionOptions {
    /// Number of questions
    #[arg(long)]
    pub count: Option<u32>,

    /// Exam time limit in minutes (default 60)
    #[arg(long)]
    pub minutes: Option<u32>,

    /// Shuffle the working set
    #[arg(long)]
    pub random: bool,

    /// Restrict to questions <start>-<end> (1-based, inclusive)
    #[arg(long, value_name = "START-END", value_parser = parse_range)]
    pub range: Option<(u32, u32)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum RemoteCommand {
    /// Check access to the remote repository
    Check,
    /// List the exam files available remotely
    List,
    /// Download an exam file into the local library
    Import { name: String },
    /// List the remote images of an exam
    Images { exam: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Import a question bank JSON file
    Import {
        path: PathBuf,
        /// File name to store the bank under
        #[arg(long)]
        name: Option<String>,
    },
    /// Store image files for an exam
    Images {
        exam: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List imported exams
    Exams {
        /// Only exams whose name contains this term
        #[arg(long)]
        search: Option<String>,
    },
    /// Delete an exam and its images
    DeleteExam { filename: String },
    /// Start a study session
    Study {
        filename: String,
        #[command(flatten)]
        options: SessionOptions,
    },
    /// Start a timed exam session
    Exam {
        filename: String,
        #[command(flatten)]
        options: SessionOptions,
    },
    /// List stored reports
    Reports,
    /// Review one report
    Report {
        id: ReportId,
        /// all, correct, incorrect or unanswered
        #[arg(long, default_value = "all")]
        filter: OutcomeFilter,
        /// Directory to write the report JSON into
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Delete a stored report
    DeleteReport { id: ReportId },
    /// Work with the remote question bank repository
    Remote {
        #[command(subcommand)]
        command: RemoteCommand,
    },
}

fn parse_range(raw: &str) -> Result<(u32, u32), ArgsError> {
    raw.split_once('-')
        .and_then(|(s, e)| Some((s.trim().parse().ok()?, e.trim().parse().ok()?)))
        .ok_or_else(|| ArgsError::InvalidRange { raw: raw.to_owned() })
}

fn parse_db_url(raw: &str) -> Result<String, ArgsError> {
    if raw.trim().is_empty() {
        return Err(ArgsError::InvalidDbUrl { raw: raw.to_owned() });
    }
    Ok(normalize_sqlite_url(raw.to_owned()))
}

pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}
