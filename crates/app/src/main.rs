mod args;
mod interactive;
mod output;

use std::path::Path;

use clap::Parser;

use exam_core::model::{SessionConfig, SessionMode};
use services::{AppServices, Clock, ExamLibraryService};

use args::{ArgsError, Cli, Command, RemoteCommand, SessionOptions};

fn session_config(options: &SessionOptions, bank_len: usize) -> SessionConfig {
    let mut config = SessionConfig::for_bank(bank_len);
    if let Some((start, end)) = options.range {
        config = config
            .with_subset(true, bank_len)
            .with_range(start, end, bank_len);
    }
    if let Some(count) = options.count {
        config = config.with_question_count(count);
    }
    if let Some(minutes) = options.minutes {
        config = config.with_time_limit_minutes(minutes);
    }
    config.with_random_order(options.random)
}

fn file_name_of(path: &Path) -> Result<String, ArgsError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_owned)
        .ok_or_else(|| ArgsError::InvalidPath(path.display().to_string()))
}

async fn run_session(
    app: &AppServices,
    library: &ExamLibraryService,
    mode: SessionMode,
    filename: &str,
    options: &SessionOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let bank = library.load(filename).await?;
    let config = session_config(options, bank.len());
    let session_loop = app.session_loop();
    let session = session_loop.start_from_bank(&bank, mode, config)?;
    println!(
        "Starting {mode} session on {} with {} questions.",
        bank.exam_name(),
        session.questions().len()
    );
    let handle = session_loop.spawn(session);
    if let Some(id) = interactive::run(handle, library, bank.exam_name()).await? {
        println!("Report #{id} saved.");
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = Cli::parse();

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    log::debug!("using database {}", parsed.db_url);
    let app = AppServices::new_sqlite(&parsed.db_url, Clock::system()).await?;
    let library = app.library();

    match parsed.command {
        Command::Import { path, name } => {
            let raw = tokio::fs::read_to_string(&path).await?;
            let name = match name {
                Some(name) => name,
                None => file_name_of(&path)?,
            };
            let listing = library.import_json(&name, &raw).await?;
            println!(
                "Imported {} as {} ({} questions).",
                listing.exam_name, listing.filename, listing.question_count
            );
        }
        Command::Images { exam, files } => {
            for path in files {
                let name = file_name_of(&path)?;
                let bytes = tokio::fs::read(&path).await?;
                library.save_image(&exam, &name, bytes).await?;
                println!("Stored {name} for {exam}.");
            }
        }
        Command::Exams { search } => {
            let exams = match search {
                Some(term) => library.search(&term).await?,
                None => library.list().await?,
            };
            output::print_exams(&exams);
        }
        Command::DeleteExam { filename } => {
            library.delete(&filename).await?;
            println!("Deleted {filename}.");
        }
        Command::Study { filename, options } => {
            run_session(&app, &library, SessionMode::Study, &filename, &options).await?;
        }
        Command::Exam { filename, options } => {
            run_session(&app, &library, SessionMode::Exam, &filename, &options).await?;
        }
        Command::Reports => {
            output::print_report_list(&app.reports().list().await?);
        }
        Command::Report { id, filter, export } => {
            let reports = app.reports();
            output::print_review(&reports.review(id, filter).await?);
            if let Some(dir) = export {
                tokio::fs::create_dir_all(&dir).await?;
                let path = reports.export(id, &dir).await?;
                println!("Exported to {}.", path.display());
            }
        }
        Command::DeleteReport { id } => {
            app.reports().delete(id).await?;
            println!("Deleted report #{id}.");
        }
        Command::Remote { command } => {
            let source = app.remote()?;
            match command {
                RemoteCommand::Check => {
                    let info = source.check().await?;
                    println!(
                        "Connected to {} ({}, {} KB).",
                        info.full_name,
                        if info.private { "private" } else { "public" },
                        info.size
                    );
                }
                RemoteCommand::List => {
                    let exams = source.list_exams().await?;
                    if exams.is_empty() {
                        println!("No exam files found remotely.");
                    }
                    for entry in exams {
                        println!("{:<40} {:>8} bytes", entry.name, entry.size);
                    }
                }
                RemoteCommand::Import { name } => {
                    let listing = source.import(&name, &library).await?;
                    println!(
                        "Imported {} as {} ({} questions).",
                        listing.exam_name, listing.filename, listing.question_count
                    );
                }
                RemoteCommand::Images { exam } => {
                    let images = source.list_images(&exam).await?;
                    if images.is_empty() {
                        println!("No images found for {exam}.");
                    }
                    for entry in images {
                        println!("{}", entry.name);
                    }
                }
            }
        }
    }
    Ok(())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_flag_enables_subset() {
        let options = SessionOptions {
            count: None,
            minutes: Some(30),
            random: true,
            range: Some((11, 20)),
        };
        let config = session_config(&options, 100);
        assert!(config.use_subset);
        assert_eq!(config.start_from_question, 11);
        assert_eq!(config.end_at_question, 20);
        assert_eq!(config.question_count, 10);
        assert_eq!(config.time_limit_minutes, 30);
        assert!(config.random_order);
    }

    #[test]
    fn defaults_cover_whole_bank() {
        let config = session_config(&SessionOptions::default(), 42);
        assert!(!config.use_subset);
        assert_eq!(config.question_count, 42);
        assert_eq!(config.time_limit_minutes, 60);
    }
}
