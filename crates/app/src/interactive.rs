//! Line-driven session loop over a spawned session task.

use std::error::Error;
use std::io::Write as _;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{MissedTickBehavior, interval};

use exam_core::model::{Report, ReportId};
use services::sessions::{
    FinishOutcome, Navigation, SessionHandle, SessionSnapshot, TICK_INTERVAL, Urgency,
};
use services::{ExamLibraryService, SessionError};

use crate::output;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Next,
    Previous,
    Jump(usize),
    Toggle(Vec<String>),
    Reveal,
    Show,
    Finish,
    Quit,
    Help,
}

/// Lowercase single letters are commands; anything else is read as option labels.
fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim();
    let mut words = line.split_whitespace();
    let first = words.next()?;
    let input = match first {
        "n" => Input::Next,
        "p" => Input::Previous,
        "r" => Input::Reveal,
        "s" => Input::Show,
        "f" => Input::Finish,
        "q" => Input::Quit,
        "?" | "h" | "help" => Input::Help,
        "g" => {
            let number: usize = words.next()?.parse().ok()?;
            Input::Jump(number.checked_sub(1)?)
        }
        _ => Input::Toggle(
            line.split(|c: char| c.is_whitespace() || c == ',')
                .filter(|label| !label.is_empty())
                .map(str::to_owned)
                .collect(),
        ),
    };
    Some(input)
}

enum Step {
    Continue { redraw: bool },
    Finished(Report),
    Quit,
}

async fn apply(handle: &SessionHandle, input: Input) -> Result<Step, SessionError> {
    let redraw = match input {
        Input::Next => handle.navigate(Navigation::Next).await?,
        Input::Previous => handle.navigate(Navigation::Previous).await?,
        Input::Jump(index) => {
            let moved = handle.navigate(Navigation::JumpTo(index)).await?;
            if !moved {
                println!("No such question.");
            }
            moved
        }
        Input::Toggle(labels) => {
            let snapshot = handle.snapshot().await?;
            let Some(question) = snapshot.question else {
                return Ok(Step::Continue { redraw: false });
            };
            let mut changed = false;
            for label in labels {
                match question.option_for_label(&label) {
                    Some(option) => changed |= handle.toggle_option(option).await?,
                    None => println!("Unknown option {label}; type ? for help."),
                }
            }
            changed
        }
        Input::Reveal => {
            handle.toggle_reveal().await?;
            true
        }
        Input::Show => true,
        Input::Help => {
            output::print_session_help();
            false
        }
        Input::Finish => {
            return match handle.finish().await? {
                FinishOutcome::Finished(report) => Ok(Step::Finished(report)),
                FinishOutcome::AlreadyFinished => {
                    handle.report().map(Step::Finished).ok_or(SessionError::Closed)
                }
            };
        }
        Input::Quit => return Ok(Step::Quit),
    };
    Ok(Step::Continue { redraw })
}

async fn show_current(
    handle: &SessionHandle,
    library: &ExamLibraryService,
    exam_name: &str,
) -> Result<SessionSnapshot, Box<dyn Error>> {
    let snapshot = handle.snapshot().await?;
    let images = match &snapshot.question {
        Some(question) => library.resolve_question_images(exam_name, question).await?,
        None => Vec::new(),
    };
    output::print_snapshot(&snapshot, &images);
    prompt();
    Ok(snapshot)
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

/// Drive `handle` from stdin until the session finishes or the user quits.
///
/// Returns the stored report id, or `None` when the session was abandoned.
pub async fn run(
    handle: SessionHandle,
    library: &ExamLibraryService,
    exam_name: &str,
) -> Result<Option<ReportId>, Box<dyn Error>> {
    output::print_session_help();
    let first = show_current(&handle, library, exam_name).await?;
    let mut urgency: Option<Urgency> = first.urgency;
    let timed = first.progress.remaining_secs.is_some();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let finished = loop {
        tokio::select! {
            _ = ticker.tick(), if timed => {
                if let Some(report) = handle.report() {
                    println!();
                    println!("Time is up.");
                    break Some(report);
                }
                match handle.snapshot().await {
                    Ok(snapshot) if snapshot.urgency != urgency => {
                        urgency = snapshot.urgency;
                        if let Some(secs) = snapshot.progress.remaining_secs {
                            println!();
                            output::print_time_left(secs, urgency);
                            prompt();
                        }
                    }
                    Ok(_) | Err(SessionError::Completed) => {}
                    Err(e) => return Err(e.into()),
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    println!("Input closed, finishing the session.");
                    break finish_now(&handle).await?;
                };
                let Some(input) = parse_input(&line) else {
                    prompt();
                    continue;
                };
                match apply(&handle, input).await {
                    Ok(Step::Continue { redraw: true }) => {
                        show_current(&handle, library, exam_name).await?;
                    }
                    Ok(Step::Continue { redraw: false }) => prompt(),
                    Ok(Step::Finished(report)) => break Some(report),
                    Ok(Step::Quit) => break None,
                    Err(SessionError::Completed) => {
                        println!("Time is up.");
                        break handle.report();
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
    };

    match &finished {
        Some(report) => {
            println!();
            output::print_report(report);
        }
        None => println!("Session abandoned; no report stored."),
    }
    Ok(handle.join().await?)
}

async fn finish_now(handle: &SessionHandle) -> Result<Option<Report>, SessionError> {
    match handle.finish().await? {
        FinishOutcome::Finished(report) => Ok(Some(report)),
        FinishOutcome::AlreadyFinished => Ok(handle.report()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_and_labels_are_told_apart() {
        assert_eq!(parse_input(" n "), Some(Input::Next));
        assert_eq!(parse_input("g 3"), Some(Input::Jump(2)));
        assert_eq!(parse_input("g 0"), None);
        assert_eq!(parse_input("g"), None);
        assert_eq!(parse_input(""), None);
        assert_eq!(parse_input("f"), Some(Input::Finish));
        assert_eq!(parse_input("F"), Some(Input::Toggle(vec!["F".into()])));
        assert_eq!(
            parse_input("A, c"),
            Some(Input::Toggle(vec!["A".into(), "c".into()]))
        );
    }
}
