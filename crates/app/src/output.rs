//! Plain-text rendering for the terminal front end.

use exam_core::model::{OutcomeStatus, QuestionRecord, Report};
use services::ResolvedImage;
use services::sessions::{ReportListItem, ReportReview, SessionSnapshot, Urgency, format_clock};
use storage::repository::ExamListing;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

fn clock_secs(secs: u64) -> String {
    format_clock(u32::try_from(secs).unwrap_or(u32::MAX))
}

/// Labels of `indices` joined with commas, `-` when empty.
pub fn labels_of(question: &QuestionRecord, indices: &[usize]) -> String {
    if indices.is_empty() {
        return "-".into();
    }
    indices
        .iter()
        .map(|i| question.label(*i).unwrap_or("?"))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn print_exams(exams: &[ExamListing]) {
    if exams.is_empty() {
        println!("No exams imported yet.");
        return;
    }
    for exam in exams {
        println!(
            "{:<32} {:<24} {:>5} questions  uploaded {}",
            exam.filename,
            exam.display_name(),
            exam.question_count,
            exam.uploaded_at.format(DATE_FORMAT)
        );
    }
}

pub fn print_report_list(items: &[ReportListItem]) {
    if items.is_empty() {
        println!("No reports yet.");
        return;
    }
    for item in items {
        println!(
            "#{:<5} {} {:<24} {:<5} {:>3}/{:<3} answered {:>3}%  {}",
            item.id,
            item.finished_at.format(DATE_FORMAT),
            item.exam_name,
            item.mode,
            item.correct,
            item.answered,
            item.percentage,
            clock_secs(item.time_spent_secs)
        );
        if item.answered < item.total {
            println!("       {} of {} left unanswered", item.total - item.answered, item.total);
        }
    }
}

pub fn print_report(report: &Report) {
    println!(
        "{} ({}) finished {}",
        report.exam_name(),
        report.mode(),
        report.timestamp().format(DATE_FORMAT)
    );
    println!(
        "Score: {}% ({} correct, {} incorrect, {} unanswered of {})",
        report.percentage(),
        report.correct_answers(),
        report.incorrect_answers(),
        report.unanswered(),
        report.total_questions()
    );
    match report.time_limit_secs() {
        Some(limit) => println!(
            "Time: {} of {}",
            clock_secs(report.time_spent_secs()),
            format_clock(limit)
        ),
        None => println!("Time: {}", clock_secs(report.time_spent_secs())),
    }
}

pub fn print_review(review: &ReportReview) {
    print_report(&review.report);
    let counts = review.counts;
    println!(
        "Showing {}: all {} | correct {} | incorrect {} | unanswered {}",
        review.filter, counts.all, counts.correct, counts.incorrect, counts.unanswered
    );
    for outcome in &review.outcomes {
        let Some(question) = review.report.questions().get(outcome.position) else {
            continue;
        };
        let status = match outcome.status {
            OutcomeStatus::Correct => "correct",
            OutcomeStatus::Incorrect => "incorrect",
            OutcomeStatus::Unanswered => "unanswered",
        };
        println!();
        println!(
            "{}. [{status}] (topic {}, #{}) {}",
            outcome.position + 1,
            question.topic_number,
            question.question_number,
            question.text
        );
        println!(
            "   selected: {}  correct: {}",
            labels_of(question, &outcome.selected),
            labels_of(question, &outcome.correct)
        );
    }
}

fn urgency_note(urgency: Option<Urgency>) -> &'static str {
    match urgency {
        Some(Urgency::Critical) => " (hurry!)",
        Some(Urgency::Warning) => " (running low)",
        Some(Urgency::Normal) | None => "",
    }
}

pub fn print_time_left(remaining_secs: u32, urgency: Option<Urgency>) {
    println!(
        "Time left: {}{}",
        format_clock(remaining_secs),
        urgency_note(urgency)
    );
}

/// Compact jump grid: `#` answered, `.` open, `>` current.
pub fn answer_grid(snapshot: &SessionSnapshot) -> String {
    snapshot
        .progress
        .answered_flags
        .iter()
        .enumerate()
        .map(|(i, answered)| {
            if i + 1 == snapshot.progress.position {
                '>'
            } else if *answered {
                '#'
            } else {
                '.'
            }
        })
        .collect()
}

pub fn print_snapshot(snapshot: &SessionSnapshot, images: &[ResolvedImage]) {
    let progress = &snapshot.progress;
    let Some(question) = &snapshot.question else {
        return;
    };

    println!();
    print!(
        "Question {}/{} | answered {}/{}",
        progress.position, progress.total, progress.answered, progress.total
    );
    match progress.remaining_secs {
        Some(secs) => println!(
            " | {}{}",
            format_clock(secs),
            urgency_note(snapshot.urgency)
        ),
        None => println!(),
    }
    println!("{}", answer_grid(snapshot));
    println!();
    println!("{}", question.text);
    for image in images {
        let state = if image.data_url.is_some() {
            "available"
        } else {
            "missing"
        };
        println!("  [image {}: {state}]", image.name);
    }
    if question.is_multiple_choice() {
        println!("(select all that apply)");
    }
    for (i, option) in question.options.iter().enumerate() {
        let mark = if snapshot.selected.contains(&i) {
            "[x]"
        } else {
            "[ ]"
        };
        let correct = snapshot
            .revealed
            .as_ref()
            .is_some_and(|r| r.contains(&i));
        let label = question.label(i).unwrap_or("?");
        let suffix = if correct { "  <- correct" } else { "" };
        println!("  {mark} {label}. {option}{suffix}");
    }
    if snapshot.revealed.is_some() {
        for answer in question.community_answers() {
            println!("  community: {} ({} votes)", answer.text, answer.votes);
        }
    }
}

pub fn print_session_help() {
    println!("Commands:");
    println!("  A, B, ...    toggle an option by its label (several: \"A C\")");
    println!("  n / p        next / previous question");
    println!("  g <number>   jump to a question");
    println!("  r            show or hide the answer (study mode)");
    println!("  s            show the current question again");
    println!("  f            finish and score");
    println!("  q            quit without a report");
}
