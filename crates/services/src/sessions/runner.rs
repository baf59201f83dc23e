use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at};

use exam_core::model::{QuestionRecord, Report, ReportId};
use storage::repository::ReportRepository;

use super::countdown::Urgency;
use super::progress::SessionProgress;
use super::service::{FinishOutcome, Lifecycle, SessionService, TickOutcome};
use crate::Clock;
use crate::error::SessionError;

/// Period of the session timer.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

const COMMAND_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Next,
    Previous,
    JumpTo(usize),
}

/// Point-in-time view of a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub lifecycle: Lifecycle,
    pub progress: SessionProgress,
    pub question: Option<QuestionRecord>,
    pub selected: Vec<usize>,
    /// Correct option indices, present only while they may be shown.
    pub revealed: Option<Vec<usize>>,
    pub urgency: Option<Urgency>,
}

enum SessionCommand {
    Toggle {
        option: usize,
        reply: oneshot::Sender<bool>,
    },
    Select {
        position: usize,
        options: BTreeSet<usize>,
        reply: oneshot::Sender<bool>,
    },
    Navigate {
        to: Navigation,
        reply: oneshot::Sender<bool>,
    },
    Reveal {
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Finish {
        reply: oneshot::Sender<Result<FinishOutcome, SessionError>>,
    },
}

/// Handle to a session owned by a background task.
///
/// User commands and timer ticks are serialized onto that task, so a manual
/// finish racing the expiry can never score twice.
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    report: watch::Receiver<Option<Report>>,
    task: JoinHandle<Result<Option<ReportId>, SessionError>>,
}

/// Move `session` onto its own task and start its timer.
///
/// When the session finishes the task persists the report and ends. Dropping
/// every handle while the session is active abandons it without a report.
///
/// # Panics
///
/// Must be called from within a Tokio runtime.
#[must_use]
pub fn spawn_session(
    session: SessionService,
    clock: Clock,
    reports: Arc<dyn ReportRepository>,
) -> SessionHandle {
    let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
    let (report_tx, report_rx) = watch::channel(None);
    let task = tokio::spawn(run_session(session, clock, reports, commands_rx, report_tx));
    SessionHandle {
        commands: commands_tx,
        report: report_rx,
        task,
    }
}

async fn run_session(
    mut session: SessionService,
    mut clock: Clock,
    reports: Arc<dyn ReportRepository>,
    mut commands: mpsc::Receiver<SessionCommand>,
    report_tx: watch::Sender<Option<Report>>,
) -> Result<Option<ReportId>, SessionError> {
    let timed = session.capabilities().has_timer;
    let mut ticker = interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let report = loop {
        tokio::select! {
            _ = ticker.tick(), if timed => {
                clock.advance(chrono::Duration::seconds(1));
                match session.tick(clock.now())? {
                    TickOutcome::Expired(report) => break report,
                    TickOutcome::Running { remaining_secs } => {
                        log::debug!("session tick, {remaining_secs}s remaining");
                    }
                    TickOutcome::Idle => {}
                }
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    log::warn!("all session handles dropped; abandoning active session");
                    return Ok(None);
                };
                if let Some(report) = apply(&mut session, &clock, command) {
                    break report;
                }
            }
        }
    };

    report_tx.send_replace(Some(report.clone()));
    drop(ticker);

    match reports.append_report(&report).await {
        Ok(id) => {
            log::info!("report {id} stored for {}", report.exam_name());
            Ok(Some(id))
        }
        Err(e) => {
            log::warn!("failed to store report for {}: {e}", report.exam_name());
            Err(e.into())
        }
    }
}

/// Apply one command. Returns the report when the command finished the session.
fn apply(session: &mut SessionService, clock: &Clock, command: SessionCommand) -> Option<Report> {
    match command {
        SessionCommand::Toggle { option, reply } => {
            let _ = reply.send(session.toggle_option(option));
        }
        SessionCommand::Select {
            position,
            options,
            reply,
        } => {
            let _ = reply.send(session.select_options(position, options));
        }
        SessionCommand::Navigate { to, reply } => {
            let moved = match to {
                Navigation::Next => session.next(),
                Navigation::Previous => session.previous(),
                Navigation::JumpTo(index) => session.jump_to(index),
            };
            let _ = reply.send(moved);
        }
        SessionCommand::Reveal { reply } => {
            let _ = reply.send(session.toggle_reveal());
        }
        SessionCommand::Snapshot { reply } => {
            let _ = reply.send(snapshot(session));
        }
        SessionCommand::Finish { reply } => {
            let outcome = session.finish(clock.now());
            let report = match &outcome {
                Ok(FinishOutcome::Finished(report)) => Some(report.clone()),
                _ => None,
            };
            let _ = reply.send(outcome);
            return report;
        }
    }
    None
}

fn snapshot(session: &SessionService) -> SessionSnapshot {
    let position = session.current_index();
    let question = session.current_question().cloned();
    let revealed = session.is_revealed().then(|| {
        question
            .as_ref()
            .map(|q| q.correct_indices().into_iter().collect())
            .unwrap_or_default()
    });
    SessionSnapshot {
        lifecycle: session.lifecycle(),
        progress: session.progress(),
        selected: session.selected(position),
        question,
        revealed,
        urgency: session.urgency(),
    }
}

impl SessionHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| self.closed_error())?;
        rx.await.map_err(|_| self.closed_error())
    }

    fn closed_error(&self) -> SessionError {
        if self.report.borrow().is_some() {
            SessionError::Completed
        } else {
            SessionError::Closed
        }
    }

    /// Toggle an option of the current question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` once the session task has finished.
    pub async fn toggle_option(&self, option: usize) -> Result<bool, SessionError> {
        self.request(|reply| SessionCommand::Toggle { option, reply })
            .await
    }

    /// Replace the selection at `position`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` once the session task has finished.
    pub async fn select_options(
        &self,
        position: usize,
        options: BTreeSet<usize>,
    ) -> Result<bool, SessionError> {
        self.request(|reply| SessionCommand::Select {
            position,
            options,
            reply,
        })
        .await
    }

    /// Move the cursor.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` once the session task has finished.
    pub async fn navigate(&self, to: Navigation) -> Result<bool, SessionError> {
        self.request(|reply| SessionCommand::Navigate { to, reply })
            .await
    }

    /// Toggle the answer reveal.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` once the session task has finished.
    pub async fn toggle_reveal(&self) -> Result<bool, SessionError> {
        self.request(|reply| SessionCommand::Reveal { reply }).await
    }

    /// Current state of the session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` once the session task has finished.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| SessionCommand::Snapshot { reply })
            .await
    }

    /// Finish the session. A session already finished (by a previous call or
    /// by the timer) yields `FinishOutcome::AlreadyFinished`.
    ///
    /// # Errors
    ///
    /// Returns scoring failures, or `SessionError::Closed` if the task ended
    /// without a report.
    pub async fn finish(&self) -> Result<FinishOutcome, SessionError> {
        match self.request(|reply| SessionCommand::Finish { reply }).await {
            Err(SessionError::Completed) => Ok(FinishOutcome::AlreadyFinished),
            other => other?,
        }
    }

    /// The report, once the session has finished.
    #[must_use]
    pub fn report(&self) -> Option<Report> {
        self.report.borrow().clone()
    }

    /// Wait until the session finishes and return its report.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Closed` if the task ended without finishing.
    pub async fn wait_for_report(&mut self) -> Result<Report, SessionError> {
        let guard = self
            .report
            .wait_for(Option::is_some)
            .await
            .map_err(|_| SessionError::Closed)?;
        (*guard).clone().ok_or(SessionError::Closed)
    }

    /// Release the handle and wait for the task to end, returning the stored
    /// report id. A session still active at this point is abandoned and
    /// yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns the persistence failure, or `SessionError::Persist` if the task
    /// panicked.
    pub async fn join(self) -> Result<Option<ReportId>, SessionError> {
        drop(self.commands);
        self.task.await?
    }
}
