mod builder;
mod countdown;
mod navigator;
mod progress;
mod runner;
mod service;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use builder::SessionBuilder;
pub use countdown::{
    CRITICAL_SECS, Countdown, CountdownState, Tick, Urgency, WARNING_SECS, format_clock,
    urgency_for,
};
pub use navigator::Navigator;
pub use progress::SessionProgress;
pub use runner::{Navigation, SessionHandle, SessionSnapshot, TICK_INTERVAL, spawn_session};
pub use service::{FinishOutcome, FinishReason, Lifecycle, SessionService, TickOutcome};
pub use view::{ReportListItem, ReportReview, ReportService};
pub use workflow::{PendingPersist, SessionLoopService};
