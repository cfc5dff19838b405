//! Duration control
//!
//! A foreground session timer on top of the day's confirmed seconds.
//!
//! ```text
//! Stopped --start--> Running --pause--> Paused --start--> Running
//!    |                  |                  |
//!    |                  +------stop--------+--> write elapsed --> Stopped
//!    +--manual--> ManualEntry --submit--> write minutes * 60 --> Stopped
//! ```
//!
//! Sessions shorter than the minimum are discarded on stop without a write.
//! The displayed total is the confirmed seconds plus the active session, so a
//! committed session is never counted twice.

use crate::controls::{ControlContext, ControlOutcome, SessionTimer, SubmitGuard};
use crate::models::{parse_target, DailyProgress, Node, ValidationError};
use crate::services::{Notice, ServiceError};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// Format seconds as `MM:SS` (minutes are not wrapped into hours)
pub fn format_elapsed(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationPhase {
    Stopped,
    Running,
    Paused,
    ManualEntry,
}

enum Session {
    Idle,
    Running(SessionTimer),
    Paused(u64),
    ManualEntry,
}

struct DurationState {
    confirmed_secs: f64,
    session: Session,
}

impl DurationState {
    fn elapsed(&self) -> u64 {
        match &self.session {
            Session::Running(timer) => timer.elapsed(),
            Session::Paused(frozen) => *frozen,
            Session::Idle | Session::ManualEntry => 0,
        }
    }

    /// Stop a running timer, keeping its value as a paused session
    fn freeze(&mut self) -> u64 {
        match std::mem::replace(&mut self.session, Session::Idle) {
            Session::Running(timer) => self.session = Session::Paused(timer.stop()),
            other => self.session = other,
        }
        self.elapsed()
    }
}

pub struct DurationControl {
    node: Node,
    ctx: ControlContext,
    state: Mutex<DurationState>,
    guard: SubmitGuard,
}

impl DurationControl {
    pub fn new(node: Node, ctx: ControlContext, confirmed_secs: f64) -> Self {
        Self {
            node,
            ctx,
            state: Mutex::new(DurationState {
                confirmed_secs,
                session: Session::Idle,
            }),
            guard: SubmitGuard::default(),
        }
    }

    fn state(&self) -> MutexGuard<'_, DurationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn phase(&self) -> DurationPhase {
        match self.state().session {
            Session::Idle => DurationPhase::Stopped,
            Session::Running(_) => DurationPhase::Running,
            Session::Paused(_) => DurationPhase::Paused,
            Session::ManualEntry => DurationPhase::ManualEntry,
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.guard.is_submitting()
    }

    /// Seconds of the active session (0 when stopped)
    pub fn elapsed(&self) -> u64 {
        self.state().elapsed()
    }

    /// Server-confirmed seconds for the day
    pub fn confirmed_secs(&self) -> f64 {
        self.state().confirmed_secs
    }

    /// Confirmed seconds plus the active session
    pub fn display_total(&self) -> f64 {
        let state = self.state();
        state.confirmed_secs + state.elapsed() as f64
    }

    pub fn progress(&self) -> DailyProgress {
        DailyProgress::from_total(self.display_total(), self.node.target_units())
    }

    /// Ticking session value for rendering, while running
    pub fn subscribe(&self) -> Option<watch::Receiver<u64>> {
        match &self.state().session {
            Session::Running(timer) => Some(timer.subscribe()),
            _ => None,
        }
    }

    /// Passive refresh of the confirmed seconds; the session is untouched
    pub fn refresh(&self, confirmed_secs: f64) {
        if !self.is_submitting() {
            self.state().confirmed_secs = confirmed_secs;
        }
    }

    /// Start a new session, or resume a paused one
    ///
    /// Refused while a stop or reset is being written.
    pub fn start(&self) -> bool {
        if self.is_submitting() {
            return false;
        }
        let mut state = self.state();
        let initial = match state.session {
            Session::Idle => 0,
            Session::Paused(frozen) => frozen,
            Session::Running(_) | Session::ManualEntry => return false,
        };
        state.session = Session::Running(SessionTimer::start(initial));
        tracing::debug!("Started session for node {} at {}s", self.node.id, initial);
        true
    }

    pub fn pause(&self) -> bool {
        let mut state = self.state();
        if !matches!(state.session, Session::Running(_)) {
            return false;
        }
        state.freeze();
        true
    }

    /// End the session and record it
    ///
    /// Sessions below the minimum are discarded silently. On failure the
    /// session stays paused with its elapsed time, ready for another stop.
    pub async fn stop(&self) -> ControlOutcome {
        let Some(_ticket) = self.guard.try_begin() else {
            return ControlOutcome::Busy;
        };

        let elapsed = {
            let mut state = self.state();
            if !matches!(state.session, Session::Running(_) | Session::Paused(_)) {
                return ControlOutcome::Skipped;
            }
            let elapsed = state.freeze();
            if elapsed < self.ctx.min_session_secs {
                state.session = Session::Idle;
                tracing::debug!(
                    "Discarding {}s session for node {} (minimum {}s)",
                    elapsed,
                    self.node.id,
                    self.ctx.min_session_secs
                );
                return ControlOutcome::Skipped;
            }
            elapsed
        };

        match self
            .ctx
            .ledger
            .record_increment(&self.node.id, elapsed as f64, self.ctx.date)
            .await
        {
            Ok(()) => {
                let total = {
                    let mut state = self.state();
                    state.confirmed_secs += elapsed as f64;
                    if matches!(state.session, Session::Paused(frozen) if frozen == elapsed) {
                        state.session = Session::Idle;
                    }
                    state.confirmed_secs
                };
                self.ctx.publish(
                    &self.node.id,
                    DailyProgress::from_total(total, self.node.target_units()),
                );
                self.ctx.notify(Notice::success(format!(
                    "{}: {} recorded",
                    self.node.name,
                    format_elapsed(elapsed)
                )));
                ControlOutcome::Committed
            }
            Err(e) => {
                self.ctx
                    .report_failure("Could not save session", &self.node.id, &e);
                ControlOutcome::Failed
            }
        }
    }

    /// Clear the day's progress and any active session
    pub async fn reset(&self) -> ControlOutcome {
        let Some(_ticket) = self.guard.try_begin() else {
            return ControlOutcome::Busy;
        };

        match self.ctx.ledger.clear_day(&self.node.id, self.ctx.date).await {
            Ok(_) => {
                {
                    let mut state = self.state();
                    state.confirmed_secs = 0.0;
                    state.session = Session::Idle;
                }
                self.ctx.publish(&self.node.id, DailyProgress::default());
                self.ctx
                    .notify(Notice::info(format!("{} progress reset", self.node.name)));
                ControlOutcome::Committed
            }
            Err(e) => {
                self.ctx
                    .report_failure("Could not reset progress", &self.node.id, &e);
                ControlOutcome::Failed
            }
        }
    }

    /// Switch to manual entry; only allowed while stopped
    pub fn begin_manual_entry(&self) -> bool {
        if self.is_submitting() {
            return false;
        }
        let mut state = self.state();
        if !matches!(state.session, Session::Idle) {
            return false;
        }
        state.session = Session::ManualEntry;
        true
    }

    pub fn cancel_manual_entry(&self) {
        let mut state = self.state();
        if matches!(state.session, Session::ManualEntry) {
            state.session = Session::Idle;
        }
    }

    /// Record a manually entered number of minutes
    pub async fn submit_manual(&self, minutes_input: &str) -> ControlOutcome {
        if self.phase() != DurationPhase::ManualEntry {
            return ControlOutcome::Skipped;
        }

        let seconds = match parse_target(minutes_input).filter(|m| *m > 0.0) {
            Some(minutes) => (minutes * 60.0).round(),
            None => {
                let error = ServiceError::from(ValidationError::InvalidValue(format!(
                    "'{}' is not a positive number of minutes",
                    minutes_input.trim()
                )));
                self.ctx
                    .report_failure("Invalid duration", &self.node.id, &error);
                return ControlOutcome::Failed;
            }
        };

        let Some(_ticket) = self.guard.try_begin() else {
            return ControlOutcome::Busy;
        };

        match self
            .ctx
            .ledger
            .record_increment(&self.node.id, seconds, self.ctx.date)
            .await
        {
            Ok(()) => {
                let total = {
                    let mut state = self.state();
                    state.confirmed_secs += seconds;
                    state.session = Session::Idle;
                    state.confirmed_secs
                };
                self.ctx.publish(
                    &self.node.id,
                    DailyProgress::from_total(total, self.node.target_units()),
                );
                self.ctx.notify(Notice::success(format!(
                    "{}: {} recorded",
                    self.node.name,
                    format_elapsed(seconds as u64)
                )));
                ControlOutcome::Committed
            }
            Err(e) => {
                self.ctx
                    .report_failure("Could not save duration", &self.node.id, &e);
                ControlOutcome::Failed
            }
        }
    }
}
