//! Per-Type Progress Controls
//!
//! Interactive state machines layered over server-confirmed progress, one per
//! node type:
//!
//! - `BinaryControl` - write-then-display toggle (done / not done)
//! - `QuantityControl` - local counter, saved explicitly as an absolute value
//! - `DurationControl` - foreground session timer with manual entry
//!
//! # Reconciliation
//!
//! Local edits are tracked as `Reconciled::Pending { local, based_on }` on top
//! of `Reconciled::Confirmed`. A pending edit collapses back to confirmed only
//! when a write is acknowledged; a passive refresh from the backend updates
//! the base value but never clobbers the edit.
//!
//! # Failures
//!
//! A failed write produces an error notice and clears the submitting flag.
//! Local edits are kept so the user can retry; nothing is retried
//! automatically.

mod binary;
mod duration;
mod quantity;
mod timer;

pub use binary::BinaryControl;
pub use duration::{format_elapsed, DurationControl, DurationPhase};
pub use quantity::{normalize_count, QuantityControl};
pub use timer::SessionTimer;

use crate::models::{DailyProgress, DayKey};
use crate::services::{ImpulseLedger, Notice, Notifier, ServiceError};
use crate::state::{Action, AppStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Value with an optional local edit on top of the confirmed one
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reconciled<T> {
    Confirmed(T),
    Pending { local: T, based_on: T },
}

impl<T: Copy + PartialEq> Reconciled<T> {
    /// Last server-confirmed value
    pub fn confirmed(&self) -> T {
        match self {
            Self::Confirmed(v) => *v,
            Self::Pending { based_on, .. } => *based_on,
        }
    }

    /// Value to show: the local edit when present
    pub fn display(&self) -> T {
        match self {
            Self::Confirmed(v) => *v,
            Self::Pending { local, .. } => *local,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// Record a local edit; editing back to the confirmed value drops the edit
    pub fn edit(&mut self, local: T) {
        let based_on = self.confirmed();
        *self = if local == based_on {
            Self::Confirmed(based_on)
        } else {
            Self::Pending { local, based_on }
        };
    }

    /// A write of `value` succeeded
    pub fn acknowledge(&mut self, value: T) {
        *self = Self::Confirmed(value);
    }

    /// A write of `written` succeeded while the control stayed editable
    ///
    /// Edits made during the write stay pending on top of the new base.
    pub fn acknowledge_write(&mut self, written: T) {
        let shown = self.display();
        *self = if shown == written {
            Self::Confirmed(written)
        } else {
            Self::Pending {
                local: shown,
                based_on: written,
            }
        };
    }

    /// Passive backend refresh: moves the base, keeps any local edit
    pub fn refresh(&mut self, server: T) {
        *self = match *self {
            Self::Confirmed(_) => Self::Confirmed(server),
            Self::Pending { local, .. } => Self::Pending {
                local,
                based_on: server,
            },
        };
    }

    /// Drop the local edit
    pub fn discard(&mut self) {
        *self = Self::Confirmed(self.confirmed());
    }
}

/// Result of a control action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    /// The write was acknowledged
    Committed,
    /// Nothing to write (disabled save, short session, wrong phase)
    Skipped,
    /// Another write of this control is in flight
    Busy,
    /// The write failed; a notice was shown
    Failed,
}

/// Serializes writes of one control
#[derive(Debug, Default, Clone)]
pub struct SubmitGuard {
    submitting: Arc<AtomicBool>,
}

/// Held while a write is in flight; releases the guard on drop
#[derive(Debug)]
pub struct SubmitTicket {
    submitting: Arc<AtomicBool>,
}

impl SubmitGuard {
    pub fn try_begin(&self) -> Option<SubmitTicket> {
        self.submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmitTicket {
                submitting: self.submitting.clone(),
            })
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }
}

impl Drop for SubmitTicket {
    fn drop(&mut self) {
        self.submitting.store(false, Ordering::Release);
    }
}

/// Collaborators shared by every control on a page
#[derive(Clone)]
pub struct ControlContext {
    pub ledger: ImpulseLedger,
    pub notifier: Arc<dyn Notifier>,
    pub store: AppStore,
    pub date: DayKey,
    pub min_session_secs: u64,
}

impl ControlContext {
    /// Publish confirmed progress of a node to the shared store
    pub(crate) fn publish(&self, node_id: &str, progress: DailyProgress) {
        self.store.dispatch(Action::SetDayValue {
            node_id: node_id.to_string(),
            progress,
        });
    }

    pub(crate) fn notify(&self, notice: Notice) {
        self.notifier.notify(notice);
    }

    pub(crate) fn report_failure(&self, title: &str, node_id: &str, error: &ServiceError) {
        tracing::warn!("{} for node {}: {}", title, node_id, error);
        self.notifier.notify(Notice::failure(title, error));
    }
}
