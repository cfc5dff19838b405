//! Quantity control
//!
//! A free-running local counter. Taps only change the local value; nothing is
//! sent until `save`, which writes the count as an absolute value and then a
//! zero-valued increment marking the interaction.
//!
//! ```text
//! Idle(confirmed) --tap--> Editing(local) --save--> Saving --ok--> Idle(local)
//!                                                     |   \
//!                                                     |    +--ok, tapped--> Editing(newer)
//!                                                     +--err--> Editing(local)
//! ```

use crate::controls::{ControlContext, ControlOutcome, Reconciled, SubmitGuard};
use crate::models::{DailyProgress, Node};
use crate::services::Notice;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Normalize manual input to a non-negative whole count
///
/// Unparseable input counts as zero; fractions are truncated.
pub fn normalize_count(input: &str) -> f64 {
    match input.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v.trunc(),
        _ => 0.0,
    }
}

pub struct QuantityControl {
    node: Node,
    ctx: ControlContext,
    value: Mutex<Reconciled<f64>>,
    guard: SubmitGuard,
}

impl QuantityControl {
    pub fn new(node: Node, ctx: ControlContext, confirmed: f64) -> Self {
        Self {
            node,
            ctx,
            value: Mutex::new(Reconciled::Confirmed(confirmed)),
            guard: SubmitGuard::default(),
        }
    }

    fn value(&self) -> MutexGuard<'_, Reconciled<f64>> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn state(&self) -> Reconciled<f64> {
        *self.value()
    }

    /// Count shown on the control
    pub fn display(&self) -> f64 {
        self.value().display()
    }

    pub fn confirmed(&self) -> f64 {
        self.value().confirmed()
    }

    pub fn is_submitting(&self) -> bool {
        self.guard.is_submitting()
    }

    pub fn increment(&self) -> f64 {
        let mut value = self.value();
        let next = value.display() + 1.0;
        value.edit(next);
        next
    }

    pub fn decrement(&self) -> f64 {
        let mut value = self.value();
        let next = (value.display() - 1.0).max(0.0);
        value.edit(next);
        next
    }

    /// Manual numeric entry
    pub fn set_manual(&self, input: &str) -> f64 {
        let next = normalize_count(input);
        self.value().edit(next);
        next
    }

    /// Passive refresh; a pending local edit is kept
    pub fn refresh(&self, confirmed: f64) {
        self.value().refresh(confirmed);
    }

    /// Save is enabled when the local count differs from the confirmed one
    /// and is not zero
    pub fn can_save(&self) -> bool {
        let value = self.value();
        let local = value.display();
        local != value.confirmed() && local != 0.0 && !self.is_submitting()
    }

    /// Progress including the local edit
    pub fn progress(&self) -> DailyProgress {
        DailyProgress::from_total(self.display(), self.node.target_units())
    }

    /// Write the local count as today's value
    ///
    /// Taps made while the write is in flight stay pending on top of the
    /// saved count. When the count is stored but the interaction marker that
    /// follows it fails, the count is still confirmed and a warning is shown.
    pub async fn save(&self) -> ControlOutcome {
        if !self.can_save() {
            return ControlOutcome::Skipped;
        }
        let Some(_ticket) = self.guard.try_begin() else {
            return ControlOutcome::Busy;
        };

        let local = self.display();
        let date = self.ctx.date;
        if let Err(e) = self.ctx.ledger.set_absolute(&self.node.id, local, date).await {
            // The local edit stays pending so the user can retry
            self.ctx
                .report_failure("Could not save progress", &self.node.id, &e);
            return ControlOutcome::Failed;
        }
        self.confirm(local);

        match self.ctx.ledger.record_increment(&self.node.id, 0.0, date).await {
            Ok(()) => {
                self.ctx
                    .notify(Notice::success(format!("{} updated to {}", self.node.name, local)));
            }
            Err(e) => {
                tracing::warn!(
                    "Saved count {} for node {} but the interaction marker failed: {}",
                    local,
                    self.node.id,
                    e
                );
                self.ctx.notify(
                    Notice::warning(format!("{} updated to {}", self.node.name, local))
                        .with_description("The completion could not be recorded."),
                );
            }
        }
        ControlOutcome::Committed
    }

    /// The backend holds `saved` for the day
    fn confirm(&self, saved: f64) {
        self.value().acknowledge_write(saved);
        self.ctx.publish(
            &self.node.id,
            DailyProgress::from_total(saved, self.node.target_units()),
        );
    }

    /// Clear today's progress and the local counter
    pub async fn reset(&self) -> ControlOutcome {
        let Some(_ticket) = self.guard.try_begin() else {
            return ControlOutcome::Busy;
        };

        match self.ctx.ledger.clear_day(&self.node.id, self.ctx.date).await {
            Ok(_) => {
                self.confirm(0.0);
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
}
