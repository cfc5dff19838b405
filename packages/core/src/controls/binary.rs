//! Binary control
//!
//! Write-then-display: the done flag flips only after the backend confirmed
//! the write. Marking done records one impulse of value 1; undoing clears all
//! of the day's impulses. Clicks while a write is in flight are ignored.

use crate::controls::{ControlContext, ControlOutcome, SubmitGuard};
use crate::models::{DailyProgress, Node};
use crate::services::Notice;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct BinaryControl {
    node: Node,
    ctx: ControlContext,
    done: AtomicBool,
    guard: SubmitGuard,
}

impl BinaryControl {
    pub fn new(node: Node, ctx: ControlContext, done: bool) -> Self {
        Self {
            node,
            ctx,
            done: AtomicBool::new(done),
            guard: SubmitGuard::default(),
        }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    pub fn is_submitting(&self) -> bool {
        self.guard.is_submitting()
    }

    /// Passive refresh from a backend read
    pub fn refresh(&self, done: bool) {
        if !self.is_submitting() {
            self.done.store(done, Ordering::Release);
        }
    }

    /// Flip between done and not done
    pub async fn toggle(&self) -> ControlOutcome {
        let Some(_ticket) = self.guard.try_begin() else {
            tracing::debug!("Ignoring toggle of node {} while submitting", self.node.id);
            return ControlOutcome::Busy;
        };

        let date = self.ctx.date;
        if self.is_done() {
            match self.ctx.ledger.clear_day(&self.node.id, date).await {
                Ok(_) => {
                    self.done.store(false, Ordering::Release);
                    self.ctx.publish(&self.node.id, DailyProgress::default());
                    self.ctx
                        .notify(Notice::info(format!("{} marked as not done", self.node.name)));
                    ControlOutcome::Committed
                }
                Err(e) => {
                    self.ctx
                        .report_failure("Could not remove completion", &self.node.id, &e);
                    ControlOutcome::Failed
                }
            }
        } else {
            match self.ctx.ledger.record_increment(&self.node.id, 1.0, date).await {
                Ok(()) => {
                    self.done.store(true, Ordering::Release);
                    self.ctx.publish(
                        &self.node.id,
                        DailyProgress {
                            completed: true,
                            value: 1.0,
                            overdrive: 0.0,
                        },
                    );
                    self.ctx
                        .notify(Notice::success(format!("{} completed", self.node.name)));
                    ControlOutcome::Committed
                }
                Err(e) => {
                    self.ctx
                        .report_failure("Could not record impulse", &self.node.id, &e);
                    ControlOutcome::Failed
                }
            }
        }
    }
}
