// src/monitor.rs
//
// Focus-violation monitor for an active quiz session. The quiz client
// feeds it visibility-hidden and window-blur signals; both count the
// same. Below the limit each violation produces a warning, the final
// one locks the session and force-submits whatever answers were
// recorded. There is no server-side corroboration of these signals;
// they are client-trusted by contract.

use crate::engine::Engine;
use crate::error::AppError;
use crate::models::attempt::Attempt;

/// Violations tolerated before force-submission.
pub const VIOLATION_LIMIT: u32 = 3;

/// A focus-loss event observed while a quiz screen is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusSignal {
    /// The page became hidden (tab switch, minimize).
    VisibilityHidden,
    /// The window lost input focus.
    WindowBlur,
}

/// Outcome of recording one violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Below the limit: warn ("Warning N of 3") and continue.
    Warn { count: u32, limit: u32 },
    /// Limit reached: the session locks and the attempt must be
    /// submitted now. Produced exactly once.
    ForceSubmit,
    /// The session is already locked; the event is dropped.
    Ignored,
}

/// Pure violation counter. Dropping it is the detach: no state leaks
/// into a later session.
#[derive(Debug)]
pub struct FocusMonitor {
    violations: u32,
    locked: bool,
    limit: u32,
}

impl Default for FocusMonitor {
    fn default() -> Self {
        FocusMonitor::new()
    }
}

impl FocusMonitor {
    pub fn new() -> Self {
        FocusMonitor::with_limit(VIOLATION_LIMIT)
    }

    pub fn with_limit(limit: u32) -> Self {
        FocusMonitor {
            violations: 0,
            locked: false,
            limit,
        }
    }

    pub fn violations(&self) -> u32 {
        self.violations
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn record(&mut self, _signal: FocusSignal) -> Verdict {
        if self.locked {
            return Verdict::Ignored;
        }

        self.violations += 1;
        if self.violations < self.limit {
            Verdict::Warn {
                count: self.violations,
                limit: self.limit,
            }
        } else {
            self.locked = true;
            Verdict::ForceSubmit
        }
    }
}

/// Couples a [`FocusMonitor`] to the lifecycle engine for one user's
/// session and performs the single forced finish when the limit is
/// hit.
pub struct FocusGuard {
    monitor: FocusMonitor,
    engine: Engine,
    user_id: String,
}

impl FocusGuard {
    pub fn new(engine: Engine, user_id: impl Into<String>) -> Self {
        FocusGuard {
            monitor: FocusMonitor::new(),
            engine,
            user_id: user_id.into(),
        }
    }

    pub fn monitor(&self) -> &FocusMonitor {
        &self.monitor
    }

    /// Feeds one signal through the monitor. Returns the finished
    /// attempt when this signal triggered the forced submission,
    /// `None` otherwise.
    pub async fn handle(&mut self, signal: FocusSignal) -> Result<Option<Attempt>, AppError> {
        match self.monitor.record(signal) {
            Verdict::Warn { count, limit } => {
                tracing::warn!(
                    user_id = %self.user_id,
                    "focus violation, warning {} of {}",
                    count,
                    limit
                );
                Ok(None)
            }
            Verdict::ForceSubmit => {
                tracing::warn!(
                    user_id = %self.user_id,
                    "violation limit reached, force-submitting attempt"
                );
                let attempt = self.engine.finish(&self.user_id).await?;
                Ok(Some(attempt))
            }
            Verdict::Ignored => Ok(None),
        }
    }
}
