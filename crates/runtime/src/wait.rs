//! Wait State (C6, §3): the suspension state a script is in between `Execute` calls.

use std::time::Instant;
use twx_compiler::VarRef;

/// A `WaitingForDelay` deadline: either a concrete wall-clock instant (`pause <ms>`) or the
/// "forever, until any trigger fires" sentinel a bare `pause` uses (§4.6, DESIGN.md Open
/// Question 1).
#[derive(Debug, Clone, Copy)]
pub enum Deadline {
    Forever,
    At(Instant),
}

impl Deadline {
    pub fn is_due(&self, now: Instant) -> bool {
        match self {
            Deadline::Forever => false,
            Deadline::At(t) => now >= *t,
        }
    }
}

#[derive(Debug, Clone)]
pub enum WaitState {
    Running,
    WaitingForInput { prompt: String, default: String, dest: VarRef },
    WaitingForText { pattern: String },
    WaitingForDelay { deadline: Deadline },
    Halted,
}

impl WaitState {
    pub fn is_running(&self) -> bool {
        matches!(self, WaitState::Running)
    }

    pub fn is_halted(&self) -> bool {
        matches!(self, WaitState::Halted)
    }
}
