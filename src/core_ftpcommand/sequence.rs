//! Sequencing guard for the data-connection command family.
//!
//! `PASV`/`PORT` arm the session, the next data command must be `STOR` or
//! `RETR`, and the session only returns to `Idle` once the transfer outcome
//! has been reported.
//!
//! ```text
//!   Idle ── DELE ────────────────────────────> Idle
//!     \                                         ^
//!      v                                       /
//!     (Port | Passive) ──> (Store | Retrieve) ─
//! ```

use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    Idle,
    Port,
    Passive,
    Store,
    Retrieve,
    Delete,
}

/// True when `requested` may not follow `current`.
pub fn rejects(current: CommandState, requested: CommandState) -> bool {
    use CommandState::*;

    match current {
        Idle => matches!(requested, Store | Retrieve),
        Store | Retrieve | Delete => {
            matches!(requested, Store | Retrieve | Delete | Passive | Port)
        }
        Port | Passive => matches!(requested, Port | Passive | Delete),
    }
}

/// Shared between the receive half (check and arm) and the respond half
/// (reset after a transfer outcome). The lock is held for one read or write.
#[derive(Debug)]
pub struct SequenceGuard {
    state: Mutex<CommandState>,
}

impl Default for SequenceGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceGuard {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CommandState::Idle),
        }
    }

    pub fn check(&self, requested: CommandState) -> bool {
        rejects(self.get(), requested)
    }

    pub fn set(&self, state: CommandState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub fn get(&self) -> CommandState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns to `Idle` only from `Port`/`Passive`; used when an unclaimed
    /// data connection expires. Returns whether the state changed.
    pub fn disarm(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, CommandState::Port | CommandState::Passive) {
            *state = CommandState::Idle;
            true
        } else {
            false
        }
    }
}
