//! Stop signal and first-error cell for one size computation.
//!
//! The run leaves `Running` exactly once: either to `Completed`, fired by the
//! retirement that brings the outstanding count to zero, or to `Aborted`,
//! fired by the first reported error. Whichever transition loses the race
//! is ignored.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};

use tracing::debug;

use crate::errors::SizeError;

const RUNNING: u8 = 0;
const COMPLETED: u8 = 1;
const ABORTED: u8 = 2;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum RunState {
    Running,
    Completed,
    Aborted,
}

#[derive(Debug)]
pub(crate) struct Coordinator {
    state: AtomicU8,
    error: OnceLock<SizeError>,
}

impl Coordinator {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(RUNNING),
            error: OnceLock::new(),
        }
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.state.load(Ordering::Acquire) != RUNNING
    }

    pub(crate) fn state(&self) -> RunState {
        match self.state.load(Ordering::Acquire) {
            RUNNING => RunState::Running,
            COMPLETED => RunState::Completed,
            _ => RunState::Aborted,
        }
    }

    /// Marks clean completion. False if the run had already stopped.
    pub(crate) fn complete(&self) -> bool {
        self.transition(COMPLETED)
    }

    /// Stores `error` if it is the first one and stops the run. Later errors,
    /// and errors after completion, are dropped.
    pub(crate) fn report_error(&self, error: SizeError) -> bool {
        if !self.transition(ABORTED) {
            debug!(%error, "dropping error reported after the run stopped");
            return false;
        }
        if let Err(error) = self.error.set(error) {
            debug!(%error, "error cell already filled");
        }
        true
    }

    pub(crate) fn into_error(self) -> Option<SizeError> {
        self.error.into_inner()
    }

    fn transition(&self, to: u8) -> bool {
        self.state
            .compare_exchange(RUNNING, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
