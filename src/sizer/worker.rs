use std::thread;
use std::time::Duration;

use tracing::{debug, error, trace};

use super::accumulator::Accumulator;
use super::coordinator::{Coordinator, RunState};
use super::queue::{Outstanding, Pop, TaskQueue};
use crate::cancel::CancelToken;
use crate::errors::{FsError, SizeError};
use crate::fs::{Dir, File, Listing};
use crate::model::Totals;

/// Everything the workers of one `DirSizer::size` call share. Built fresh
/// per call and dropped with it.
pub(crate) struct SharedState<'a, D> {
    queue: TaskQueue<D>,
    outstanding: Outstanding,
    totals: Accumulator,
    coordinator: Coordinator,
    token: &'a CancelToken,
    poll_interval: Duration,
}

impl<'a, D: Dir> SharedState<'a, D> {
    pub(crate) fn new(root: D, token: &'a CancelToken, poll_interval: Duration) -> Self {
        Self {
            queue: TaskQueue::new(root),
            outstanding: Outstanding::new(),
            totals: Accumulator::default(),
            coordinator: Coordinator::new(),
            token,
            poll_interval,
        }
    }

    pub(crate) fn abort(&self, error: SizeError) {
        if self.coordinator.report_error(error) {
            self.queue.wake_all();
        }
    }

    fn complete(&self) {
        if self.coordinator.complete() {
            trace!("outstanding work reached zero");
            self.queue.wake_all();
        }
    }

    /// Parking bound: the poll interval, shortened to the token's deadline.
    fn park_timeout(&self) -> Duration {
        match self.token.remaining() {
            Some(remaining) => remaining.min(self.poll_interval),
            None => self.poll_interval,
        }
    }

    /// A capability failure on a cancelled token is reported as the
    /// cancellation, not as a filesystem error.
    fn capability_error(&self, error: FsError, wrap: fn(FsError) -> SizeError) -> SizeError {
        match self.token.reason() {
            Some(reason) => reason.into(),
            None => wrap(error),
        }
    }

    pub(crate) fn finish(self) -> (Totals, Option<SizeError>) {
        let state = self.coordinator.state();
        debug_assert!(
            state != RunState::Completed || self.outstanding.current() == 0,
            "completed with work outstanding"
        );
        debug_assert!(state != RunState::Running, "workers exited while running");
        trace!(left_in_queue = self.queue.len(), ?state, "size state finished");
        (self.totals.into_totals(), self.coordinator.into_error())
    }
}

enum Expansion {
    Done,
    Interrupted,
}

pub(crate) fn run<D: Dir>(id: usize, state: &SharedState<'_, D>) {
    let _guard = PanicGuard { id, state };
    let mut expanded = 0_u64;

    loop {
        if state.coordinator.is_stopped() {
            break;
        }
        if let Some(reason) = state.token.reason() {
            state.abort(reason.into());
            break;
        }

        let dir = match state
            .queue
            .pop(|| state.coordinator.is_stopped(), state.park_timeout())
        {
            Pop::Task(dir) => dir,
            Pop::Idle => continue,
            Pop::Stopped => break,
        };

        match expand(&dir, state) {
            Ok(Expansion::Done) => {
                expanded += 1;
                if state.outstanding.complete_one() {
                    state.complete();
                }
            }
            Ok(Expansion::Interrupted) => break,
            Err(error) => {
                debug!(worker = id, %error, "expansion failed");
                state.abort(error);
                break;
            }
        }
    }

    debug!(worker = id, expanded, "worker exiting");
}

fn expand<D: Dir>(dir: &D, state: &SharedState<'_, D>) -> Result<Expansion, SizeError> {
    let Listing { dirs, files } = dir
        .list(state.token)
        .map_err(|error| state.capability_error(error, SizeError::List))?;

    state.outstanding.add(dirs.len() as u64);
    state.queue.push_all(dirs);

    for file in &files {
        if state.coordinator.is_stopped() {
            return Ok(Expansion::Interrupted);
        }
        if let Some(reason) = state.token.reason() {
            state.abort(reason.into());
            return Ok(Expansion::Interrupted);
        }
        let bytes = file
            .size(state.token)
            .map_err(|error| state.capability_error(error, SizeError::Stat))?;
        state.totals.add_file(bytes);
    }

    Ok(Expansion::Done)
}

/// Aborts the run if the worker unwinds, so its siblings do not wait on a
/// task that will never be retired.
struct PanicGuard<'s, 'a, D: Dir> {
    id: usize,
    state: &'s SharedState<'a, D>,
}

impl<D: Dir> Drop for PanicGuard<'_, '_, D> {
    fn drop(&mut self) {
        if thread::panicking() {
            error!(worker = self.id, "worker panicked, aborting size computation");
            self.state.abort(SizeError::WorkerPanicked { id: self.id });
        }
    }
}
