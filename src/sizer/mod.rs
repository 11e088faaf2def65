//! Concurrent subtree sizing.
//!
//! A fixed pool of worker threads shares one stack of pending directories.
//! Expanding a directory may push more work, so an empty stack is not the
//! end of the run: the run ends when the outstanding-work count reaches
//! zero, or when the first error or cancellation stops every worker.

mod accumulator;
mod coordinator;
mod queue;
mod worker;

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::errors::{SizeError, SizeFailure};
use crate::fs::Dir;
use crate::model::Totals;
use worker::SharedState;

pub const DEFAULT_MAX_WORKERS: usize = 3;

/// How long an idle worker parks before re-checking the cancellation token.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, Copy)]
pub struct DirSizer {
    max_workers: usize,
    poll_interval: Duration,
}

impl Default for DirSizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORKERS)
    }
}

impl DirSizer {
    /// A sizer running `max_workers` threads per call (at least one).
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(Duration::from_millis(1));
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Total byte size and file count of the subtree under `root`.
    ///
    /// Blocks until every directory has been expanded, or until the first
    /// listing/stat failure, cancellation of `token`, or its deadline. On
    /// failure the returned [`SizeFailure`] carries the first error and the
    /// partial totals summed before the workers stopped. Filesystem calls
    /// already in flight are not interrupted; the call returns once they do.
    pub fn size<D: Dir>(&self, token: &CancelToken, root: D) -> Result<Totals, SizeFailure> {
        let started = Instant::now();
        let state = SharedState::new(root, token, self.poll_interval);

        debug!(workers = self.max_workers, "starting size computation");
        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(self.max_workers);
            for id in 0..self.max_workers {
                let state = &state;
                let spawned = thread::Builder::new()
                    .name(format!("sizer-{id}"))
                    .spawn_scoped(scope, move || worker::run(id, state));
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(source) => {
                        state.abort(SizeError::Spawn { id, source });
                        break;
                    }
                }
            }
            // Panics were already turned into an abort by the worker guard.
            for handle in handles {
                let _ = handle.join();
            }
        });

        let (totals, error) = state.finish();
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match error {
            None => {
                info!(
                    total_size = totals.total_size,
                    file_count = totals.file_count,
                    elapsed_ms,
                    "size computation complete"
                );
                Ok(totals)
            }
            Some(error) => {
                warn!(
                    %error,
                    partial_size = totals.total_size,
                    partial_files = totals.file_count,
                    elapsed_ms,
                    "size computation aborted"
                );
                Err(SizeFailure {
                    error,
                    partial: totals,
                })
            }
        }
    }

    /// Runs [`DirSizer::size`] on a background thread. The session is tied
    /// to a child of `token`: cancelling either one stops the run.
    pub fn start<D: Dir + 'static>(&self, token: &CancelToken, root: D) -> SizeSession {
        let (tx, rx) = bounded(1);
        let token = token.child();
        let token_for_thread = token.clone();
        let sizer = *self;

        let join = thread::spawn(move || {
            let _ = tx.send(sizer.size(&token_for_thread, root));
        });

        SizeSession {
            receiver: rx,
            token,
            join: Some(join),
        }
    }
}

/// A size computation running in the background.
pub struct SizeSession {
    receiver: Receiver<Result<Totals, SizeFailure>>,
    token: CancelToken,
    join: Option<JoinHandle<()>>,
}

impl SizeSession {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Blocks for the result.
    pub fn wait(mut self) -> Result<Totals, SizeFailure> {
        let result = self.receiver.recv().unwrap_or_else(|_| Err(session_lost()));
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
        result
    }

    /// The result if it arrives within `timeout`. The result is handed out
    /// once; later calls report a lost session.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<Totals, SizeFailure>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(session_lost())),
        }
    }

    pub fn stop(&mut self) {
        self.cancel();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for SizeSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn session_lost() -> SizeFailure {
    SizeFailure {
        error: SizeError::SessionLost,
        partial: Totals::default(),
    }
}
