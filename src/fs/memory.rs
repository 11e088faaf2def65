//! In-memory directory trees.
//!
//! Nodes can be made slow or made to fail, which is how the sizer's
//! termination, first-error and cancellation behavior gets exercised
//! without touching a real filesystem.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use super::{Dir, File, FsError, Listing};
use crate::cancel::CancelToken;
use crate::model::Totals;

const SLEEP_SLICE: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Default)]
struct DirNode {
    name: String,
    dirs: Vec<MemDir>,
    files: Vec<MemFile>,
    list_delay: Duration,
    list_error: Option<String>,
    list_calls: Arc<AtomicUsize>,
}

#[derive(Debug, Clone, Default)]
pub struct MemDir {
    node: Arc<DirNode>,
}

#[derive(Debug, Clone, Default)]
pub struct MemFile {
    name: String,
    bytes: u64,
    stat_delay: Duration,
    stat_error: Option<String>,
}

impl MemDir {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            node: Arc::new(DirNode {
                name: name.into(),
                ..DirNode::default()
            }),
        }
    }

    /// A tree `depth` levels below the root where every directory holds
    /// `fanout` subdirectories (except the deepest level) and
    /// `files_per_dir` files of `file_size` bytes.
    pub fn synthetic(fanout: usize, depth: usize, files_per_dir: usize, file_size: u64) -> Self {
        fn build(name: String, fanout: usize, depth: usize, files: usize, size: u64) -> MemDir {
            let mut dir = MemDir::new(name.clone());
            for index in 0..files {
                dir = dir.with_file(MemFile::new(format!("{name}/f{index}"), size));
            }
            if depth > 0 {
                for index in 0..fanout {
                    let child = build(format!("{name}/d{index}"), fanout, depth - 1, files, size);
                    dir = dir.with_dir(child);
                }
            }
            dir
        }

        build(String::from("root"), fanout, depth, files_per_dir, file_size)
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }

    pub fn with_dir(mut self, dir: MemDir) -> Self {
        Arc::make_mut(&mut self.node).dirs.push(dir);
        self
    }

    pub fn with_file(mut self, file: MemFile) -> Self {
        Arc::make_mut(&mut self.node).files.push(file);
        self
    }

    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        Arc::make_mut(&mut self.node).list_delay = delay;
        self
    }

    /// Applies `delay` to every directory of this subtree.
    pub fn with_subtree_list_delay(mut self, delay: Duration) -> Self {
        let node = Arc::make_mut(&mut self.node);
        node.list_delay = delay;
        node.dirs = std::mem::take(&mut node.dirs)
            .into_iter()
            .map(|dir| dir.with_subtree_list_delay(delay))
            .collect();
        self
    }

    pub fn failing_list(mut self, reason: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.node).list_error = Some(reason.into());
        self
    }

    /// Sum over the whole subtree, ignoring injected failures. Sizes
    /// saturate at `u64::MAX` like the sizer's accumulator.
    pub fn expected_totals(&self) -> Totals {
        let mut totals = Totals::default();
        for file in &self.node.files {
            totals.total_size = totals.total_size.saturating_add(file.bytes);
            totals.file_count += 1;
        }
        for dir in &self.node.dirs {
            let child = dir.expected_totals();
            totals.total_size = totals.total_size.saturating_add(child.total_size);
            totals.file_count += child.file_count;
        }
        totals
    }

    /// `list` calls made on this directory.
    pub fn list_calls(&self) -> usize {
        self.node.list_calls.load(Ordering::Relaxed)
    }

    /// `list` calls made anywhere in this subtree.
    pub fn subtree_list_calls(&self) -> usize {
        self.list_calls()
            + self
                .node
                .dirs
                .iter()
                .map(MemDir::subtree_list_calls)
                .sum::<usize>()
    }

    pub fn subtree_dir_count(&self) -> usize {
        1 + self
            .node
            .dirs
            .iter()
            .map(MemDir::subtree_dir_count)
            .sum::<usize>()
    }
}

impl Dir for MemDir {
    type File = MemFile;

    fn list(&self, token: &CancelToken) -> Result<Listing<Self>, FsError> {
        self.node.list_calls.fetch_add(1, Ordering::Relaxed);
        pause(self.node.list_delay, token)?;

        if let Some(reason) = &self.node.list_error {
            return Err(FsError::Unavailable {
                name: self.node.name.clone(),
                reason: reason.clone(),
            });
        }

        Ok(Listing::new(self.node.dirs.clone(), self.node.files.clone()))
    }
}

impl MemFile {
    pub fn new(name: impl Into<String>, bytes: u64) -> Self {
        Self {
            name: name.into(),
            bytes,
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_stat_delay(mut self, delay: Duration) -> Self {
        self.stat_delay = delay;
        self
    }

    pub fn failing_stat(mut self, reason: impl Into<String>) -> Self {
        self.stat_error = Some(reason.into());
        self
    }
}

impl File for MemFile {
    fn size(&self, token: &CancelToken) -> Result<u64, FsError> {
        pause(self.stat_delay, token)?;

        match &self.stat_error {
            Some(reason) => Err(FsError::Unavailable {
                name: self.name.clone(),
                reason: reason.clone(),
            }),
            None => Ok(self.bytes),
        }
    }
}

/// Simulated latency that gives up once the token is cancelled.
fn pause(delay: Duration, token: &CancelToken) -> Result<(), FsError> {
    if delay.is_zero() {
        return Ok(());
    }

    let until = Instant::now() + delay;
    loop {
        if token.is_cancelled() {
            return Err(FsError::Interrupted);
        }
        let now = Instant::now();
        if now >= until {
            return Ok(());
        }
        thread::sleep(SLEEP_SLICE.min(until - now));
    }
}
