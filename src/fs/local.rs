use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use super::{Dir, File, FsError, Listing};
use crate::cancel::CancelToken;
use crate::model::SizeMetric;
use crate::platform::{DeviceId, device_id, metric_bytes};

/// Entries between two cancellation checks while reading a directory.
const CANCEL_CHECK_STRIDE: usize = 1024;

#[derive(Debug, Clone)]
pub struct LocalOptions {
    pub metric: SizeMetric,
    pub follow_symlinks: bool,
    pub one_file_system: bool,
    pub show_hidden: bool,
}

impl Default for LocalOptions {
    fn default() -> Self {
        Self {
            metric: SizeMetric::Apparent,
            follow_symlinks: false,
            one_file_system: false,
            show_hidden: true,
        }
    }
}

#[derive(Debug)]
struct Walk {
    options: LocalOptions,
    root_device: Option<DeviceId>,
    // Canonical targets of followed directory symlinks.
    visited_symlink_dirs: Mutex<HashSet<PathBuf>>,
}

/// A directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalDir {
    path: PathBuf,
    walk: Arc<Walk>,
}

/// A non-directory entry on the local filesystem. Symlinks that are not
/// followed count as files of their own link size.
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
    metric: SizeMetric,
    follow: bool,
}

impl LocalDir {
    pub fn open(path: impl Into<PathBuf>, options: LocalOptions) -> Result<Self, FsError> {
        let path = path.into();
        let metadata = fs::metadata(&path).map_err(|source| FsError::Stat {
            path: path.clone(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(FsError::Unavailable {
                name: path.display().to_string(),
                reason: "not a directory".to_string(),
            });
        }

        let root_device = if options.one_file_system {
            device_id(&metadata)
        } else {
            None
        };

        Ok(Self {
            path,
            walk: Arc::new(Walk {
                options,
                root_device,
                visited_symlink_dirs: Mutex::new(HashSet::new()),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn child(&self, path: PathBuf) -> Self {
        Self {
            path,
            walk: Arc::clone(&self.walk),
        }
    }

    fn file(&self, path: PathBuf, follow: bool) -> LocalFile {
        LocalFile {
            path,
            metric: self.walk.options.metric,
            follow,
        }
    }

    fn crosses_device(&self, metadata: &fs::Metadata) -> bool {
        match (self.walk.root_device, device_id(metadata)) {
            (Some(root), Some(this)) => root != this,
            _ => false,
        }
    }

    /// True the first time a symlinked directory resolving to `target` is
    /// seen. Targets that cannot be resolved are skipped.
    fn claim_symlink_dir(&self, target: &Path) -> bool {
        match fs::canonicalize(target) {
            Ok(canonical) => self.walk.visited_symlink_dirs.lock().insert(canonical),
            Err(error) => {
                trace!(path = %target.display(), %error, "cannot resolve symlinked directory");
                false
            }
        }
    }
}

impl Dir for LocalDir {
    type File = LocalFile;

    fn list(&self, token: &CancelToken) -> Result<Listing<Self>, FsError> {
        let read_dir = fs::read_dir(&self.path).map_err(|source| FsError::ReadDir {
            path: self.path.clone(),
            source,
        })?;

        let options = &self.walk.options;
        let mut listing = Listing::empty();

        for (index, entry_result) in read_dir.enumerate() {
            if index % CANCEL_CHECK_STRIDE == CANCEL_CHECK_STRIDE - 1 && token.is_cancelled() {
                return Err(FsError::Interrupted);
            }

            let entry = entry_result.map_err(|source| FsError::ReadDir {
                path: self.path.clone(),
                source,
            })?;

            if !options.show_hidden && is_hidden(&entry.file_name()) {
                continue;
            }

            let child_path = entry.path();
            let file_type = entry.file_type().map_err(|source| FsError::Stat {
                path: child_path.clone(),
                source,
            })?;

            if file_type.is_symlink() {
                if !options.follow_symlinks {
                    listing.files.push(self.file(child_path, false));
                    continue;
                }

                let target = match fs::metadata(&child_path) {
                    Ok(meta) => meta,
                    Err(error) => {
                        // Dangling link: count the link itself.
                        trace!(path = %child_path.display(), %error, "symlink target unavailable");
                        listing.files.push(self.file(child_path, false));
                        continue;
                    }
                };

                if target.is_dir() {
                    if self.crosses_device(&target) || !self.claim_symlink_dir(&child_path) {
                        continue;
                    }
                    listing.dirs.push(self.child(child_path));
                } else {
                    listing.files.push(self.file(child_path, true));
                }
                continue;
            }

            if file_type.is_dir() {
                if options.one_file_system {
                    let metadata = entry.metadata().map_err(|source| FsError::Stat {
                        path: child_path.clone(),
                        source,
                    })?;
                    if self.crosses_device(&metadata) {
                        trace!(path = %child_path.display(), "skipping mount point");
                        continue;
                    }
                }
                listing.dirs.push(self.child(child_path));
            } else {
                listing.files.push(self.file(child_path, false));
            }
        }

        Ok(listing)
    }
}

impl LocalFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl File for LocalFile {
    fn size(&self, _token: &CancelToken) -> Result<u64, FsError> {
        let metadata = if self.follow {
            fs::metadata(&self.path)
        } else {
            fs::symlink_metadata(&self.path)
        }
        .map_err(|source| FsError::Stat {
            path: self.path.clone(),
            source,
        })?;

        Ok(metric_bytes(&metadata, self.metric))
    }
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}
