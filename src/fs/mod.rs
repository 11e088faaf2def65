//! Capabilities the sizer consumes. The sizer only ever lists directories
//! and asks files for their size; how that happens is up to the
//! implementation.

pub mod local;
pub mod memory;

use crate::cancel::CancelToken;
pub use crate::errors::FsError;

pub use local::{LocalDir, LocalFile, LocalOptions};
pub use memory::{MemDir, MemFile};

pub trait File: Send + Sync {
    fn size(&self, token: &CancelToken) -> Result<u64, FsError>;
}

pub trait Dir: Send + Sync + Sized {
    type File: File;

    fn list(&self, token: &CancelToken) -> Result<Listing<Self>, FsError>;
}

/// Direct children of one directory.
pub struct Listing<D: Dir> {
    pub dirs: Vec<D>,
    pub files: Vec<D::File>,
}

impl<D: Dir> Listing<D> {
    pub fn new(dirs: Vec<D>, files: Vec<D::File>) -> Self {
        Self { dirs, files }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

impl<D: Dir> Default for Listing<D> {
    fn default() -> Self {
        Self::empty()
    }
}
