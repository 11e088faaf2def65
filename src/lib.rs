pub mod cancel;
pub mod cli;
pub mod errors;
pub mod fs;
pub mod model;
pub mod platform;
pub mod sizer;

pub use cancel::{CancelReason, CancelToken};
pub use errors::{FsError, SizeError, SizeFailure};
pub use fs::{Dir, File, Listing};
pub use model::{SizeMetric, Totals};
pub use sizer::{DirSizer, SizeSession};
