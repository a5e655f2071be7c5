pub mod fs;
pub mod filters;
pub mod scanner;
pub mod reclaim;
pub mod cleaner;

pub use cleaner::CleanupEngine;
pub use fs::{DryRunFileSystem, EntryInfo, FileSystem, LocalFileSystem};
pub use filters::*;
pub use scanner::{measure_tree, scan_category};
pub use ai_optimizer_domain::{CategoryFindings, JunkReport};
