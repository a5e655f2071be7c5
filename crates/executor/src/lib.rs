pub mod facade;
pub mod actions;
pub mod component_cache;
pub mod dry_run;
pub mod host;

pub use facade::*;
pub use actions::*;
pub use component_cache::*;
pub use dry_run::*;
pub use host::*;
