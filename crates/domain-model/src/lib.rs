pub mod action;
pub mod cleanup_plan;
pub mod risk;
pub mod rules;
pub mod components;
pub mod scan_result;
pub mod summary;
pub mod profile;

pub use action::*;
pub use cleanup_plan::*;
pub use risk::*;
pub use rules::*;
pub use components::*;
pub use scan_result::*;
pub use summary::*;
pub use profile::*;
