pub mod error;
pub mod config;
pub mod telemetry;
pub mod paths;

pub use error::*;
pub use config::*;
pub use telemetry::*;
pub use paths::*;
