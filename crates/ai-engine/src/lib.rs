pub mod knowledge;
pub mod prompt;
pub mod planner;
pub mod validator;
pub mod llm;

pub use knowledge::*;
pub use prompt::*;
pub use planner::*;
pub use validator::*;
pub use llm::HttpReasoningClient;
