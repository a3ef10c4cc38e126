pub mod orchestrator;
pub mod session;

pub use orchestrator::SearchOrchestrator;
pub use session::{Phase, QuerySession, SessionError};
