pub mod commands;
pub mod food;

// Re-export commonly used items
pub use food::api::{ApiError, FoodApi, FoodApiClient};
pub use food::search::{Phase, QuerySession, SearchOrchestrator, SessionError};
pub use food::ApiConfig;
