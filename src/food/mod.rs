pub mod analysis;
pub mod api;
pub mod config;
pub mod models;
pub mod search;

pub use config::ApiConfig;
pub use models::{Alternative, Breakdown, ImpactLevel, ImpactReport, Recommendations, RecommendationOptions};
