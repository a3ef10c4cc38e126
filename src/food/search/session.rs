use serde::Serialize;
use thiserror::Error;

use crate::food::models::{Alternative, ImpactReport};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Phase {
    #[default]
    Idle,
    SuggestingLoading,
    Analyzing,
    Success,
    PartialFailure,
    Failure,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Success | Phase::PartialFailure | Phase::Failure)
    }
}

/// Errors shown to the user. `Display` is the exact message rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
pub enum SessionError {
    #[error("Please enter a food name (e.g., Almond Milk, Beef)")]
    EmptyQuery,
    #[error("Unable to analyze this food item's impact data.")]
    InvalidImpactShape,
    #[error("Failed to fetch impact data. Please check your connection and try again.")]
    NetworkOrServerError,
}

/// Everything the presentation layer needs to draw one analyzer view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuerySession {
    pub current_query: String,
    pub last_submitted_query: Option<String>,
    pub impact: Option<ImpactReport>,
    pub alternatives: Vec<Alternative>,
    pub suggestions: Vec<String>,
    pub phase: Phase,
    pub error: Option<SessionError>,
    /// Which ranking produced `alternatives` (`ai` or `ml`), when reported.
    pub recommendation_source: Option<String>,
}

impl QuerySession {
    pub fn error_message(&self) -> Option<String> {
        self.error.map(|e| e.to_string())
    }
}
