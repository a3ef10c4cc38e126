pub mod client;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::food::models::{RecommendationOptions, Recommendations};

pub use client::FoodApiClient;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    #[error("Food item not found")]
    NotFound,
    #[error("Request timed out")]
    Timeout,
    #[error("Server error: status {status}")]
    Server { status: u16 },
    #[error("Request failed with status: {status}")]
    Status { status: u16 },
    #[error("Failed to send request: {0}")]
    Transport(String),
    #[error("Failed to parse response: {0}")]
    Decode(String),
    #[error("Invalid recommendation options: {0}")]
    InvalidOptions(String),
}

impl ApiError {
    /// Timeouts and 5xx responses are worth one more attempt in degraded mode.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Timeout | ApiError::Server { .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            ApiError::from_status(status.as_u16())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

impl ApiError {
    pub(crate) fn from_status(status: u16) -> Self {
        match status {
            404 => ApiError::NotFound,
            500..=599 => ApiError::Server { status },
            _ => ApiError::Status { status },
        }
    }
}

/// The three remote operations the search flow depends on.
#[async_trait]
pub trait FoodApi: Send + Sync {
    /// Raw impact payload in whichever wire shape the backend produced.
    async fn fetch_impact(&self, food_name: &str) -> Result<Value, ApiError>;

    async fn fetch_recommendations(
        &self,
        food_name: &str,
        options: &RecommendationOptions,
    ) -> Result<Recommendations, ApiError>;

    /// Autocomplete candidates. Failures come back as an empty list.
    async fn fetch_suggestions(&self, fragment: &str) -> Vec<String>;
}

#[async_trait]
impl<T: FoodApi + ?Sized> FoodApi for Arc<T> {
    async fn fetch_impact(&self, food_name: &str) -> Result<Value, ApiError> {
        (**self).fetch_impact(food_name).await
    }

    async fn fetch_recommendations(
        &self,
        food_name: &str,
        options: &RecommendationOptions,
    ) -> Result<Recommendations, ApiError> {
        (**self).fetch_recommendations(food_name, options).await
    }

    async fn fetch_suggestions(&self, fragment: &str) -> Vec<String> {
        (**self).fetch_suggestions(fragment).await
    }
}
