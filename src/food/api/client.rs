use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use validator::Validate;

use super::{ApiError, FoodApi};
use crate::food::config::ApiConfig;
use crate::food::models::{RecommendationOptions, Recommendations};

/// HTTP client for the food impact backend. Every call goes to the network;
/// nothing is cached here.
#[derive(Debug, Clone)]
pub struct FoodApiClient {
    client: Client,
    config: ApiConfig,
}

impl FoodApiClient {
    pub fn new(config: ApiConfig) -> Self {
        let client = Client::builder()
            .user_agent(concat!("food-impact-agent/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self { client, config }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.config.base_url(), path)
    }

    async fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> Result<Response, ApiError> {
        debug!(%url, ?query, timeout_ms = timeout.as_millis() as u64, "GET");

        let response = self
            .client
            .get(url)
            .query(query)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::from_status(status.as_u16()));
        }
        Ok(response)
    }

    async fn request_recommendations(
        &self,
        food_name: &str,
        options: &RecommendationOptions,
        timeout: Duration,
    ) -> Result<Recommendations, ApiError> {
        let url = self.endpoint(&format!("recommendations/{}", urlencoding::encode(food_name)));
        let response = self.get(&url, &options.query_pairs(), timeout).await?;
        Ok(response.json::<Recommendations>().await?)
    }
}

#[async_trait]
impl FoodApi for FoodApiClient {
    async fn fetch_impact(&self, food_name: &str) -> Result<Value, ApiError> {
        let url = self.endpoint(&format!("impact/{}", urlencoding::encode(food_name)));
        let response = self.get(&url, &[], self.config.impact_timeout).await?;
        Ok(response.json::<Value>().await?)
    }

    async fn fetch_recommendations(
        &self,
        food_name: &str,
        options: &RecommendationOptions,
    ) -> Result<Recommendations, ApiError> {
        options
            .validate()
            .map_err(|e| ApiError::InvalidOptions(e.to_string()))?;

        match self
            .request_recommendations(food_name, options, self.config.recommendations_timeout)
            .await
        {
            Err(e) if options.use_ai && e.is_retryable() => {
                warn!(food = food_name, error = %e, "AI recommendations failed, retrying without AI");
                self.request_recommendations(
                    food_name,
                    &options.without_ai(),
                    self.config.fallback_timeout,
                )
                .await
            }
            result => result,
        }
    }

    async fn fetch_suggestions(&self, fragment: &str) -> Vec<String> {
        let query = [("q", fragment.trim().to_string())];
        let result = match self
            .get(&self.endpoint("search"), &query, self.config.suggestions_timeout)
            .await
        {
            Ok(response) => response.json::<Vec<String>>().await.map_err(ApiError::from),
            Err(e) => Err(e),
        };

        result.unwrap_or_else(|e| {
            debug!(fragment, error = %e, "Suggestion lookup failed");
            Vec::new()
        })
    }
}
