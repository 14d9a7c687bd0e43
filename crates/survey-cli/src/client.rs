//! HTTP client for the survey server.

use anyhow::Result;
use survey_core::{
    AreaDetectionRequest, AreaDetectionResponse, HealthResponse, LatLon, PathPlanRequest,
    PathPlanResponse,
};

/// Client for the survey server's REST API.
pub struct SurveyClient {
    base_url: String,
    client: reqwest::Client,
}

impl SurveyClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("Health check failed: {}", response.status());
        }
        Ok(response.json().await?)
    }

    /// Detect the area enclosing `points`.
    ///
    /// Rejections and failures still carry a response body; only transport
    /// errors and unreadable bodies are returned as `Err`.
    pub async fn detect_area(&self, points: Vec<LatLon>) -> Result<AreaDetectionResponse> {
        let url = format!("{}/v1/area/detect", self.base_url);
        let response: AreaDetectionResponse = self
            .client
            .post(&url)
            .json(&AreaDetectionRequest { points })
            .send()
            .await?
            .json()
            .await?;
        Ok(response)
    }

    pub async fn plan_path(&self, request: &PathPlanRequest) -> Result<PathPlanResponse> {
        let url = format!("{}/v1/path/plan", self.base_url);
        let response: PathPlanResponse = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await?
            .json()
            .await?;
        Ok(response)
    }
}
