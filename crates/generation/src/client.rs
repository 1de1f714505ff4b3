//! HTTP client for the LLM-backed generation service.
//!
//! The service exposes two JSON endpoints:
//! - `POST {base}/recommendations` with a [`QuestionnaireInput`], answering a
//!   [`GeneratedRecommendation`];
//! - `POST {base}/weeks` with a [`WeekRequest`], answering
//!   `{ "workouts": [GeneratedWorkout] }`.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::types::{validate_week, GeneratedRecommendation, GeneratedWorkout, QuestionnaireInput, WeekRequest};
use crate::{GenerationConfig, RecommendationGenerator, WeekGenerator};

/// Client for a single generation service deployment.
#[derive(Clone)]
pub struct GenerationClient {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct WeekResponse {
    workouts: Vec<GeneratedWorkout>,
}

impl GenerationClient {
    pub fn new(client: reqwest::Client, api_url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Build from configuration; fails when `GENERATION_API_URL` is unset.
    pub fn from_config(
        config: &GenerationConfig,
        client: reqwest::Client,
    ) -> Result<Self, GenerationError> {
        let api_url = config
            .generation_api_url
            .clone()
            .ok_or(GenerationError::NotConfigured("GENERATION_API_URL"))?;
        Ok(Self::new(client, api_url, config.generation_api_key.clone()))
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, GenerationError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self
            .client
            .post(format!("{}{path}", self.api_url))
            .json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = ensure_success(request.send().await?).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| GenerationError::Unusable(format!("malformed response from {path}: {e}")))
    }
}

#[async_trait]
impl RecommendationGenerator for GenerationClient {
    async fn generate_recommendation(
        &self,
        input: &QuestionnaireInput,
    ) -> Result<GeneratedRecommendation, GenerationError> {
        tracing::debug!(questionnaire_id = input.questionnaire_id, "Requesting recommendation");
        let plan: GeneratedRecommendation = self.post_json("/recommendations", input).await?;
        plan.validate()?;
        Ok(plan)
    }
}

#[async_trait]
impl WeekGenerator for GenerationClient {
    async fn generate_week(
        &self,
        request: &WeekRequest,
    ) -> Result<Vec<GeneratedWorkout>, GenerationError> {
        tracing::debug!(
            recommendation_id = request.recommendation_id,
            week = request.target_week,
            "Requesting week workouts",
        );
        let week: WeekResponse = self.post_json("/weeks", request).await?;
        validate_week(&week.workouts)?;
        Ok(week.workouts)
    }
}

/// Pass 2xx responses through; turn anything else into
/// [`GenerationError::Api`] with the body kept verbatim.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, GenerationError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(GenerationError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}
