//! Client side of the job HTTP API.

use async_trait::async_trait;
use fitcoach_core::jobs::{JobKind, JobOwner};
use fitcoach_core::status::JobStatus;
use fitcoach_core::types::{DbId, WeekNumber};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::PollError;

/// The fields of a job status response the poller acts on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobSnapshot {
    pub id: DbId,
    pub kind: JobKind,
    pub owner_id: DbId,
    pub target_week: Option<WeekNumber>,
    pub status: JobStatus,
    pub current_step: Option<String>,
    pub result_reference: Option<DbId>,
    pub error_message: Option<String>,
}

/// Job operations the poller needs from the server.
#[async_trait]
pub trait JobApi: Send + Sync {
    /// Ask the server to queue a job for `owner`.
    ///
    /// Fails with [`PollError::Conflict`] when the owner already has an
    /// active job.
    async fn start(&self, owner: &JobOwner) -> Result<JobSnapshot, PollError>;

    async fn job_status(&self, job_id: DbId) -> Result<JobSnapshot, PollError>;

    /// The newest job for `owner` in any status.
    async fn latest_job(&self, owner: &JobOwner) -> Result<Option<JobSnapshot>, PollError>;
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    code: String,
    job_id: Option<DbId>,
}

/// [`JobApi`] over the `/api/v1` HTTP routes.
#[derive(Clone)]
pub struct HttpJobApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpJobApi {
    /// `base_url` is the server origin, without `/api/v1`.
    pub fn new(client: reqwest::Client, base_url: &str, token: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{path}", self.base_url)
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PollError> {
        let status = response.status();
        if status.is_success() {
            let envelope: DataEnvelope<T> = response.json().await?;
            return Ok(envelope.data);
        }

        let text = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) if body.code == "JOB_ACTIVE" => Err(PollError::Conflict {
                job_id: body.job_id,
            }),
            Ok(body) => Err(PollError::Api {
                status: status.as_u16(),
                message: body.error,
            }),
            Err(_) => Err(PollError::Api {
                status: status.as_u16(),
                message: text,
            }),
        }
    }
}

#[async_trait]
impl JobApi for HttpJobApi {
    async fn start(&self, owner: &JobOwner) -> Result<JobSnapshot, PollError> {
        let path = match *owner {
            JobOwner::Recommendation { questionnaire_id } => {
                format!("/questionnaires/{questionnaire_id}/recommendation-jobs")
            }
            JobOwner::WeekGeneration {
                recommendation_id,
                week_number,
            } => format!("/recommendations/{recommendation_id}/weeks/{week_number}/generation-jobs"),
            JobOwner::ScanExtraction { .. } => {
                return Err(PollError::Unsupported(
                    "Scan extraction jobs are started by uploading the scan",
                ))
            }
        };

        let response = self
            .client
            .post(self.url(&path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn job_status(&self, job_id: DbId) -> Result<JobSnapshot, PollError> {
        let response = self
            .client
            .get(self.url(&format!("/jobs/{job_id}")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn latest_job(&self, owner: &JobOwner) -> Result<Option<JobSnapshot>, PollError> {
        let mut query = vec![
            ("kind", owner.kind().as_str().to_string()),
            ("owner_id", owner.owner_id().to_string()),
        ];
        if let Some(week) = owner.target_week() {
            query.push(("week", week.to_string()));
        }

        let response = self
            .client
            .get(self.url("/jobs/latest"))
            .query(&query)
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::read(response).await
    }
}
