use fitcoach_core::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// The request never got a response. Retried on the next tick.
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with an error status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The owner already has an active job.
    #[error("An active job already exists for this owner")]
    Conflict { job_id: Option<DbId> },

    /// The response body was not the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// This owner's jobs cannot be started through the job API.
    #[error("{0}")]
    Unsupported(&'static str),
}

impl PollError {
    /// Whether the next tick might succeed: no response at all, rate
    /// limiting, or a server-side failure. Anything else (a missing job,
    /// an expired session, a malformed body) will not fix itself.
    pub fn is_transient(&self) -> bool {
        match self {
            PollError::Network(_) => true,
            PollError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for PollError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            PollError::Decode(err.to_string())
        } else {
            PollError::Network(err.to_string())
        }
    }
}
