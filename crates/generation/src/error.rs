/// Errors from the generation and extraction services.
///
/// Messages are stored verbatim on failed jobs, so they should read well
/// to an operator.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("Service request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Service error ({status}): {body}")]
    Api {
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The service answered but the payload cannot be used.
    #[error("Unusable result: {0}")]
    Unusable(String),

    /// The client was not configured (e.g. missing base URL).
    #[error("Not configured: {0}")]
    NotConfigured(&'static str),
}
