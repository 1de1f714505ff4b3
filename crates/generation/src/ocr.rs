//! HTTP client for the OCR extraction service.
//!
//! `POST {base}/extract` takes a multipart form with a single `file` part
//! and answers a flat JSON object of measurement fields; fields the service
//! could not read are omitted or `null`.

use async_trait::async_trait;
use fitcoach_core::measurements::ScanMeasurements;
use reqwest::multipart::{Form, Part};

use crate::client::ensure_success;
use crate::error::GenerationError;
use crate::{GenerationConfig, ScanExtractor};

#[derive(Clone)]
pub struct OcrClient {
    client: reqwest::Client,
    api_url: String,
}

impl OcrClient {
    pub fn new(client: reqwest::Client, api_url: String) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build from configuration; fails when `OCR_API_URL` is unset.
    pub fn from_config(
        config: &GenerationConfig,
        client: reqwest::Client,
    ) -> Result<Self, GenerationError> {
        let api_url = config
            .ocr_api_url
            .clone()
            .ok_or(GenerationError::NotConfigured("OCR_API_URL"))?;
        Ok(Self::new(client, api_url))
    }
}

#[async_trait]
impl ScanExtractor for OcrClient {
    async fn extract(&self, image: &[u8], mime: &str) -> Result<ScanMeasurements, GenerationError> {
        let part = Part::bytes(image.to_vec())
            .file_name("scan")
            .mime_str(mime)?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/extract", self.api_url))
            .multipart(form)
            .send()
            .await?;
        let measurements: ScanMeasurements = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| GenerationError::Unusable(format!("malformed extraction result: {e}")))?;

        if !measurements.is_usable() {
            return Err(GenerationError::Unusable(
                "no measurements could be read from the scan".to_string(),
            ));
        }
        measurements
            .validate()
            .map_err(|e| GenerationError::Unusable(e.to_string()))?;
        Ok(measurements)
    }
}
