use std::time::Duration;

/// Connection settings for the external services.
///
/// | Env var                   | Default |
/// |---------------------------|---------|
/// | `GENERATION_API_URL`      | (none)  |
/// | `GENERATION_API_KEY`      | (none)  |
/// | `OCR_API_URL`             | (none)  |
/// | `GENERATION_TIMEOUT_SECS` | `120`   |
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub generation_api_url: Option<String>,
    pub generation_api_key: Option<String>,
    pub ocr_api_url: Option<String>,
    pub timeout: Duration,
}

const DEFAULT_TIMEOUT_SECS: u64 = 120;

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            generation_api_url: None,
            generation_api_key: None,
            ocr_api_url: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl GenerationConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let timeout_secs = get("GENERATION_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            generation_api_url: get("GENERATION_API_URL").map(|u| u.trim_end_matches('/').to_string()),
            generation_api_key: get("GENERATION_API_KEY"),
            ocr_api_url: get("OCR_API_URL").map(|u| u.trim_end_matches('/').to_string()),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// A shared [`reqwest::Client`] carrying the configured timeout.
    pub fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder().timeout(self.timeout).build()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = GenerationConfig::from_lookup(lookup(&[]));
        assert!(config.generation_api_url.is_none());
        assert!(config.ocr_api_url.is_none());
        assert_eq!(config.timeout, Duration::from_secs(120));
    }

    #[test]
    fn default_matches_unset_environment() {
        let config = GenerationConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert!(config.http_client().is_ok());
        assert!(config.generation_api_url.is_none());
    }

    #[test]
    fn trailing_slash_trimmed() {
        let config = GenerationConfig::from_lookup(lookup(&[
            ("GENERATION_API_URL", "http://llm.internal/v1/"),
            ("OCR_API_URL", "http://ocr.internal/"),
            ("GENERATION_TIMEOUT_SECS", "30"),
        ]));
        assert_eq!(config.generation_api_url.as_deref(), Some("http://llm.internal/v1"));
        assert_eq!(config.ocr_api_url.as_deref(), Some("http://ocr.internal"));
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn blank_values_are_unset() {
        let config = GenerationConfig::from_lookup(lookup(&[("GENERATION_API_KEY", "  ")]));
        assert!(config.generation_api_key.is_none());
    }
}
