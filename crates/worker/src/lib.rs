//! Background processing of generation and extraction jobs.
//!
//! - [`processor::JobProcessor`] runs one pending job through its lifecycle
//!   using the handler registered for the job's kind.
//! - [`handlers`] holds the three kind-specific handlers.
//! - [`dispatcher::JobDispatcher`] sweeps pending jobs, either on an
//!   interval (worker binary) or once per external cron call (API).

use std::sync::Arc;

use fitcoach_db::store::JobStore;
use fitcoach_db::DbPool;
use fitcoach_generation::{GenerationClient, GenerationConfig, GenerationError, OcrClient};

pub mod dispatcher;
pub mod handlers;
pub mod processor;

use handlers::{RecommendationHandler, ScanExtractionHandler, WeekGenerationHandler};
use processor::JobProcessor;

/// Build a processor with a handler for every configured collaborator.
///
/// A kind whose service URL is missing gets no handler; its jobs fail with
/// a descriptive message instead of staying pending forever.
pub fn build_processor(
    pool: DbPool,
    store: Arc<dyn JobStore>,
    config: &GenerationConfig,
) -> Result<JobProcessor, GenerationError> {
    let http = config.http_client()?;
    let mut processor = JobProcessor::new(store);

    match GenerationClient::from_config(config, http.clone()) {
        Ok(client) => {
            let client = Arc::new(client);
            processor = processor
                .with_handler(RecommendationHandler::new(pool.clone(), client.clone()))
                .with_handler(WeekGenerationHandler::new(pool.clone(), client));
        }
        Err(e) => tracing::warn!(error = %e, "Generation service disabled"),
    }

    match OcrClient::from_config(config, http) {
        Ok(client) => {
            processor = processor.with_handler(ScanExtractionHandler::new(pool, Arc::new(client)));
        }
        Err(e) => tracing::warn!(error = %e, "Scan extraction disabled"),
    }

    Ok(processor)
}
