//! Client-side job poller.
//!
//! Starts or resumes a job for one owner and follows it until it reaches a
//! terminal status. Each followed job moves through an explicit
//! [`PollerState`] machine (`Idle -> Polling -> Terminal`); ticks are driven
//! by `tokio::time`, so tests can run on paused time.

pub mod api;
pub mod error;
pub mod poller;
pub mod state;

pub use api::{HttpJobApi, JobApi, JobSnapshot};
pub use error::PollError;
pub use poller::JobPoller;
pub use state::{PollOutcome, PollerState};
