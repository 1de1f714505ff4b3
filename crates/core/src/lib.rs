//! Domain logic shared by every fitcoach crate.
//!
//! Zero internal dependencies: the db, worker, api and poller crates all
//! build on the types and pure functions defined here.

pub mod error;
pub mod jobs;
pub mod measurements;
pub mod polling;
pub mod status;
pub mod types;
pub mod week_gate;
