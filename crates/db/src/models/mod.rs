//! Domain model structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row, plus the insert/query DTOs that go with it.

pub mod client;
pub mod job;
pub mod questionnaire;
pub mod recommendation;
pub mod scan;
pub mod workout;
