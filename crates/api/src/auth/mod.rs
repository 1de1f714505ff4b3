//! Token validation. Tokens are issued by the external auth service.

pub mod jwt;
