//! Operational HTTP endpoints.

pub mod health;
pub mod metrics;
pub mod stats;
