//! metricsview — terminal client for the dashboard metrics endpoint.
//!
//! Fetches the counters served by `GET /api/metrics`, derives the cache hit
//! rate, and renders them as an "Overview" grid or a "Stats" list.

pub mod analytics;
pub mod cli;
pub mod client;
pub mod config;
pub mod metrics;
pub mod render;
pub mod view;
