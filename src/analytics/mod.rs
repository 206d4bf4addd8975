//! Fetch history: the JSONL fetch log and its reporter.

pub mod logger;
pub mod reporter;
