//! Command implementations for the CLI
//!
//! - start: Run the HTTP query service
//! - ingest: Generate and store synthetic samples
//! - log: Append an operator message to the event log
//! - config: Configuration display and validation

pub mod config;
pub mod ingest;
pub mod log;
pub mod start;
