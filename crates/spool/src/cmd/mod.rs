//! Command implementations for the spool CLI

pub mod ingest;
pub mod run;
