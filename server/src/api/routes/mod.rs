//! API route handlers

pub mod accession;
pub mod dataset;
pub mod files;
pub mod ingest;
pub mod ready;
pub mod users;
