//! Admin API server and routes

pub mod auth;
pub mod extractors;
mod openapi;
pub mod routes;
mod server;
pub mod types;

pub use auth::AuthManager;
pub use server::{ApiServer, ApiState};
