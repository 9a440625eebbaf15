//! API server and routes

pub mod middleware;
pub mod routes;
mod server;

pub use server::{ApiServer, ApiState};
