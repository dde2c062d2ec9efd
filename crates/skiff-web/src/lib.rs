//! HTTP control surface for Skiff.
//!
//! A small JSON API for driving the agent lifecycle from outside the
//! process: start or replace the running agent, inspect its status,
//! and answer health probes.

mod error;
mod routes;

pub use error::WebError;
pub use routes::{AppState, create_router, run_server};
