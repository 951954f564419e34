//! # Order Fellow server
//! This crate hosts the HTTP gateway for Order Fellow. It is responsible for:
//! Authenticating webhook callers with their per-account secret.
//! Accepting new orders from business accounts and letting verified callers manage them.
//! Running the background worker that emails customers when their orders change.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `POST /webhook/`: Receives new orders. Rate limited per account.
//! * `/orderreceptions/` and `/orderreceptions/{id}/`: List, create, fetch, update and delete orders. Verified callers
//!   only.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod middleware;
pub mod routes;
pub mod server;
