//! HTTP surface: the `/run_notify` trigger polled by the external cron
//! service, plus a small JSON API over the desk operations.

pub mod routes;
pub mod server;

pub use server::{AppState, build_router, start};
