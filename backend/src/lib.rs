pub mod analytics;
pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod ids;
pub mod inflight;
pub mod interest;
pub mod ledger;
pub mod lst;
pub mod oneinch;
pub mod prime;
pub mod response;
pub mod scheduler;
pub mod telemetry;
pub mod users;
pub mod validation;

pub use app::{create_app, AppState};
