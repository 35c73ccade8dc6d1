//! HTTP backend for uploading, listing, previewing and downloading CSV files.

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod model;
pub mod routes;
pub mod seed;
pub mod state;
pub mod storage;

pub use config::Config;
pub use error::{ApiError, StartupError};
pub use routes::router;
pub use state::AppState;
