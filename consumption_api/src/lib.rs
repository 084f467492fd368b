//! HTTP serving surface for consumption forecasting.
//!
//! Wraps a [`consumption_forecast::ModelManager`] and the prediction and
//! feedback logs behind an axum router.

pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::{ApiError, Result};
pub use routes::create_router;
pub use state::AppState;
