//! # carscope API
//!
//! HTTP surface for carscope: single and batch price prediction, similar
//! vehicle lookup, dataset exploration, insights and per-client sessions.
//!
//! Prediction endpoints answer `503` while no model is loaded; everything else
//! works from the dataset alone.

pub mod config;
pub mod error;
pub mod rest;
pub mod session;
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use rest::RestApi;
pub use session::{Mode, SessionContext, SessionStore, DEFAULT_SESSION_IDLE};
pub use state::Resources;
