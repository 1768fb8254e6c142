use crate::session::DEFAULT_SESSION_IDLE;
use std::path::PathBuf;
use std::time::Duration;

/// Where the server finds its inputs and where it listens
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Reference dataset CSV; required
    pub dataset_path: PathBuf,
    /// Model artifact JSON; the server still starts when it is missing
    pub model_path: PathBuf,
    pub bind: String,
    pub http_port: u16,
    /// Sessions untouched for this long are evicted
    pub session_idle: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("dataset/dataset.csv"),
            model_path: PathBuf::from("model/vehicle_price_model.json"),
            bind: "0.0.0.0".to_string(),
            http_port: 8080,
            session_idle: DEFAULT_SESSION_IDLE,
        }
    }
}
