pub mod app_config;
pub mod config;
pub mod geo;
pub mod stops;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use geo::{Coordinates, Depot, Resolution, ResolvedStop, UnresolvedReason};
pub use stops::{
    load_stops, MalformedStop, RawId, RawStop, Stop, StopId, StopRecord, StopStatus,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read stops file {path}: {source}")]
    StopsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse stops file {path}: {reason}")]
    StopsFileParse { path: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("coordinates out of range: lat={lat}, lon={lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },
}
