use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The render surface could not be constructed. Fatal to the current
    /// cycle only.
    #[error("render surface initialization failed: {0}")]
    SurfaceInit(String),

    #[error("tour session has shut down")]
    SessionClosed,
}

#[derive(Debug, Error)]
pub enum PathError {
    #[error("path computation needs at least 2 waypoints, got {count}")]
    TooFewWaypoints { count: usize },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("routing service error {code}: {message}")]
    Service { code: String, message: String },

    #[error("invalid router base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
