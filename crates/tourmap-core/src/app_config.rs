use crate::geo::Depot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub depot: Depot,
    pub geocoder_url: String,
    pub geocoder_user_agent: String,
    pub geocoder_timeout_secs: u64,
    pub geocoder_min_interval_ms: u64,
    pub geocoder_max_in_flight: usize,
    pub geocoder_max_retries: u32,
    pub geocoder_backoff_base_ms: u64,
    pub geocode_cache_ttl_secs: u64,
    pub geocode_cache_capacity: usize,
    pub router_url: String,
    pub router_profile: String,
    pub directions_max_waypoints: usize,
}
