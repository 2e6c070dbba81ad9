use std::{net::SocketAddr, time::Duration};

use clap::Parser;

pub const DEFAULT_USER_AGENT: &str = concat!(
    "wayfarer/",
    env!("CARGO_PKG_VERSION"),
    " (travel suggestion planner)"
);

/// Service configuration, read from flags or the environment.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Travel suggestion planner backend")]
pub struct Config {
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    #[arg(long, env = "WIKI_API_URL", default_value = "https://en.wikipedia.org")]
    pub wiki_url: String,

    #[arg(long, env = "OSRM_URL", default_value = "http://router.project-osrm.org")]
    pub osrm_url: String,

    /// OSRM profile: driving, walking, cycling...
    #[arg(long, env = "OSRM_PROFILE", default_value = "driving")]
    pub osrm_profile: String,

    #[arg(long, env = "GEOCODE_URL", default_value = "https://geocode.maps.co")]
    pub geocode_url: String,

    #[arg(long, env = "GEOCODE_API_KEY", default_value = "-", hide_env_values = true)]
    pub geocode_api_key: String,

    /// Hosted inference endpoint of the fine-tuned T5 model
    #[arg(long, env = "T5_URL")]
    pub t5_url: Option<String>,

    #[arg(long, env = "T5_API_TOKEN", hide_env_values = true)]
    pub t5_token: Option<String>,

    #[arg(
        long,
        env = "GEMINI_URL",
        default_value = "https://generativelanguage.googleapis.com"
    )]
    pub gemini_url: String,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-1.5-flash")]
    pub gemini_model: String,

    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 10)]
    pub http_timeout_secs: u64,

    /// Pause after each encyclopedia lookup
    #[arg(long, env = "POI_DELAY_MS", default_value_t = 500)]
    pub poi_delay_ms: u64,

    /// Minimum spacing between the two geocoding calls of a query
    #[arg(long, env = "GEOCODE_INTERVAL_MS", default_value_t = 1200)]
    pub geocode_interval_ms: u64,

    #[arg(long, env = "SAMPLE_COUNT", default_value_t = 5)]
    pub sample_count: usize,
}

impl Config {
    pub fn settings(&self) -> PlannerSettings {
        PlannerSettings {
            wiki_url: self.wiki_url.clone(),
            osrm_url: self.osrm_url.clone(),
            osrm_profile: self.osrm_profile.clone(),
            geocode_url: self.geocode_url.clone(),
            geocode_api_key: self.geocode_api_key.clone(),
            t5_url: self.t5_url.clone(),
            t5_token: self.t5_token.clone(),
            gemini_url: self.gemini_url.clone(),
            gemini_api_key: self.gemini_api_key.clone(),
            gemini_model: self.gemini_model.clone(),
            http_timeout: Duration::from_secs(self.http_timeout_secs),
            poi_delay: Duration::from_millis(self.poi_delay_ms),
            geocode_interval: Duration::from_millis(self.geocode_interval_ms),
            sample_count: self.sample_count,
            ..PlannerSettings::default()
        }
    }
}

/// Everything the planner pipeline needs to reach its upstreams.
#[derive(Debug, Clone)]
pub struct PlannerSettings {
    pub wiki_url: String,
    pub osrm_url: String,
    pub osrm_profile: String,
    pub geocode_url: String,
    pub geocode_api_key: String,
    pub t5_url: Option<String>,
    pub t5_token: Option<String>,
    pub gemini_url: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub user_agent: String,
    pub http_timeout: Duration,
    pub poi_delay: Duration,
    pub geocode_interval: Duration,
    pub sample_count: usize,
    pub search_radius_m: u32,
    pub search_limit: u32,
    pub summary_cache_size: usize,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            wiki_url: "https://en.wikipedia.org".into(),
            osrm_url: "http://router.project-osrm.org".into(),
            osrm_profile: "driving".into(),
            geocode_url: "https://geocode.maps.co".into(),
            geocode_api_key: "-".into(),
            t5_url: None,
            t5_token: None,
            gemini_url: "https://generativelanguage.googleapis.com".into(),
            gemini_api_key: None,
            gemini_model: "gemini-1.5-flash".into(),
            user_agent: DEFAULT_USER_AGENT.into(),
            http_timeout: Duration::from_secs(10),
            poi_delay: Duration::from_millis(500),
            geocode_interval: Duration::from_millis(1200),
            sample_count: 5,
            search_radius_m: 10_000,
            search_limit: 10,
            summary_cache_size: 256,
        }
    }
}

impl PlannerSettings {
    /// Point every upstream at one base URL with no politeness delays.
    pub fn local(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        Self {
            wiki_url: base.clone(),
            osrm_url: base.clone(),
            geocode_url: base.clone(),
            t5_url: Some(format!("{base}/t5")),
            gemini_url: base,
            gemini_api_key: Some("test-key".into()),
            poi_delay: Duration::ZERO,
            geocode_interval: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.http_timeout)
            .build()
    }
}
