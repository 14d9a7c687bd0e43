//! Server configuration from environment.

use std::env;

use survey_core::models::DEFAULT_MAX_EXTENT_M;
use survey_core::SurveyConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    /// Edge raster provider. Requests fail with 502 while it is empty.
    pub raster_source_url: String,
    pub raster_request_timeout_s: u64,
    pub raster_cache_ttl_s: u64,
    pub raster_cache_max_entries: usize,
    pub patch_size: usize,
    pub resolution_m: f64,
    /// Largest distance between input points a request may carry.
    pub max_extent_m: f64,
    /// Browser origin allowed by CORS. Unset allows any origin.
    pub allowed_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = SurveyConfig::default();
        Self {
            server_port: env::var("SURVEY_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3000),
            raster_source_url: env::var("RASTER_SOURCE_URL").unwrap_or_default(),
            raster_request_timeout_s: env::var("RASTER_REQUEST_TIMEOUT_S")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            raster_cache_ttl_s: env::var("RASTER_CACHE_TTL_S")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(600),
            raster_cache_max_entries: env::var("RASTER_CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(512),
            patch_size: env::var("SURVEY_PATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.area.patch_size),
            resolution_m: env::var("SURVEY_RESOLUTION_M")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.area.resolution_m),
            max_extent_m: env::var("SURVEY_MAX_EXTENT_M")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_EXTENT_M),
            allowed_origin: env::var("SURVEY_ALLOWED_ORIGIN")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        }
    }

    /// Pipeline defaults with this server's raster geometry applied.
    pub fn survey_defaults(&self) -> SurveyConfig {
        let mut survey = SurveyConfig::default().with_resolution(self.resolution_m);
        survey.area.patch_size = self.patch_size;
        survey
    }

    pub fn has_raster_source(&self) -> bool {
        !self.raster_source_url.trim().is_empty()
    }
}

impl Default for Config {
    fn default() -> Self {
        let defaults = SurveyConfig::default();
        Self {
            server_port: 3000,
            raster_source_url: String::new(),
            raster_request_timeout_s: 30,
            raster_cache_ttl_s: 600,
            raster_cache_max_entries: 512,
            patch_size: defaults.area.patch_size,
            resolution_m: defaults.area.resolution_m,
            max_extent_m: DEFAULT_MAX_EXTENT_M,
            allowed_origin: None,
        }
    }
}
