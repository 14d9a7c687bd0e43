//! Shared application state.

use std::sync::Arc;

use survey_core::{RasterSource, SurveyConfig};

use crate::config::Config;

pub type SharedRasterSource = Arc<dyn RasterSource + Send + Sync>;

/// Application state shared by every request handler.
pub struct AppState {
    config: Config,
    survey: SurveyConfig,
    source: SharedRasterSource,
    source_name: String,
}

impl AppState {
    pub fn new(config: Config, source: SharedRasterSource, source_name: impl Into<String>) -> Self {
        Self {
            survey: config.survey_defaults(),
            config,
            source,
            source_name: source_name.into(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Defaults every request starts from.
    pub fn survey_defaults(&self) -> SurveyConfig {
        self.survey.clone()
    }

    pub fn raster_source(&self) -> SharedRasterSource {
        self.source.clone()
    }

    pub fn raster_source_name(&self) -> &str {
        &self.source_name
    }
}
