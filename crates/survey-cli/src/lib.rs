//! Survey CLI - command line tools for the survey planning server.
//!
//! Binaries:
//! - survey-detect: detect the area enclosing a set of points
//! - survey-plan: plan a coverage flight over that area

pub mod client;
pub mod points;

pub use client::SurveyClient;
pub use points::{load_points, parse_point};
