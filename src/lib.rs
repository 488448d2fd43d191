//! Synthetic Psychological Survey Toolkit
//!
//! Generates synthetic per-subject survey scores for a set of age groups so
//! that each (group, indicator) column approximates a target mean, then
//! builds an HTML report with six chart views of the per-group means.

pub mod analytics;
pub mod config;
pub mod error;
pub mod simulation;
pub mod utils;

pub use analytics::report::generate_report;
pub use config::SurveyConfig;
pub use error::SurveyError;
pub use simulation::generator::SampleGenerator;
