//! Utility modules

pub mod chart_math;
pub mod csv_io;

pub use csv_io::{read_survey_table, write_samples, SurveyRecord, SurveyTable};
