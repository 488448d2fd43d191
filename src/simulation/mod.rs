//! Synthetic data generation

pub mod generator;
pub mod sample;

pub use generator::{generate_sample_data, SampleGenerator};
pub use sample::{SampleRow, SampleSet};
