//! Synthetic Sample Generator
//!
//! Draws integer survey scores per (age group, indicator) from a normal
//! distribution centred on the configured target mean, then rounds and
//! clamps them into the score range.

use crate::config::{ScoreRange, SurveyConfig};
use crate::error::{Result, SurveyError};
use crate::simulation::sample::{SampleRow, SampleSet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tracing::{debug, info};

/// Target means resolved for one group, in indicator order
#[derive(Debug, Clone)]
struct GroupPlan {
    group: String,
    targets: Vec<f64>,
}

/// Generates sample rows for every configured age group
pub struct SampleGenerator {
    indicators: Vec<String>,
    plans: Vec<GroupPlan>,
    range: ScoreRange,
    spread: f64,
    sample_size: usize,
    rng: StdRng,
}

impl SampleGenerator {
    /// Validate the configuration and resolve every target mean up front
    pub fn new(config: &SurveyConfig) -> Result<Self> {
        config.validate()?;

        let plans = config
            .age_groups
            .iter()
            .map(|group| {
                let targets = config
                    .indicators
                    .iter()
                    .map(|indicator| config.target(group, indicator))
                    .collect::<Result<Vec<_>>>()?;
                Ok(GroupPlan {
                    group: group.clone(),
                    targets,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            indicators: config.indicators.clone(),
            plans,
            range: config.score_range,
            spread: config.spread,
            sample_size: config.effective_sample_size(),
            rng,
        })
    }

    /// Rows generated per group
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Generate all rows, groups in configured order
    pub fn generate(&mut self) -> Result<SampleSet> {
        info!(
            "Generating {} rows for each of {} age groups ({} indicators)",
            self.sample_size,
            self.plans.len(),
            self.indicators.len()
        );

        let mut samples = SampleSet::new(self.indicators.clone());
        samples.rows.reserve(self.sample_size * self.plans.len());

        for plan in &self.plans {
            let columns = plan
                .targets
                .iter()
                .map(|&mean| {
                    draw_scores(&mut self.rng, mean, self.spread, self.range, self.sample_size)
                })
                .collect::<Result<Vec<_>>>()?;

            for k in 0..self.sample_size {
                samples.rows.push(SampleRow {
                    group: plan.group.clone(),
                    scores: columns.iter().map(|column| column[k]).collect(),
                });
            }

            debug!("Group {}: {} rows", plan.group, self.sample_size);
        }

        info!("Generated {} rows", samples.len());
        Ok(samples)
    }
}

/// Draw `n` scores around `mean`, rounded half to even and clamped
pub fn draw_scores<R: Rng + ?Sized>(
    rng: &mut R,
    mean: f64,
    spread: f64,
    range: ScoreRange,
    n: usize,
) -> Result<Vec<i32>> {
    let normal = Normal::new(mean, spread).map_err(|_| SurveyError::InvalidSpread(spread))?;
    Ok((0..n).map(|_| range.quantize(normal.sample(rng))).collect())
}

/// Generate a full sample set from a configuration
pub fn generate_sample_data(config: &SurveyConfig) -> Result<SampleSet> {
    SampleGenerator::new(config)?.generate()
}
