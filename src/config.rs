//! Survey configuration

use crate::error::{Result, SurveyError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Target means keyed by age group, then by indicator
pub type TargetAverages = BTreeMap<String, BTreeMap<String, f64>>;

/// Rows per group when no sample size is given
pub const DEFAULT_SAMPLE_SIZE: usize = 100;

/// Standard deviation of the score distribution
pub const DEFAULT_SPREAD: f64 = 0.5;

/// Closed integer range every score is clamped into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub lo: i32,
    pub hi: i32,
}

impl ScoreRange {
    pub fn new(lo: i32, hi: i32) -> Self {
        Self { lo, hi }
    }

    /// Round half to even, then clamp into `[lo, hi]`
    pub fn quantize(&self, value: f64) -> i32 {
        let rounded = value.round_ties_even();
        if rounded.is_nan() {
            return self.lo;
        }
        rounded.clamp(self.lo as f64, self.hi as f64) as i32
    }

    pub fn contains(&self, score: i32) -> bool {
        (self.lo..=self.hi).contains(&score)
    }
}

impl Default for ScoreRange {
    fn default() -> Self {
        Self { lo: 1, hi: 5 }
    }
}

/// Main survey configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyConfig {
    /// Age group labels, in report order
    pub age_groups: Vec<String>,

    /// Indicator names, in column order
    pub indicators: Vec<String>,

    /// Target mean per (group, indicator)
    pub target_averages: TargetAverages,

    /// Valid score range
    pub score_range: ScoreRange,

    /// Rows per group (`None` or 0 falls back to 100)
    pub sample_size: Option<usize>,

    /// Standard deviation of the normal draw
    pub spread: f64,

    /// RNG seed for reproducible samples
    pub seed: Option<u64>,

    /// CSV written by the generator and read by the report builder
    pub data_path: PathBuf,

    /// HTML report output
    pub report_path: PathBuf,

    /// TrueType/OpenType font used for chart text
    pub font_path: Option<PathBuf>,

    /// Composite figure width in pixels
    pub chart_width: u32,

    /// Composite figure height in pixels
    pub chart_height: u32,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        let age_groups = columns::DEFAULT_AGE_GROUPS.map(String::from).to_vec();
        let indicators = columns::DEFAULT_INDICATORS.map(String::from).to_vec();

        let target_averages = age_groups
            .iter()
            .zip([3.0, 2.0, 4.0])
            .map(|(group, mean)| {
                let per_indicator: BTreeMap<String, f64> =
                    indicators.iter().map(|i| (i.clone(), mean)).collect();
                (group.clone(), per_indicator)
            })
            .collect();

        Self {
            age_groups,
            indicators,
            target_averages,
            score_range: ScoreRange::default(),
            sample_size: Some(150),
            spread: DEFAULT_SPREAD,
            seed: None,
            data_path: PathBuf::from("sample_data.csv"),
            report_path: PathBuf::from("age_group_plots.html"),
            font_path: None,
            chart_width: 1800,
            chart_height: 1200,
        }
    }
}

impl SurveyConfig {
    /// Small seeded configuration for quick runs
    pub fn quick_test() -> Self {
        Self {
            sample_size: Some(30),
            seed: Some(42),
            chart_width: 900,
            chart_height: 600,
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON file; missing fields take defaults
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn effective_sample_size(&self) -> usize {
        match self.sample_size {
            Some(n) if n > 0 => n,
            _ => DEFAULT_SAMPLE_SIZE,
        }
    }

    /// Look up the target mean for one (group, indicator) pair
    pub fn target(&self, group: &str, indicator: &str) -> Result<f64> {
        self.target_averages
            .get(group)
            .and_then(|targets| targets.get(indicator))
            .copied()
            .ok_or_else(|| SurveyError::MissingTarget {
                group: group.to_string(),
                indicator: indicator.to_string(),
            })
    }

    /// Check the configuration before any sampling happens
    pub fn validate(&self) -> Result<()> {
        if self.age_groups.is_empty() {
            return Err(SurveyError::InvalidConfig("no age groups".into()));
        }
        if self.indicators.is_empty() {
            return Err(SurveyError::InvalidConfig("no indicators".into()));
        }
        if self.score_range.lo > self.score_range.hi {
            return Err(SurveyError::InvalidConfig(format!(
                "score range {}..={} is empty",
                self.score_range.lo, self.score_range.hi
            )));
        }
        if !self.spread.is_finite() || self.spread < 0.0 {
            return Err(SurveyError::InvalidSpread(self.spread));
        }

        let mut seen = HashSet::new();
        for indicator in &self.indicators {
            if indicator == columns::GROUP_COLUMN {
                return Err(SurveyError::InvalidConfig(format!(
                    "indicator name `{}` collides with the group column",
                    indicator
                )));
            }
            if !seen.insert(indicator.as_str()) {
                return Err(SurveyError::InvalidConfig(format!(
                    "duplicate indicator `{}`",
                    indicator
                )));
            }
        }

        for group in &self.age_groups {
            for indicator in &self.indicators {
                self.target(group, indicator)?;
            }
        }

        Ok(())
    }
}

/// Column names and default labels shared by the CSV writer and reader
pub mod columns {
    pub const GROUP_COLUMN: &str = "年龄段";

    pub const DEFAULT_AGE_GROUPS: [&str; 3] = ["10-18岁", "18-22岁", "22-30岁"];

    pub const DEFAULT_INDICATORS: [&str; 8] = [
        "抑郁值",
        "焦虑值",
        "憔悴值",
        "愤怒值",
        "压力程度",
        "幸福感",
        "自尊",
        "睡眠质量",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SurveyConfig::default();
        config.validate().unwrap();

        assert_eq!(config.age_groups.len(), 3);
        assert_eq!(config.indicators.len(), 8);
        assert_eq!(config.target("18-22岁", "自尊").unwrap(), 2.0);
        assert_eq!(config.target("22-30岁", "睡眠质量").unwrap(), 4.0);
    }

    #[test]
    fn test_quantize_rounds_half_to_even_and_clamps() {
        let range = ScoreRange::new(1, 5);
        assert_eq!(range.quantize(2.5), 2);
        assert_eq!(range.quantize(3.5), 4);
        assert_eq!(range.quantize(-0.7), 1);
        assert_eq!(range.quantize(9.2), 5);
        assert_eq!(range.quantize(f64::NAN), 1);
    }

    #[test]
    fn test_sample_size_fallback() {
        let mut config = SurveyConfig::default();
        config.sample_size = None;
        assert_eq!(config.effective_sample_size(), DEFAULT_SAMPLE_SIZE);
        config.sample_size = Some(0);
        assert_eq!(config.effective_sample_size(), DEFAULT_SAMPLE_SIZE);
        config.sample_size = Some(7);
        assert_eq!(config.effective_sample_size(), 7);
    }

    #[test]
    fn test_missing_target_is_rejected() {
        let mut config = SurveyConfig::default();
        config
            .target_averages
            .get_mut("10-18岁")
            .unwrap()
            .remove("焦虑值");

        match config.validate() {
            Err(SurveyError::MissingTarget { group, indicator }) => {
                assert_eq!(group, "10-18岁");
                assert_eq!(indicator, "焦虑值");
            }
            other => panic!("expected MissingTarget, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_range_and_spread() {
        let mut config = SurveyConfig::default();
        config.score_range = ScoreRange::new(5, 1);
        assert!(matches!(config.validate(), Err(SurveyError::InvalidConfig(_))));

        let mut config = SurveyConfig::default();
        config.spread = -0.1;
        assert!(matches!(config.validate(), Err(SurveyError::InvalidSpread(_))));
    }

    #[test]
    fn test_indicator_named_like_group_column() {
        let mut config = SurveyConfig::default();
        config.indicators.push(columns::GROUP_COLUMN.to_string());
        assert!(matches!(config.validate(), Err(SurveyError::InvalidConfig(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/survey.json");

        let config = SurveyConfig::quick_test();
        config.save(&path).unwrap();
        let loaded = SurveyConfig::load(&path).unwrap();

        assert_eq!(loaded.seed, Some(42));
        assert_eq!(loaded.indicators, config.indicators);
        assert_eq!(loaded.target_averages, config.target_averages);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SurveyConfig =
            serde_json::from_str(r#"{ "sample_size": 12, "seed": 7 }"#).unwrap();
        assert_eq!(config.effective_sample_size(), 12);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.age_groups.len(), 3);
    }
}
