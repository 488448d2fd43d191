//! Terminal and file output for generation summaries

use crate::analytics::metrics::{GenerationSummary, GroupAggregate};
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Saves generation summaries under an output directory
pub struct SurveyLogger {
    output_dir: PathBuf,
}

impl SurveyLogger {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// Save the summary as timestamped pretty JSON
    pub fn save_summary(&self, summary: &GenerationSummary) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)
            .context("Failed to create summary directory")?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let path = self.output_dir.join(format!("generation_{}.json", timestamp));

        let json = serde_json::to_string_pretty(summary)
            .context("Failed to serialize summary")?;
        let mut file = File::create(&path).context("Failed to create summary file")?;
        file.write_all(json.as_bytes())
            .context("Failed to write summary file")?;

        info!("Summary saved to: {}", path.display());
        Ok(path)
    }

    /// Load a summary written by [`SurveyLogger::save_summary`]
    pub fn load_summary(path: &Path) -> Result<GenerationSummary> {
        let contents = fs::read_to_string(path).context("Failed to read summary file")?;
        serde_json::from_str(&contents).context("Failed to parse summary file")
    }
}

/// Format a generation summary as a text table
pub fn format_summary(summary: &GenerationSummary) -> String {
    let mut out = String::new();
    let rule = "═".repeat(58);

    let _ = writeln!(out, "╔{}╗", rule);
    let _ = writeln!(out, "  SYNTHETIC SURVEY DATA");
    let _ = writeln!(out, "  Total rows: {}", summary.total_rows);
    let _ = writeln!(out, "╠{}╣", rule);

    for group in &summary.groups {
        let _ = writeln!(out, "  {}  ({} rows)", group.group, group.row_count);
        let _ = writeln!(
            out,
            "  {:<12} {:>8} {:>8} {:>8} {:>6} {:>6}",
            "indicator", "target", "mean", "delta", "min", "max"
        );
        for ind in &group.indicators {
            let target = ind.target.map(|t| format!("{:.2}", t)).unwrap_or_else(|| "-".into());
            let delta = ind
                .deviation()
                .map(|d| format!("{:+.3}", d))
                .unwrap_or_else(|| "-".into());
            let _ = writeln!(
                out,
                "  {:<12} {:>8} {:>8.3} {:>8} {:>6} {:>6}",
                ind.indicator, target, ind.achieved, delta, ind.min, ind.max
            );
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "  Largest deviation from target: {:.3}", summary.max_deviation());
    let _ = writeln!(out, "╚{}╝", rule);
    out
}

/// Print a generation summary to the terminal
pub fn print_summary(summary: &GenerationSummary) {
    println!("{}", format_summary(summary));
}

/// Format per-group means as a text table
pub fn format_aggregates(aggregates: &[GroupAggregate]) -> String {
    let mut out = String::new();
    for aggregate in aggregates {
        let _ = writeln!(out, "  {}  ({} rows)", aggregate.group, aggregate.row_count);
        for m in &aggregate.means {
            let _ = writeln!(out, "    {:<12} {:>8.3}", m.indicator, m.mean);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::metrics::MetricsCalculator;
    use crate::config::SurveyConfig;
    use crate::simulation::generate_sample_data;

    fn summary() -> GenerationSummary {
        let config = SurveyConfig::quick_test();
        let samples = generate_sample_data(&config).unwrap();
        MetricsCalculator::generation_summary(&samples, &config.target_averages)
    }

    #[test]
    fn test_format_summary_lists_groups() {
        let text = format_summary(&summary());

        assert!(text.contains("Total rows: 90"));
        assert!(text.contains("10-18岁  (30 rows)"));
        assert!(text.contains("睡眠质量"));
        assert!(text.contains("Largest deviation"));
    }

    #[test]
    fn test_save_and_load_summary() {
        let dir = tempfile::tempdir().unwrap();
        let logger = SurveyLogger::new(&dir.path().join("logs"));

        let saved = summary();
        let path = logger.save_summary(&saved).unwrap();
        let loaded = SurveyLogger::load_summary(&path).unwrap();

        assert_eq!(loaded.total_rows, saved.total_rows);
        assert_eq!(loaded.groups.len(), 3);
        assert_eq!(loaded.groups[2].indicators[0].target, Some(4.0));
    }
}
