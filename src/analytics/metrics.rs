//! Per-group aggregation for reports and generation summaries

use crate::config::TargetAverages;
use crate::simulation::SampleSet;
use crate::utils::csv_io::SurveyTable;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Calculator for survey metrics
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Mean of every indicator across the rows of one group
    ///
    /// Returns `None` when the group has no rows or the table has no
    /// indicator columns.
    pub fn group_means(table: &SurveyTable, group: &str) -> Option<GroupAggregate> {
        if table.indicators.is_empty() {
            return None;
        }

        let mut sums = vec![0.0; table.indicators.len()];
        let mut row_count = 0usize;
        for record in table.records.iter().filter(|r| r.group == group) {
            for (sum, value) in sums.iter_mut().zip(&record.values) {
                *sum += value;
            }
            row_count += 1;
        }

        if row_count == 0 {
            return None;
        }

        let means = table
            .indicators
            .iter()
            .zip(sums)
            .map(|(indicator, sum)| IndicatorMean {
                indicator: indicator.clone(),
                mean: sum / row_count as f64,
            })
            .collect();

        Some(GroupAggregate {
            group: group.to_string(),
            row_count,
            means,
        })
    }

    /// Aggregates for the requested groups, in order, skipping empty ones
    pub fn aggregate_groups(table: &SurveyTable, groups: &[String]) -> Vec<GroupAggregate> {
        groups
            .iter()
            .filter_map(|group| {
                let aggregate = Self::group_means(table, group);
                if aggregate.is_none() {
                    debug!("No rows for group {}, skipping", group);
                }
                aggregate
            })
            .collect()
    }

    /// Target versus achieved statistics for a generated sample set
    pub fn generation_summary(samples: &SampleSet, targets: &TargetAverages) -> GenerationSummary {
        let mut groups: Vec<String> = Vec::new();
        for row in &samples.rows {
            if !groups.contains(&row.group) {
                groups.push(row.group.clone());
            }
        }

        let groups = groups
            .into_iter()
            .map(|group| {
                let indicators = samples
                    .indicators
                    .iter()
                    .map(|indicator| {
                        let column = samples.column(&group, indicator);
                        let achieved = if column.is_empty() {
                            0.0
                        } else {
                            column.iter().map(|&s| s as f64).sum::<f64>() / column.len() as f64
                        };
                        IndicatorSummary {
                            indicator: indicator.clone(),
                            target: targets.get(&group).and_then(|t| t.get(indicator)).copied(),
                            achieved,
                            min: column.iter().copied().min().unwrap_or_default(),
                            max: column.iter().copied().max().unwrap_or_default(),
                        }
                    })
                    .collect();

                GroupSummary {
                    row_count: samples.group_rows(&group).count(),
                    group,
                    indicators,
                }
            })
            .collect();

        GenerationSummary {
            total_rows: samples.len(),
            groups,
        }
    }
}

/// Mean of one indicator within a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorMean {
    pub indicator: String,
    pub mean: f64,
}

/// Aggregate record for one age group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupAggregate {
    pub group: String,
    pub row_count: usize,
    /// Means in indicator (header) order
    pub means: Vec<IndicatorMean>,
}

impl GroupAggregate {
    pub fn labels(&self) -> Vec<&str> {
        self.means.iter().map(|m| m.indicator.as_str()).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.means.iter().map(|m| m.mean).collect()
    }

    pub fn mean_of(&self, indicator: &str) -> Option<f64> {
        self.means
            .iter()
            .find(|m| m.indicator == indicator)
            .map(|m| m.mean)
    }
}

/// Target versus achieved values for one indicator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSummary {
    pub indicator: String,
    pub target: Option<f64>,
    pub achieved: f64,
    pub min: i32,
    pub max: i32,
}

impl IndicatorSummary {
    pub fn deviation(&self) -> Option<f64> {
        self.target.map(|t| self.achieved - t)
    }
}

/// Summary of one generated group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSummary {
    pub group: String,
    pub row_count: usize,
    pub indicators: Vec<IndicatorSummary>,
}

/// Summary of a generator run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub total_rows: usize,
    pub groups: Vec<GroupSummary>,
}

impl GenerationSummary {
    /// Largest absolute distance between achieved and target means
    pub fn max_deviation(&self) -> f64 {
        self.groups
            .iter()
            .flat_map(|g| &g.indicators)
            .filter_map(|i| i.deviation())
            .fold(0.0_f64, |acc, d| acc.max(d.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SurveyConfig;
    use crate::simulation::generate_sample_data;
    use crate::utils::csv_io::{parse_survey_table, SurveyRecord};

    fn table() -> SurveyTable {
        SurveyTable {
            indicators: vec!["抑郁值".into(), "焦虑值".into()],
            records: vec![
                SurveyRecord { group: "10-18岁".into(), values: vec![2.0, 5.0] },
                SurveyRecord { group: "18-22岁".into(), values: vec![1.0, 1.0] },
                SurveyRecord { group: "10-18岁".into(), values: vec![4.0, 2.0] },
            ],
        }
    }

    #[test]
    fn test_group_mean() {
        let aggregate = MetricsCalculator::group_means(&table(), "10-18岁").unwrap();

        assert_eq!(aggregate.row_count, 2);
        assert_eq!(aggregate.mean_of("抑郁值"), Some(3.0));
        assert_eq!(aggregate.mean_of("焦虑值"), Some(3.5));
        assert_eq!(aggregate.labels(), vec!["抑郁值", "焦虑值"]);
    }

    #[test]
    fn test_group_labels_match_exactly() {
        assert!(MetricsCalculator::group_means(&table(), "10-18").is_none());
        assert!(MetricsCalculator::group_means(&table(), "10-18岁 ").is_none());
    }

    #[test]
    fn test_aggregate_skips_absent_groups() {
        let groups: Vec<String> = vec!["10-18岁".into(), "22-30岁".into(), "18-22岁".into()];
        let aggregates = MetricsCalculator::aggregate_groups(&table(), &groups);

        let names: Vec<&str> = aggregates.iter().map(|a| a.group.as_str()).collect();
        assert_eq!(names, vec!["10-18岁", "18-22岁"]);
    }

    #[test]
    fn test_table_without_indicators() {
        let table = parse_survey_table("年龄段\n10-18岁\n").unwrap();
        assert!(MetricsCalculator::group_means(&table, "10-18岁").is_none());
    }

    #[test]
    fn test_generation_summary() {
        let config = SurveyConfig {
            sample_size: Some(150),
            seed: Some(5),
            ..Default::default()
        };
        let samples = generate_sample_data(&config).unwrap();
        let summary = MetricsCalculator::generation_summary(&samples, &config.target_averages);

        assert_eq!(summary.total_rows, 450);
        assert_eq!(summary.groups.len(), 3);
        assert_eq!(summary.groups[1].group, "18-22岁");
        assert_eq!(summary.groups[1].row_count, 150);

        let first = &summary.groups[0].indicators[0];
        assert_eq!(first.target, Some(3.0));
        assert!(first.min >= 1 && first.max <= 5);
        assert!(summary.max_deviation() < 0.3);
    }
}
