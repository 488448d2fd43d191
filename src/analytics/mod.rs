//! Aggregation, chart rendering and report generation

pub mod charts;
pub mod logger;
pub mod metrics;
pub mod report;

pub use charts::{ChartKind, ChartRenderer};
pub use logger::SurveyLogger;
pub use metrics::{GenerationSummary, GroupAggregate, MetricsCalculator};
pub use report::{build_report_html, generate_report, write_report};
