//! HTML Report Generation
//!
//! One `<h2>` + `<img>` section per non-empty age group, with the
//! composite chart inlined as a base64 PNG data URI.

use crate::analytics::charts::ChartRenderer;
use crate::analytics::metrics::{GroupAggregate, MetricsCalculator};
use crate::error::Result;
use crate::utils::csv_io::read_survey_table;
use anyhow::Context;
use minijinja::{context, Environment};
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const REPORT_TITLE: &str = "不同年龄段的数据分析图形展示";

const REPORT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
<meta charset="UTF-8">
<title>{{ title }}</title>
<style>
    body { font-family: "Microsoft YaHei", "PingFang SC", "SimHei", sans-serif; margin: 2rem; color: #222; }
    .meta { color: #888; font-size: 0.85rem; }
    table.means { border-collapse: collapse; margin: 0.5rem 0 1rem; }
    table.means th, table.means td { border: 1px solid #ddd; padding: 0.25rem 0.75rem; text-align: right; }
    img { max-width: 100%; }
</style>
</head>
<body>
<h1>{{ title }}</h1>
<p class="meta">Generated {{ timestamp }}</p>
{% for section in sections %}
<h2>{{ section.group }}</h2>
<p class="meta">n = {{ section.row_count }}</p>
<table class="means">
<tr>{% for m in section.means %}<th>{{ m.indicator }}</th>{% endfor %}</tr>
<tr>{% for m in section.means %}<td>{{ m.mean }}</td>{% endfor %}</tr>
</table>
<img src="data:image/png;base64,{{ section.image|safe }}" /><br/>
{% endfor %}
</body>
</html>
"#;

#[derive(Debug, Serialize)]
struct MeanCell<'a> {
    indicator: &'a str,
    mean: String,
}

#[derive(Debug, Serialize)]
struct Section<'a> {
    group: &'a str,
    row_count: usize,
    means: Vec<MeanCell<'a>>,
    image: String,
}

/// Render the report document for already aggregated groups
pub fn build_report_html(aggregates: &[GroupAggregate], renderer: &ChartRenderer) -> Result<String> {
    let sections = aggregates
        .iter()
        .map(|aggregate| {
            let image = renderer.render_base64(aggregate)?;
            info!("Rendered charts for {} ({} rows)", aggregate.group, aggregate.row_count);
            Ok(Section {
                group: &aggregate.group,
                row_count: aggregate.row_count,
                means: aggregate
                    .means
                    .iter()
                    .map(|m| MeanCell {
                        indicator: &m.indicator,
                        mean: format!("{:.2}", m.mean),
                    })
                    .collect(),
                image,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut env = Environment::new();
    env.add_template("report.html", REPORT_TEMPLATE)?;
    let html = env.get_template("report.html")?.render(context! {
        title => REPORT_TITLE,
        timestamp => chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        sections => sections,
    })?;

    Ok(html)
}

/// Read the survey CSV, chart every listed group that has rows, and write the report
pub fn generate_report(
    csv_path: &Path,
    groups: &[String],
    renderer: &ChartRenderer,
    output_path: &Path,
) -> anyhow::Result<PathBuf> {
    let table = read_survey_table(csv_path)
        .with_context(|| format!("Failed to read survey data from {}", csv_path.display()))?;

    let aggregates = MetricsCalculator::aggregate_groups(&table, groups);
    if aggregates.is_empty() {
        warn!("None of the {} requested groups has rows in {}", groups.len(), csv_path.display());
    }

    write_report(&aggregates, renderer, output_path)
}

/// Chart already aggregated groups and write the report; nothing is written if rendering fails
pub fn write_report(
    aggregates: &[GroupAggregate],
    renderer: &ChartRenderer,
    output_path: &Path,
) -> anyhow::Result<PathBuf> {
    let html = build_report_html(aggregates, renderer)?;

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(output_path).context("Failed to create report file")?;
    file.write_all(html.as_bytes())
        .context("Failed to write report file")?;

    info!("Report generated: {} ({} sections)", output_path.display(), aggregates.len());
    Ok(output_path.to_path_buf())
}
