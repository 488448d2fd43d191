//! CSV reading and writing for survey data
//!
//! Files carry a header row with one column per indicator plus the
//! `年龄段` group column. Written files start with a UTF-8 BOM; reading
//! tolerates one.

use crate::config::columns::GROUP_COLUMN;
use crate::error::{Result, SurveyError};
use crate::simulation::SampleSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

const UTF8_BOM: &str = "\u{feff}";

/// One row read back from a survey CSV
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyRecord {
    pub group: String,
    /// One value per indicator, in header order
    pub values: Vec<f64>,
}

/// Survey data as read by the report builder
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurveyTable {
    /// Indicator columns in header order
    pub indicators: Vec<String>,
    pub records: Vec<SurveyRecord>,
}

impl SurveyTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct group labels in first-seen order
    pub fn groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = Vec::new();
        for record in &self.records {
            if !groups.contains(&record.group) {
                groups.push(record.group.clone());
            }
        }
        groups
    }
}

/// Write samples as CSV to any writer (no BOM)
pub fn write_samples_to<W: Write>(writer: W, samples: &SampleSet) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let header = samples
        .indicators
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(GROUP_COLUMN));
    csv_writer.write_record(header)?;

    for row in &samples.rows {
        let mut record: Vec<String> = row.scores.iter().map(|s| s.to_string()).collect();
        record.push(row.group.clone());
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Write samples to a CSV file with a UTF-8 BOM
pub fn write_samples(path: &Path, samples: &SampleSet) -> Result<()> {
    if samples.is_empty() {
        return Err(SurveyError::InvalidConfig("no rows to write".into()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut buffer = Vec::new();
    buffer.extend_from_slice(UTF8_BOM.as_bytes());
    write_samples_to(&mut buffer, samples)?;

    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(&buffer)?;
    file.flush()?;

    info!("Wrote {} rows to {}", samples.len(), path.display());
    Ok(())
}

/// Parse survey CSV text; a leading BOM is ignored
pub fn parse_survey_table(contents: &str) -> Result<SurveyTable> {
    let contents = contents.strip_prefix(UTF8_BOM).unwrap_or(contents);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(contents.as_bytes());

    let headers = reader.headers()?.clone();
    let group_idx = headers
        .iter()
        .position(|h| h == GROUP_COLUMN)
        .ok_or_else(|| SurveyError::MissingGroupColumn(GROUP_COLUMN.to_string()))?;

    let indicators: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != group_idx)
        .map(|(_, h)| h.to_string())
        .collect();

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        let mut values = Vec::with_capacity(indicators.len());
        for (i, field) in record.iter().enumerate() {
            if i == group_idx {
                continue;
            }
            let value = field.trim().parse::<f64>().map_err(|_| SurveyError::InvalidValue {
                line,
                column: headers.get(i).unwrap_or_default().to_string(),
                value: field.to_string(),
            })?;
            values.push(value);
        }

        records.push(SurveyRecord {
            group: record.get(group_idx).unwrap_or_default().to_string(),
            values,
        });
    }

    debug!("Parsed {} records with {} indicators", records.len(), indicators.len());
    Ok(SurveyTable { indicators, records })
}

/// Read a survey CSV file
pub fn read_survey_table(path: &Path) -> Result<SurveyTable> {
    let contents = fs::read_to_string(path)?;
    let table = parse_survey_table(&contents)?;
    info!("Loaded {} rows from {}", table.len(), path.display());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SurveyConfig;
    use crate::simulation::{generate_sample_data, SampleRow};

    #[test]
    fn test_header_layout() {
        let mut samples = SampleSet::new(vec!["抑郁值".into(), "焦虑值".into()]);
        samples.rows.push(SampleRow { group: "10-18岁".into(), scores: vec![2, 4] });

        let mut out = Vec::new();
        write_samples_to(&mut out, &samples).unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("抑郁值,焦虑值,年龄段"));
        assert_eq!(lines.next(), Some("2,4,10-18岁"));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample_data.csv");

        let config = SurveyConfig::quick_test();
        let samples = generate_sample_data(&config).unwrap();
        write_samples(&path, &samples).unwrap();

        let raw = fs::read(&path).unwrap();
        assert!(raw.starts_with(UTF8_BOM.as_bytes()));

        let table = read_survey_table(&path).unwrap();
        assert_eq!(table.indicators, samples.indicators);
        assert_eq!(table.len(), samples.len());
        for (record, row) in table.records.iter().zip(&samples.rows) {
            assert_eq!(record.group, row.group);
            let expected: Vec<f64> = row.scores.iter().map(|&s| s as f64).collect();
            assert_eq!(record.values, expected);
        }
        assert_eq!(table.groups(), config.age_groups);
    }

    #[test]
    fn test_group_column_anywhere_and_float_values() {
        let table = parse_survey_table("年龄段,抑郁值,幸福感\n18-22岁,2.5,4\n22-30岁, 3 ,1.0\n").unwrap();

        assert_eq!(table.indicators, vec!["抑郁值", "幸福感"]);
        assert_eq!(table.records[0].group, "18-22岁");
        assert_eq!(table.records[0].values, vec![2.5, 4.0]);
        assert_eq!(table.records[1].values, vec![3.0, 1.0]);
    }

    #[test]
    fn test_bom_is_tolerated() {
        let table = parse_survey_table("\u{feff}抑郁值,年龄段\n1,10-18岁\n").unwrap();
        assert_eq!(table.indicators, vec!["抑郁值"]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_missing_group_column() {
        let err = parse_survey_table("抑郁值,焦虑值\n1,2\n").unwrap_err();
        assert!(matches!(err, SurveyError::MissingGroupColumn(_)));
    }

    #[test]
    fn test_non_numeric_value() {
        let err = parse_survey_table("抑郁值,年龄段\nabc,10-18岁\n").unwrap_err();
        match err {
            SurveyError::InvalidValue { line, column, value } => {
                assert_eq!(line, 2);
                assert_eq!(column, "抑郁值");
                assert_eq!(value, "abc");
            }
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_ragged_row_is_an_error() {
        let err = parse_survey_table("抑郁值,年龄段\n1,10-18岁,extra\n").unwrap_err();
        assert!(matches!(err, SurveyError::Csv(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = read_survey_table(Path::new("/nonexistent/sample_data.csv")).unwrap_err();
        assert!(matches!(err, SurveyError::Io(_)));
    }
}
