//! Generated sample rows

/// One synthetic subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleRow {
    /// Age group label
    pub group: String,
    /// One score per indicator, in indicator order
    pub scores: Vec<i32>,
}

/// All rows produced by one generator run
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    /// Indicator names, in column order
    pub indicators: Vec<String>,
    /// Rows, contiguous per group in configured group order
    pub rows: Vec<SampleRow>,
}

impl SampleSet {
    pub fn new(indicators: Vec<String>) -> Self {
        Self {
            indicators,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn indicator_index(&self, indicator: &str) -> Option<usize> {
        self.indicators.iter().position(|i| i == indicator)
    }

    /// Rows belonging to one group
    pub fn group_rows<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a SampleRow> + 'a {
        self.rows.iter().filter(move |row| row.group == group)
    }

    /// Scores of one (group, indicator) column
    pub fn column(&self, group: &str, indicator: &str) -> Vec<i32> {
        match self.indicator_index(indicator) {
            Some(idx) => self.group_rows(group).map(|row| row.scores[idx]).collect(),
            None => Vec::new(),
        }
    }
}
