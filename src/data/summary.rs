//! Descriptive statistics per numeric column.
//!
//! Used for the terminal summary and as context for the chat relay.

use serde::{Deserialize, Serialize};

use crate::domain::{MICROBE_FITTED, Row};
use crate::math::{mean, population_std};

/// A column counts as numeric when at least this fraction of its non-empty
/// values are numbers.
pub const NUMERIC_FRACTION: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub column: String,
    /// Number of numeric values the stats were computed from.
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation (divides by `count`).
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_rows: usize,
    pub column_stats: Vec<ColumnStats>,
}

impl Summary {
    pub fn column(&self, name: &str) -> Option<&ColumnStats> {
        self.column_stats.iter().find(|c| c.column == name)
    }
}

#[derive(Default)]
struct ColumnAcc {
    non_empty: usize,
    values: Vec<f64>,
}

/// Summarize a row set. Columns appear in first-seen order.
pub fn summarize(rows: &[Row]) -> Summary {
    let mut order: Vec<String> = Vec::new();
    let mut acc: Vec<ColumnAcc> = Vec::new();

    let mut record = |name: &str, value: Option<f64>, non_empty: bool| {
        let idx = match order.iter().position(|c| c == name) {
            Some(i) => i,
            None => {
                order.push(name.to_string());
                acc.push(ColumnAcc::default());
                order.len() - 1
            }
        };
        if non_empty {
            acc[idx].non_empty += 1;
        }
        if let Some(v) = value {
            acc[idx].values.push(v);
        }
    };

    for row in rows {
        for (name, value) in row.fields() {
            record(name, value.as_finite(), !value.is_empty());
        }
        if let Some(fitted) = row.microbe_fitted() {
            record(MICROBE_FITTED, Some(fitted), true);
        }
    }

    let column_stats = order
        .into_iter()
        .zip(acc)
        .filter_map(|(column, acc)| column_stats(column, &acc))
        .collect();

    Summary {
        total_rows: rows.len(),
        column_stats,
    }
}

fn column_stats(column: String, acc: &ColumnAcc) -> Option<ColumnStats> {
    let values = &acc.values;
    if values.is_empty() {
        return None;
    }
    if (values.len() as f64) < NUMERIC_FRACTION * acc.non_empty as f64 {
        return None;
    }

    let mean = mean(values)?;
    let std = population_std(values)?;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(ColumnStats {
        column,
        count: values.len(),
        mean,
        std,
        min,
        max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ingest::parse;

    #[test]
    fn population_statistics_per_column() {
        let data = parse("time,temperature,microbe,note\n0,20,2,a\n1,20,4,b\n2,20,4,c\n3,20,6,d\n").unwrap();
        let summary = summarize(&data.rows);

        assert_eq!(summary.total_rows, 4);
        let microbe = summary.column("microbe").unwrap();
        assert_eq!(microbe.count, 4);
        assert!((microbe.mean - 4.0).abs() < 1e-12);
        // Population variance = (4 + 0 + 0 + 4) / 4 = 2.
        assert!((microbe.std - 2.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(microbe.min, 2.0);
        assert_eq!(microbe.max, 6.0);

        let temperature = summary.column("temperature").unwrap();
        assert_eq!(temperature.std, 0.0);

        assert!(summary.column("note").is_none());
        let names: Vec<&str> = summary.column_stats.iter().map(|c| c.column.as_str()).collect();
        assert_eq!(names, vec!["time", "temperature", "microbe"]);
    }

    #[test]
    fn mostly_numeric_columns_are_kept() {
        // 4 of 5 non-empty values numeric (80%): kept. Empty cells do not count.
        let text = "time,microbe\n0,1\n1,2\n2,3\n3,4\n4,n/a\n5,\n";
        let summary = summarize(&parse(text).unwrap().rows);
        let microbe = summary.column("microbe").unwrap();
        assert_eq!(microbe.count, 4);
        assert!((microbe.mean - 2.5).abs() < 1e-12);

        // 1 of 3 numeric: dropped.
        let text = "time,microbe\n0,1\n1,x\n2,y\n";
        let summary = summarize(&parse(text).unwrap().rows);
        assert!(summary.column("microbe").is_none());
    }

    #[test]
    fn fitted_values_are_summarized() {
        let data = parse("time,microbe\n0,1\n1,3\n").unwrap();
        let fitted: Vec<Row> = data.rows.iter().map(|r| r.with_fitted(2.0)).collect();
        let summary = summarize(&fitted);
        let col = summary.column(MICROBE_FITTED).unwrap();
        assert_eq!(col.count, 2);
        assert_eq!(col.std, 0.0);
    }

    #[test]
    fn empty_row_set() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_rows, 0);
        assert!(summary.column_stats.is_empty());
    }
}
