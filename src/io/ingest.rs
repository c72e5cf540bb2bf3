//! CSV ingest and normalization.
//!
//! This module turns an uploaded experiment CSV into typed [`Row`]s with the
//! semantic columns (`time`, `temperature`, `microbe`) normalized from whatever
//! header names the file uses.
//!
//! Design goals:
//! - **Tolerant headers**: synonyms are mapped, unknown columns pass through
//! - **Row-level validation**: misaligned rows are rejected and reported, never padded
//! - **Deterministic behavior**: parsing the same text twice yields identical rows
//! - **Separation of concerns**: no grouping or fitting logic here

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::domain::{MICROBE, Row, TEMPERATURE, TIME, Value};
use crate::error::PipelineError;

/// Header synonyms per semantic field, matched against lowercased, trimmed names.
const TIME_SYNONYMS: [&str; 5] = ["time", "t", "hours", "minute", "min"];
const TEMPERATURE_SYNONYMS: [&str; 4] = ["temperature", "temp", "°c", "c"];
const MICROBE_SYNONYMS: [&str; 6] = ["microbe", "count", "cfu", "concentration", "value", "target"];

/// Synonyms shorter than this are only matched exactly (a bare `c` or `t` would
/// otherwise match almost any header).
const MIN_CONTAINS_LEN: usize = 3;

/// Optional sign, digits, optional decimal point, optional exponent.
static NUMERIC_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").expect("numeric literal pattern is valid")
});

/// Which input column feeds each semantic field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    pub time: Option<usize>,
    pub temperature: Option<usize>,
    pub microbe: Option<usize>,
}

impl ColumnMapping {
    pub fn is_empty(&self) -> bool {
        self.time.is_none() && self.temperature.is_none() && self.microbe.is_none()
    }

    /// Canonical names of the fields that could not be mapped.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.time.is_none() {
            out.push(TIME);
        }
        if self.temperature.is_none() {
            out.push(TEMPERATURE);
        }
        if self.microbe.is_none() {
            out.push(MICROBE);
        }
        out
    }

    fn slot(&mut self, field: Field) -> &mut Option<usize> {
        match field {
            Field::Time => &mut self.time,
            Field::Temperature => &mut self.temperature,
            Field::Microbe => &mut self.microbe,
        }
    }

    fn field_for(&self, column: usize) -> Option<Field> {
        if self.time == Some(column) {
            Some(Field::Time)
        } else if self.temperature == Some(column) {
            Some(Field::Temperature)
        } else if self.microbe == Some(column) {
            Some(Field::Microbe)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Time,
    Temperature,
    Microbe,
}

impl Field {
    const ALL: [Field; 3] = [Field::Time, Field::Temperature, Field::Microbe];

    fn synonyms(self) -> &'static [&'static str] {
        match self {
            Field::Time => &TIME_SYNONYMS,
            Field::Temperature => &TEMPERATURE_SYNONYMS,
            Field::Microbe => &MICROBE_SYNONYMS,
        }
    }

    fn canonical(self) -> &'static str {
        match self {
            Field::Time => TIME,
            Field::Temperature => TEMPERATURE,
            Field::Microbe => MICROBE,
        }
    }
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    /// 1-based line number in the original text.
    pub line: usize,
    pub message: String,
}

/// Ingest output: typed rows + resolved header mapping + row errors.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedData {
    /// Output column names (canonical names for mapped columns).
    pub columns: Vec<String>,
    pub mapping: ColumnMapping,
    pub rows: Vec<Row>,
    pub row_errors: Vec<RowError>,
    /// Non-blank data lines seen after the header.
    pub lines_read: usize,
}

impl IngestedData {
    pub fn rows_used(&self) -> usize {
        self.rows.len()
    }
}

/// Read a CSV file from disk and parse it.
pub fn load_csv(path: &Path) -> Result<IngestedData, PipelineError> {
    let bytes = std::fs::read(path).map_err(|e| PipelineError::io(path, e))?;
    let text = String::from_utf8_lossy(&bytes);
    let data = parse(&text)?;
    info!(
        path = %path.display(),
        rows = data.rows_used(),
        rejected = data.row_errors.len(),
        "loaded CSV"
    );
    Ok(data)
}

/// Parse raw CSV text into typed rows.
pub fn parse(text: &str) -> Result<IngestedData, PipelineError> {
    // Keep original 1-based line numbers for diagnostics.
    let lines: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| (i + 1, l))
        .collect();

    if lines.len() < 2 {
        return Err(PipelineError::Format(
            "expected a header line and at least one data line.".to_string(),
        ));
    }

    let (header_line_no, header_line) = lines[0];
    let header_line = header_line.trim_start_matches('\u{feff}');
    let headers = split_fields(header_line).map_err(|e| {
        PipelineError::Format(format!("unreadable header on line {header_line_no}: {e}"))
    })?;

    let mapping = map_headers(&headers);
    if mapping.is_empty() {
        return Err(PipelineError::Format(format!(
            "header has no recognizable columns (looked for time, temperature, microbe): [{}]",
            headers.join(", ")
        )));
    }
    let missing = mapping.missing();
    if !missing.is_empty() {
        warn!(missing = ?missing, "CSV header is missing semantic columns");
    }

    let columns: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| match mapping.field_for(idx) {
            Some(field) => field.canonical().to_string(),
            None => name.clone(),
        })
        .collect();

    let mut rows = Vec::with_capacity(lines.len() - 1);
    let mut row_errors = Vec::new();

    for &(line, raw) in &lines[1..] {
        let fields = match split_fields(raw) {
            Ok(f) => f,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        if fields.len() != columns.len() {
            debug!(line, found = fields.len(), expected = columns.len(), "rejecting misaligned row");
            row_errors.push(RowError {
                line,
                message: format!(
                    "expected {} fields (header), found {}.",
                    columns.len(),
                    fields.len()
                ),
            });
            continue;
        }

        let mut row = Row::new();
        for (name, field) in columns.iter().zip(fields) {
            row.push(name.clone(), coerce(field));
        }
        rows.push(row);
    }

    if !row_errors.is_empty() {
        warn!(rejected = row_errors.len(), "some CSV rows were rejected");
    }

    Ok(IngestedData {
        columns,
        mapping,
        rows,
        row_errors,
        lines_read: lines.len() - 1,
    })
}

/// Split one line on commas, honoring double quotes (a quoted comma is not a delimiter).
fn split_fields(line: &str) -> Result<Vec<String>, csv::Error> {
    let line = tighten_delimiters(line);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(line.as_bytes());

    match reader.records().next() {
        Some(record) => Ok(record?.iter().map(str::to_string).collect()),
        None => Ok(Vec::new()),
    }
}

/// Drop unquoted blanks around commas so a quote after `", "` still opens a
/// quoted field for the csv reader. Every `"` toggles the quoted state.
fn tighten_delimiters(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_quotes = false;
    for ch in line.trim().chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                out.push(ch);
            }
            ',' if !in_quotes => {
                let kept = out.trim_end_matches([' ', '\t']).len();
                out.truncate(kept);
                out.push(',');
            }
            ' ' | '\t' if !in_quotes && out.ends_with(',') => {}
            _ => out.push(ch),
        }
    }
    out
}

fn map_headers(headers: &[String]) -> ColumnMapping {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header_name(h)).collect();
    let mut mapping = ColumnMapping::default();
    let mut taken = vec![false; normalized.len()];

    // Pass 1: exact synonym matches.
    for (idx, name) in normalized.iter().enumerate() {
        for field in Field::ALL {
            let slot = mapping.slot(field);
            if slot.is_none() && field.synonyms().contains(&name.as_str()) {
                *slot = Some(idx);
                taken[idx] = true;
                break;
            }
        }
    }

    // Pass 2: decorated headers such as `Temperature (°C)` or `cfu/ml`.
    for (idx, name) in normalized.iter().enumerate() {
        if taken[idx] {
            continue;
        }
        for field in Field::ALL {
            let slot = mapping.slot(field);
            if slot.is_some() {
                continue;
            }
            let hit = field
                .synonyms()
                .iter()
                .filter(|s| s.chars().count() >= MIN_CONTAINS_LEN)
                .any(|s| name.contains(s));
            if hit {
                *slot = Some(idx);
                taken[idx] = true;
                break;
            }
        }
    }

    mapping
}

fn normalize_header_name(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').to_lowercase()
}

fn coerce(field: String) -> Value {
    if NUMERIC_LITERAL.is_match(&field) {
        if let Ok(v) = field.parse::<f64>() {
            if v.is_finite() {
                return Value::Number(v);
            }
        }
    }
    Value::Text(field)
}
