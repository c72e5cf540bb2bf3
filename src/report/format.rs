//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the fitting code stays clean and testable
//! - output changes are localized

use crate::data::summary::Summary;
use crate::domain::{FitMetrics, FitReportFile, FitResult, GroupFit, ModelKind, ModelParams, SkippedGroup};
use crate::io::ingest::IngestedData;

/// Row errors listed before the rest are elided.
const MAX_ROW_ERRORS_SHOWN: usize = 5;

/// Dataset header: row counts, column mapping and rejected rows.
pub fn format_ingest(ingest: &IngestedData, source: &str) -> String {
    let mut out = String::new();

    out.push_str("=== mfit - Microbial Growth Fit ===\n");
    out.push_str(&format!("Input: {source}\n"));
    out.push_str(&format!(
        "Rows: {} used / {} read ({} rejected)\n",
        ingest.rows_used(),
        ingest.lines_read,
        ingest.row_errors.len()
    ));
    out.push_str(&format!("Columns: {}\n", ingest.columns.join(", ")));

    let missing = ingest.mapping.missing();
    if !missing.is_empty() {
        out.push_str(&format!("Unmapped fields: {}\n", missing.join(", ")));
    }

    for err in ingest.row_errors.iter().take(MAX_ROW_ERRORS_SHOWN) {
        out.push_str(&format!("  line {}: {}\n", err.line, err.message));
    }
    if ingest.row_errors.len() > MAX_ROW_ERRORS_SHOWN {
        out.push_str(&format!(
            "  ... {} more\n",
            ingest.row_errors.len() - MAX_ROW_ERRORS_SHOWN
        ));
    }
    out.push('\n');

    out
}

/// Per-column descriptive statistics.
pub fn format_summary(summary: &Summary) -> String {
    let mut out = String::new();
    out.push_str(&format!("Summary ({} rows):\n", summary.total_rows));

    if summary.column_stats.is_empty() {
        out.push_str("  (no numeric columns)\n");
        return out;
    }

    push_line(
        &mut out,
        format!(
            "{:<16} {:>6} {:>12} {:>12} {:>12} {:>12}",
            "column", "count", "mean", "std", "min", "max"
        ),
    );
    push_line(
        &mut out,
        format!("{:-<16} {:-<6} {:-<12} {:-<12} {:-<12} {:-<12}", "", "", "", "", "", ""),
    );
    for c in &summary.column_stats {
        push_line(
            &mut out,
            format!(
                "{:<16} {:>6} {:>12} {:>12} {:>12} {:>12}",
                truncate(&c.column, 16),
                c.count,
                fmt_num(c.mean),
                fmt_num(c.std),
                fmt_num(c.min),
                fmt_num(c.max)
            ),
        );
    }

    out
}

/// Fit diagnostics: per-group parameters and metrics, skipped groups, means.
pub fn format_fit(fit: &FitResult) -> String {
    let mut out = format_fit_body(fit.model, &fit.groups, &fit.skipped, &fit.metrics);
    out.push_str(&format!("Fitted rows: {}\n", fit.fitted_data.len()));
    out
}

/// A saved fit report, as printed by `mfit show`.
pub fn format_report_file(report: &FitReportFile) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Report: {} ({}), generated {}\n",
        report.source,
        report.tool,
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format_fit_body(report.model, &report.groups, &report.skipped, &report.metrics));
    out.push_str(&format!("Fitted rows: {}\n", report.fitted_rows));
    out
}

fn format_fit_body(model: ModelKind, groups: &[GroupFit], skipped: &[SkippedGroup], metrics: &FitMetrics) -> String {
    let mut out = String::new();

    out.push_str(&format!("Model: {} ({})\n", model.display_name(), model.label()));
    if model.is_simulated() {
        out.push_str("  note: simulated baseline; values are the observed data plus bounded noise\n");
    }
    out.push('\n');

    push_line(
        &mut out,
        format!(
            "{:>8} {:>5} {:<44} {:>10} {:>10} {:>8}",
            "temp", "n", "parameters", "rmse", "mae", "r2"
        ),
    );
    push_line(
        &mut out,
        format!("{:->8} {:->5} {:-<44} {:->10} {:->10} {:->8}", "", "", "", "", "", ""),
    );
    for g in groups {
        push_line(
            &mut out,
            format!(
                "{:>8} {:>5} {:<44} {:>10} {:>10} {:>8.4}",
                fmt_num(g.temperature),
                format!("{}/{}", g.n_valid, g.n_rows),
                truncate(&format_params(&g.params), 44),
                fmt_num(g.metrics.rmse),
                fmt_num(g.metrics.mae),
                g.metrics.r2
            ),
        );
    }

    for s in skipped {
        out.push_str(&format!("  (skipped {}) {}\n", fmt_num(s.temperature), s.reason));
    }

    out.push_str(&format!(
        "\nMean over {} group(s): RMSE={} MAE={} R2={:.4}\n",
        groups.len(),
        fmt_num(metrics.rmse),
        fmt_num(metrics.mae),
        metrics.r2
    ));

    out
}

/// One-line rendering of a group's parameters.
pub fn format_params(params: &ModelParams) -> String {
    match params {
        ModelParams::Linear { slope, intercept } => {
            format!("slope={} intercept={}", fmt_num(*slope), fmt_num(*intercept))
        }
        ModelParams::Weibull { delta, p, n_max, n_min } => format!(
            "delta={} p={} Nmax={} Nmin={}",
            fmt_num(*delta),
            fmt_num(*p),
            fmt_num(*n_max),
            fmt_num(*n_min)
        ),
        ModelParams::Knn { k } => format!("k={k}"),
        ModelParams::Simulated { noise_bound, seed } => {
            format!("noise=±{:.0}% seed={seed}", noise_bound * 100.0)
        }
    }
}

fn push_line(out: &mut String, line: String) {
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Compact number: fixed point in the usual range, scientific otherwise.
fn fmt_num(v: f64) -> String {
    if !v.is_finite() {
        return format!("{v}");
    }
    let a = v.abs();
    if a != 0.0 && !(1e-3..1e6).contains(&a) {
        format!("{v:.3e}")
    } else if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.4}")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::summary::ColumnStats;
    use crate::io::ingest::parse;

    #[test]
    fn number_formatting() {
        assert_eq!(fmt_num(20.0), "20");
        assert_eq!(fmt_num(0.5), "0.5000");
        assert_eq!(fmt_num(2.5e7), "2.500e7");
        assert_eq!(fmt_num(f64::NAN), "NaN");
        assert_eq!(truncate("temperature_celsius", 8), "tempera.");
    }

    #[test]
    fn params_are_rendered_per_model() {
        let w = ModelParams::Weibull {
            delta: 8.0,
            p: 1.2,
            n_max: 100.0,
            n_min: 2.0,
        };
        assert_eq!(format_params(&w), "delta=8 p=1.2000 Nmax=100 Nmin=2");
        assert_eq!(format_params(&ModelParams::Knn { k: 3 }), "k=3");
        assert_eq!(
            format_params(&ModelParams::Simulated {
                noise_bound: 0.04,
                seed: 7
            }),
            "noise=±4% seed=7"
        );
    }

    #[test]
    fn ingest_header_lists_rejected_rows() {
        let ingest = parse("Time,Temp,CFU\n0,20,1\n1,20\n2,20,3\n").unwrap();
        let text = format_ingest(&ingest, "growth.csv");
        assert!(text.contains("Rows: 2 used / 3 read (1 rejected)"));
        assert!(text.contains("line 3:"));
    }

    #[test]
    fn summary_table_has_one_line_per_column() {
        let summary = Summary {
            total_rows: 3,
            column_stats: vec![ColumnStats {
                column: "time".into(),
                count: 3,
                mean: 1.0,
                std: 0.5,
                min: 0.0,
                max: 2.0,
            }],
        };
        let text = format_summary(&summary);
        assert!(text.starts_with("Summary (3 rows):"));
        assert_eq!(text.lines().count(), 4);
        assert!(text.lines().all(|l| l == l.trim_end()));
    }
}
