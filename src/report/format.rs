//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the filtering/fitting code stays clean and testable
//! - output changes are localized (the tests below pin the layout)

use crate::cohort::{FilterSpec, Overlay};
use crate::domain::{CurveFile, KineticParameters, Observation, PARAM_NAMES, VlRecord};
use crate::fit::{FitError, FitOutcome};
use crate::io::ingest::Dataset;
use crate::report::{compute_residuals, worst_residual};

pub const FIT_FAILED_TITLE: &str = "Fit failed for this individual.";

const ORDER_WARNING: &str =
    "warning: breakpoints are out of order (t1 <= t2 <= t3 does not hold); the curve has jumps";

/// Dataset + filter summary printed by `vkx explore`.
pub fn format_dataset_summary(dataset: &Dataset, spec: &FilterSpec, n_filtered: usize, overlay: &Overlay) -> String {
    let mut out = String::new();
    let s = &dataset.stats;

    out.push_str("=== vkx - Viral Kinetics Explorer ===\n");
    out.push_str(&format!(
        "Rows: read={} used={} dropped={} malformed={}\n",
        dataset.rows_read,
        dataset.rows_used,
        dataset.rows_dropped,
        dataset.row_errors.len()
    ));
    out.push_str(&format!(
        "Records: n={} | subjects={} | time=[{:.2}, {:.2}]d | log10 VL=[{:.2}, {:.2}]\n",
        s.n_records,
        s.subjects.len(),
        s.time_min,
        s.time_max,
        s.y_min,
        s.y_max
    ));

    out.push_str("\nFilters:\n");
    match spec.age_range {
        Some((lo, hi)) => out.push_str(&format!("- age window: [{lo}, {hi}]\n")),
        None => out.push_str("- age window: (off)\n"),
    }
    out.push_str(&format!("- studies     : {}\n", fmt_set(spec.studies.as_ref())));
    out.push_str(&format!("- sample types: {}\n", fmt_set(spec.sample_types.as_ref())));
    out.push_str(&format!("Filtered rows: {n_filtered}\n"));

    out.push_str(&format!(
        "\nOverlay: {} subject(s), {} trajectorie(s), {} point(s)\n",
        overlay.subjects.len(),
        overlay.trajectories.len(),
        overlay.point_count()
    ));
    out.push_str(&format!("Y axis: {}\n", overlay.y_label));

    out
}

/// Fixed-width preview of the first `max_rows` filtered rows.
pub fn format_preview(rows: &[&VlRecord], max_rows: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!("Filtered data preview ({} of {} rows):\n", rows.len().min(max_rows), rows.len()));
    push_line(
        &mut out,
        format!(
            "{:<16} {:>9} {:>8} {:<9} {:<10} {:<10} {:<12}",
            "person_id", "time_days", "log10_vl", "age", "study", "sample", "infection"
        ),
    );
    push_line(
        &mut out,
        format!(
            "{:-<16} {:-<9} {:-<8} {:-<9} {:-<10} {:-<10} {:-<12}",
            "", "", "", "", "", "", ""
        ),
    );

    for r in rows.iter().take(max_rows) {
        let age = match (r.age_lo, r.age_hi) {
            (Some(lo), Some(hi)) => format!("{lo}-{hi}"),
            _ => String::new(),
        };
        push_line(
            &mut out,
            format!(
                "{:<16} {:>9.2} {:>8.3} {:<9} {:<10} {:<10} {:<12}",
                truncate(&r.person_id, 16),
                r.time_days,
                r.log10_vl,
                truncate(&age, 9),
                truncate(r.study_id.as_deref().unwrap_or(""), 10),
                truncate(r.sample_type.as_deref().unwrap_or(""), 10),
                truncate(r.infection_id.as_deref().unwrap_or(""), 12),
            ),
        );
    }
    out
}

/// Single-subject fit report printed by `vkx fit`.
pub fn format_fit_report(subject: &str, observations: &[Observation], result: &Result<FitOutcome, FitError>) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== Piecewise linear fit: subject {subject} ===\n"));
    out.push_str(&format!("Observations: n={}", observations.len()));
    if let (Some(first), Some(last)) = (observations.first(), observations.last()) {
        out.push_str(&format!(" | time=[{:.2}, {:.2}]d", first.t, last.t));
    }
    out.push('\n');

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
            out.push_str(&format!("\n{FIT_FAILED_TITLE}\nreason: {err}\n"));
            return out;
        }
    };

    out.push_str("\nParameters:\n");
    out.push_str(&format_params(&outcome.params));
    if !outcome.params.is_ordered() {
        out.push_str(ORDER_WARNING);
        out.push('\n');
    }

    let q = &outcome.quality;
    out.push_str(&format!(
        "\nSSE={:.4} RMSE={:.4} n={} evaluations={}\n",
        q.sse, q.rmse, q.n, q.evaluations
    ));

    if let Ok(residuals) = compute_residuals(observations, &outcome.params) {
        out.push('\n');
        push_line(&mut out, format!("{:>9} {:>9} {:>9} {:>9}", "time_days", "log10_vl", "fitted", "residual"));
        push_line(&mut out, format!("{:-<9} {:-<9} {:-<9} {:-<9}", "", "", "", ""));
        for r in &residuals {
            push_line(
                &mut out,
                format!("{:>9.2} {:>9.3} {:>9.3} {:>9.3}", r.obs.t, r.obs.y, r.fitted, r.residual),
            );
        }
        if let Some(w) = worst_residual(&residuals) {
            out.push_str(&format!("\nLargest |residual|: {:.3} at t={:.2}\n", w.residual.abs(), w.obs.t));
        }
    }

    out
}

/// Header for a saved curve (`vkx plot`).
pub fn format_curve_summary(curve: &CurveFile) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Curve: subject {} (generated {} by {})\n",
        curve.subject,
        curve.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        curve.tool
    ));
    out.push_str(&format_params(&curve.params));
    if !curve.params.is_ordered() {
        out.push_str(ORDER_WARNING);
        out.push('\n');
    }
    out.push_str(&format!("SSE={:.4} RMSE={:.4} n={}\n", curve.fit.sse, curve.fit.rmse, curve.fit.n));
    out
}

fn format_params(p: &KineticParameters) -> String {
    let mut out = String::new();
    for (name, v) in PARAM_NAMES.iter().zip(p.to_array()) {
        out.push_str(&format!("- {name:<2} = {v:>10.4}\n"));
    }
    out.push_str(&format!("- plateau = {:.4}\n", p.plateau()));
    out
}

fn fmt_set(set: Option<&std::collections::BTreeSet<String>>) -> String {
    match set {
        None => "(off)".to_string(),
        Some(s) if s.is_empty() => "(none)".to_string(),
        Some(s) => s.iter().cloned().collect::<Vec<_>>().join(", "),
    }
}

fn push_line(out: &mut String, line: String) {
    out.push_str(line.trim_end());
    out.push('\n');
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FitQuality;

    #[test]
    fn truncate_marks_cut_strings() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd.");
    }

    #[test]
    fn preview_is_trimmed_and_limited() {
        let mut r = VlRecord::new("P1", 2.0, 4.5);
        r.study_id = Some("S1".to_string());
        let records = [r.clone(), r];
        let rows: Vec<&VlRecord> = records.iter().collect();

        let text = format_preview(&rows, 1);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Filtered data preview (1 of 2 rows):");
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[3], "P1                    2.00    4.500           S1");
        assert!(lines.iter().all(|l| !l.ends_with(' ')));
    }

    #[test]
    fn failed_fit_report_uses_failure_title() {
        let obs = [Observation::new(0.0, 1.0)];
        let text = format_fit_report("P9", &obs, &Err(FitError::InsufficientData { n: 1, required: 6 }));
        assert!(text.contains(FIT_FAILED_TITLE));
        assert!(text.contains("insufficient data"));
    }

    #[test]
    fn fit_report_flags_unordered_breakpoints() {
        let obs = [Observation::new(0.0, 1.0), Observation::new(5.0, 2.0)];
        let outcome = FitOutcome {
            params: KineticParameters { t1: 3.0, t2: 1.0, t3: 4.0, y0: 1.0, s1: 1.0, s2: -1.0 },
            quality: FitQuality { sse: 0.5, rmse: 0.5, n: 2, evaluations: 10 },
        };
        let text = format_fit_report("P1", &obs, &Ok(outcome));
        assert!(text.contains("out of order"));
        assert!(text.contains("SSE=0.5000"));
        assert!(text.contains("- t1 =     3.0000"));
        assert!(text.contains("Largest |residual|"));
    }
}
