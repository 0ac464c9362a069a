//! Plain-text rendering for chat replies and the CLI.
//!
//! Renderers only format; they never decide. Whatever partial information
//! a result carries is shown, so an empty ranking still prints the
//! emergencies and the rule outcomes.

use pond_core::AlertLevel;

use crate::aeration::AerationRecommendation;
use crate::engine::DiagnosisReport;
use crate::trend::acidity::TroubleshootingGuide;
use crate::trend::{AcidityFault, CalibrationStatus, TrendResult};
use crate::validation::{ConfusionReport, ImprovementIssue};

/// Candidates listed in the detail view
pub const DETAIL_LIMIT: usize = 5;
const NAME_WIDTH: usize = 40;

fn band(score: f64) -> &'static str {
    if score >= 60.0 {
        "[HIGH]"
    } else if score >= 40.0 {
        "[MED] "
    } else {
        "[LOW] "
    }
}

fn level_marker(level: AlertLevel) -> &'static str {
    match level {
        AlertLevel::Critical => "[!!]",
        AlertLevel::Warning => "[!]",
        AlertLevel::Normal => "[ok]",
        AlertLevel::Unknown => "[?]",
    }
}

// ============================================================================
// Diagnosis
// ============================================================================

/// Farmer-facing summary: emergencies, data, best guess, alternatives.
pub fn render_summary(report: &DiagnosisReport) -> String {
    let mut out = String::new();

    for e in &report.emergencies {
        out.push_str(&format!("*** {} ***\n{}\n{}\n\n", e.title, e.detail, e.action));
    }

    out.push_str("Data summary:\n");
    if report.snapshot.is_empty() {
        out.push_str("  (no rules configured)\n");
    }
    for entry in report.snapshot.entries() {
        let value = report
            .data_values
            .get(&entry.param)
            .map(|v| v.value.as_str())
            .unwrap_or("-");
        out.push_str(&format!("  {}: {}\n", entry.param, value));
    }
    out.push('\n');

    let Some(top) = report.top() else {
        if report.has_emergencies() {
            out.push_str("No diagnosis matched. Handle the emergencies above first.\n");
        } else {
            out.push_str("No problems detected.\n");
        }
        return out;
    };

    out.push_str(&format!(
        "Diagnosis: {} ({}%)\nMatched {}/{} conditions\n",
        top.diagnosis,
        top.confidence(),
        top.matched,
        top.total
    ));

    let runner_ups = report.runner_ups();
    if !runner_ups.is_empty() {
        out.push_str("\nOther possibilities:\n");
        for d in runner_ups {
            out.push_str(&format!("  - {} ({}%)\n", d.short_name(NAME_WIDTH), d.confidence()));
        }
    }

    let active = report.active_conditions();
    if !active.is_empty() {
        out.push_str(&format!("\nActive conditions: {}\n", active.join(", ")));
    }

    out
}

/// Technician view: top candidates with score breakdown and every rule outcome.
pub fn render_detail(report: &DiagnosisReport) -> String {
    let mut out = format!("Config version: {}\n\n", report.config_version);

    out.push_str("Candidates:\n");
    if report.ranked.is_empty() {
        out.push_str("  (none)\n");
    }
    for (i, d) in report.ranked.iter().take(DETAIL_LIMIT).enumerate() {
        out.push_str(&format!(
            "  {}. {} {} score {:.1} | match {:.0}% ({}/{}) | depth {:.2} | prior {:.3}\n",
            i + 1,
            band(d.final_score),
            d.short_name(NAME_WIDTH),
            d.final_score,
            d.match_ratio,
            d.matched,
            d.total,
            d.depth_weight,
            d.prior
        ));
    }

    out.push_str("\nRules:\n");
    for entry in report.snapshot.entries() {
        let value = match (report.data_values.get(&entry.param), entry.missing) {
            (Some(v), _) => format!("{} [{}/{}]", v.value, v.tab, v.column),
            (None, Some(reason)) => format!("({})", reason.as_str()),
            (None, None) => "-".to_string(),
        };
        out.push_str(&format!("  {}: {} -> {}\n", entry.param, value, entry.verdict));
    }

    out
}

// ============================================================================
// Trends
// ============================================================================

pub fn render_trend(instrument: &str, unit: &str, trend: &TrendResult) -> String {
    let Some(current) = trend.current_value else {
        return format!("{} {}\n{}\n", level_marker(trend.alert_level), instrument, trend.recommendation);
    };

    let mut out = format!(
        "{} {} {}: {} {}\n",
        level_marker(trend.alert_level),
        instrument,
        trend.alert_level,
        current,
        unit
    );
    if let Some(slope) = trend.slope {
        out.push_str(&format!(
            "Trend: {:+} {}/{} over {} samples\n",
            slope,
            unit,
            trend.rate_unit.suffix(),
            trend.sample_count
        ));
    }
    if trend.is_fallback {
        if let Some(ts) = trend.data_timestamp {
            out.push_str(&format!(
                "No readings in the last {} h; latest from {}\n",
                trend.window_hours,
                ts.format("%Y-%m-%d %H:%M")
            ));
        }
    }
    out.push_str(&trend.recommendation);
    out.push('\n');
    out
}

pub fn render_calibration(status: &CalibrationStatus) -> String {
    let mut out = render_trend("pH", "pH", &status.trend);
    out.push_str(&format!(
        "\nSensor check: {}\n{}\n",
        status.analysis.fault, status.analysis.message
    ));
    if status.needs_calibration {
        out.push_str("Calibration needed.\n\n");
        out.push_str(&render_guide(status.analysis.fault, status.guide));
    }
    out
}

pub fn render_guide(fault: AcidityFault, guide: &TroubleshootingGuide) -> String {
    let mut out = format!("{} ({} urgency)\n{}\n", fault, guide.urgency, guide.symptom);
    if !guide.causes.is_empty() {
        out.push_str("Possible causes:\n");
        for cause in guide.causes {
            out.push_str(&format!("  - {}\n", cause));
        }
    }
    out.push_str("Steps:\n");
    for step in guide.steps {
        out.push_str(&format!("  {}\n", step));
    }
    out
}

pub fn render_aeration(rec: &AerationRecommendation) -> String {
    let mut out = render_trend("DO", "mg/L", &rec.trend);
    if let Some(d) = &rec.demand {
        out.push_str(&format!(
            "\nAeration for the reference pond:\n  deficit {} kg O2 (target {} mg/L)\n  respiration {} kg O2/h\n  total need {} kg O2\n  recommended aerator power {} HP\n",
            d.oxygen_deficit_kg,
            d.target_do,
            d.hourly_respiration_kg,
            d.total_o2_need_kg,
            d.recommended_aerator_hp
        ));
    }
    out
}

// ============================================================================
// Validation
// ============================================================================

pub fn render_confusion(report: &ConfusionReport) -> String {
    match report {
        ConfusionReport::InsufficientData {
            category_type,
            validated,
            required,
        } => format!(
            "{}: not enough validated predictions yet ({} of {})\n",
            category_type, validated, required
        ),
        ConfusionReport::Success {
            category_type,
            matrix,
            validated,
            metrics,
            improvements,
        } => {
            let mut out = format!("{}: {} validated predictions\n", category_type, validated);

            let width = matrix.categories.iter().map(|c| c.len()).max().unwrap_or(0).max(6);
            out.push_str(&format!("{:width$}", "actual\\pred", width = width + 2));
            for c in &matrix.categories {
                out.push_str(&format!(" {:>width$}", c, width = width));
            }
            out.push('\n');
            for (c, row) in matrix.categories.iter().zip(&matrix.counts) {
                out.push_str(&format!("{:width$}", c, width = width + 2));
                for n in row {
                    out.push_str(&format!(" {:>width$}", n, width = width));
                }
                out.push('\n');
            }

            match metrics {
                Some(m) => {
                    out.push_str(&format!(
                        "\nAccuracy: {} ({}/{})\n",
                        m.accuracy, m.correct, m.total
                    ));
                    for c in &matrix.categories {
                        if let Some(pc) = m.per_class.get(c) {
                            out.push_str(&format!(
                                "  {}: precision {} recall {} f1 {} (n={})\n",
                                c, pc.precision, pc.recall, pc.f1, pc.support
                            ));
                        }
                    }
                }
                None => out.push_str("\nNo validated labels fall inside the category set.\n"),
            }

            if !improvements.is_empty() {
                out.push_str("\nImprovements:\n");
                for i in improvements {
                    let issue = match i.issue {
                        ImprovementIssue::LowPrecision => "precision",
                        ImprovementIssue::LowRecall => "recall",
                    };
                    out.push_str(&format!(
                        "  [{}] {} {} {}: {}\n",
                        i.priority, i.category, issue, i.value, i.suggestion
                    ));
                }
            }
            out
        }
    }
}
