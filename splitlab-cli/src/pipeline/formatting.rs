//! Output Formatting
//!
//! Human-readable output formatting for analysis reports.
//!
//! Generates terminal-friendly output with:
//! - Guardrail results with status icons (✓/✗/⊘)
//! - Per-variant counts, rates and means
//! - Significance table with lift, statistic, p-value and CI
//! - CUPED, bootstrap and power sections when present

use splitlab_logic::GuardrailStatus;
use splitlab_report::Report;
use splitlab_stats::SignificanceResult;

/// Placeholder for undefined values
const NULL: &str = "-";

/// Format a report for human-readable terminal display
pub fn format_human_output(report: &Report) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("Splitlab Experiment Analysis\n");
    output.push_str(&"=".repeat(60));
    output.push_str("\n\n");

    // Guardrails
    output.push_str("Guardrails\n");
    output.push_str(&"-".repeat(60));
    output.push('\n');
    for check in &report.guardrails.checks {
        let icon = match check.status {
            GuardrailStatus::Passed => "✓",
            GuardrailStatus::Failed => "✗",
            GuardrailStatus::Skipped { .. } => "⊘",
        };
        output.push_str(&format!("  {} {:<16} {}\n", icon, check.id, check.message));
    }
    output.push('\n');

    // Variants
    output.push_str("Variants\n");
    output.push_str(&"-".repeat(60));
    output.push('\n');
    for v in &report.variants {
        output.push_str(&format!(
            "  {}  users: {}  converters: {}  conversion: {}\n",
            v.variant,
            v.users,
            v.converters,
            fmt_pct(v.conversion_rate)
        ));
        output.push_str(&format!(
            "     volume mean: {}  variance: {}  events mean: {}\n",
            fmt_num(v.mean_volume),
            fmt_num(v.variance_volume),
            fmt_num(v.mean_events)
        ));
        let retention: Vec<String> = v
            .retention
            .iter()
            .map(|r| format!("d{}: {}", r.day, fmt_pct(r.rate)))
            .collect();
        if !retention.is_empty() {
            output.push_str(&format!("     retention {}\n", retention.join("  ")));
        }
    }
    output.push('\n');

    // Significance
    output.push_str("Significance (B vs A)\n");
    output.push_str(&"-".repeat(60));
    output.push('\n');
    for result in &report.significance {
        push_significance(&mut output, result);
    }
    if let Some(cuped) = &report.cuped {
        push_significance(&mut output, &cuped.result);
        output.push_str(&format!(
            "      CUPED theta: {:.4}  variance reduction: {}\n",
            cuped.theta,
            fmt_pct(cuped.variance_reduction)
        ));
    }
    output.push('\n');

    // Bootstrap
    if !report.bootstrap.is_empty() {
        output.push_str("Bootstrap intervals\n");
        output.push_str(&"-".repeat(60));
        output.push('\n');
        for b in &report.bootstrap {
            output.push_str(&format!(
                "  {:<16} {:<4} {:.4}  {:.0}% CI: [{:.4}, {:.4}]\n",
                b.metric,
                b.scope.as_str(),
                b.point_estimate,
                b.level * 100.0,
                b.lower,
                b.upper
            ));
        }
        output.push('\n');
    }

    // Power
    if !report.power.is_empty() {
        output.push_str("Power\n");
        output.push_str(&"-".repeat(60));
        output.push('\n');
        for p in &report.power {
            let required = p
                .required_n_per_arm
                .map(|n| n.to_string())
                .unwrap_or_else(|| NULL.to_string());
            output.push_str(&format!(
                "  {:<16} MDE: {} ({} rel)  n/arm for {:.1}%: {}  power: {}\n",
                p.metric_name,
                fmt_num(p.mde_absolute),
                fmt_pct(p.mde_relative),
                p.target_relative_mde * 100.0,
                required,
                fmt_pct(p.achieved_power)
            ));
        }
        output.push('\n');
    }

    // Summary
    let summary = &report.summary;
    output.push_str(&format!(
        "Summary: {} users, {} guardrail failure(s), significant: [{}]\n",
        summary.users,
        summary.guardrail_failures,
        summary.significant_metrics.join(", ")
    ));
    if !summary.trustworthy {
        output.push_str("  ⚠ Guardrails failed: do not act on the significance results\n");
    }

    output
}

fn push_significance(output: &mut String, r: &SignificanceResult) {
    let marker = match r.significant {
        Some(true) => "*",
        Some(false) => " ",
        None => "?",
    };
    output.push_str(&format!(
        "  {} {:<16} A: {}  B: {}  lift: {} ({})\n",
        marker,
        r.metric_name,
        fmt_num(r.estimate_a),
        fmt_num(r.estimate_b),
        fmt_num(r.abs_lift),
        fmt_pct(r.rel_lift)
    ));
    output.push_str(&format!(
        "      {}: {}  p: {}  CI: [{}, {}]\n",
        r.test,
        fmt_num(r.test_statistic),
        r.p_value
            .map(|p| format!("{:.4}", p))
            .unwrap_or_else(|| NULL.to_string()),
        fmt_num(r.ci_lower),
        fmt_num(r.ci_upper)
    ));
}

fn fmt_num(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.4}", v))
        .unwrap_or_else(|| NULL.to_string())
}

fn fmt_pct(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}%", v * 100.0))
        .unwrap_or_else(|| NULL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_formatting() {
        assert_eq!(fmt_num(None), "-");
        assert_eq!(fmt_num(Some(0.5)), "0.5000");
        assert_eq!(fmt_pct(Some(0.025)), "2.50%");
    }
}
