//! CSV Output
//!
//! One long-format table, `section,metric,scope,field,value`, so every
//! record type fits the same five columns. Undefined values are empty cells.

use crate::report::Report;
use splitlab_stats::SignificanceResult;

const HEADER: &str = "section,metric,scope,field,value";

/// Generate the flat CSV table for a report
pub fn generate_csv_report(report: &Report) -> String {
    let mut rows = CsvRows::default();

    let g = &report.guardrails;
    rows.push("guardrail", "srm", "", "users_a", Some(g.users_a as f64));
    rows.push("guardrail", "srm", "", "users_b", Some(g.users_b as f64));
    rows.push("guardrail", "srm", "", "z", g.srm_z);
    rows.push("guardrail", "srm", "", "chi2", g.srm_chi2);
    rows.push("guardrail", "srm", "", "p_value", g.srm_p_value);
    rows.push_bool("guardrail", "srm", "", "pass", Some(g.srm_pass));
    rows.push(
        "guardrail",
        "contamination",
        "",
        "count",
        Some(g.contamination_count as f64),
    );
    rows.push_bool("guardrail", "contamination", "", "pass", Some(g.contamination_pass));
    rows.push_bool("guardrail", "exposure_window", "", "pass", Some(g.exposure_equal_pass));

    for v in &report.variants {
        let scope = v.variant.as_str();
        rows.push("variant", "users", scope, "value", Some(v.users as f64));
        rows.push("variant", "converters", scope, "value", Some(v.converters as f64));
        rows.push("variant", "conversion_rate", scope, "value", v.conversion_rate);
        rows.push("variant", "volume", scope, "mean", v.mean_volume);
        rows.push("variant", "volume", scope, "variance", v.variance_volume);
        rows.push("variant", "events", scope, "mean", v.mean_events);
        for r in &v.retention {
            let metric = format!("retention_d{}", r.day);
            rows.push("variant", &metric, scope, "value", r.rate);
        }
    }

    for result in &report.significance {
        push_significance(&mut rows, "significance", result);
    }

    if let Some(cuped) = &report.cuped {
        rows.push("cuped", &cuped.metric, "", "theta", Some(cuped.theta));
        rows.push("cuped", &cuped.metric, "", "variance_raw", cuped.variance_raw);
        rows.push("cuped", &cuped.metric, "", "variance_adjusted", cuped.variance_adjusted);
        rows.push(
            "cuped",
            &cuped.metric,
            "",
            "variance_reduction",
            cuped.variance_reduction,
        );
        push_significance(&mut rows, "cuped", &cuped.result);
    }

    for b in &report.bootstrap {
        let scope = b.scope.as_str();
        rows.push("bootstrap", &b.metric, scope, "estimate", Some(b.point_estimate));
        rows.push("bootstrap", &b.metric, scope, "ci_lower", Some(b.lower));
        rows.push("bootstrap", &b.metric, scope, "ci_upper", Some(b.upper));
    }

    for p in &report.power {
        rows.push("power", &p.metric_name, "", "mde_absolute", p.mde_absolute);
        rows.push("power", &p.metric_name, "", "mde_relative", p.mde_relative);
        rows.push(
            "power",
            &p.metric_name,
            "",
            "required_n_per_arm",
            p.required_n_per_arm.map(|n| n as f64),
        );
        rows.push("power", &p.metric_name, "", "achieved_power", p.achieved_power);
    }

    rows.push_bool("summary", "trustworthy", "", "value", Some(report.summary.trustworthy));

    rows.finish()
}

fn push_significance(rows: &mut CsvRows, section: &str, r: &SignificanceResult) {
    let metric = r.metric_name.as_str();
    rows.push(section, metric, "A", "estimate", r.estimate_a);
    rows.push(section, metric, "B", "estimate", r.estimate_b);
    rows.push(section, metric, "B-A", "abs_lift", r.abs_lift);
    rows.push(section, metric, "B-A", "rel_lift", r.rel_lift);
    rows.push(section, metric, "B-A", "statistic", r.test_statistic);
    rows.push(section, metric, "B-A", "df", r.degrees_of_freedom);
    rows.push(section, metric, "B-A", "p_value", r.p_value);
    rows.push(section, metric, "B-A", "ci_lower", r.ci_lower);
    rows.push(section, metric, "B-A", "ci_upper", r.ci_upper);
    rows.push(section, metric, "B-A", "alpha", Some(r.decision_threshold));
    rows.push_bool(section, metric, "B-A", "significant", r.significant);
}

#[derive(Default)]
struct CsvRows {
    lines: Vec<String>,
}

impl CsvRows {
    fn push(&mut self, section: &str, metric: &str, scope: &str, field: &str, value: Option<f64>) {
        let cell = value.map(|v| v.to_string()).unwrap_or_default();
        self.lines.push(format!(
            "{},{},{},{},{}",
            escape_csv(section),
            escape_csv(metric),
            escape_csv(scope),
            escape_csv(field),
            cell
        ));
    }

    fn push_bool(&mut self, section: &str, metric: &str, scope: &str, field: &str, value: Option<bool>) {
        self.push(section, metric, scope, field, value.map(|b| if b { 1.0 } else { 0.0 }));
    }

    fn finish(self) -> String {
        let mut output = String::from(HEADER);
        output.push('\n');
        for line in self.lines {
            output.push_str(&line);
            output.push('\n');
        }
        output
    }
}

/// Quote a cell when it contains a delimiter, quote or newline
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("plain"), "plain");
        assert_eq!(escape_csv("a,b"), "\"a,b\"");
        assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
