use std::fmt::Write;

use chrono::NaiveDate;

use crate::aggregate::{self, aggregate};
use crate::models::{CallRecord, CallStatus, Metric};

/// Render a markdown coaching report for one member over a date window.
/// Records are expected in display order (newest call first).
pub fn build_report(
    member_id: &str,
    window: Option<(NaiveDate, NaiveDate)>,
    records: &[CallRecord],
) -> String {
    let summary = aggregate(records);

    let mut output = String::new();
    let _ = writeln!(output, "# Call Performance Report");
    match window {
        Some((from, to)) => {
            let _ = writeln!(output, "Member {member_id} (calls from {from} to {to})");
        }
        None => {
            let _ = writeln!(output, "Member {member_id} (all calls)");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Performance Summary");

    if summary.total_calls == 0 {
        let _ = writeln!(output, "No completed calls in this window.");
        return output;
    }

    let _ = writeln!(output, "- Total calls: {}", summary.total_calls);
    let _ = writeln!(output, "- Average score: {}", summary.overall_average);
    let _ = writeln!(output, "- Best category: {}", summary.best_category);
    let _ = writeln!(output, "- Needs improvement: {}", summary.needs_improvement);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Category Averages");
    for entry in &summary.category_averages {
        let _ = writeln!(output, "- {}: {:.1}", entry.category, entry.average);
    }

    let trend = aggregate::series(records, Metric::Overall);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overall Trend");
    for point in &trend.points {
        let _ = writeln!(output, "- {}: {}", point.label, point.value);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Calls");
    for record in records
        .iter()
        .filter(|record| record.status == CallStatus::Completed)
        .take(5)
    {
        let _ = writeln!(
            output,
            "- Call {} with {} on {} ({}): score {}",
            record.call_number,
            record.bot_name,
            record.date_label,
            record.duration_label,
            aggregate::overall_score(&record.scores)
        );
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{normalize, RawCallRow};
    use serde_json::json;

    fn completed_call(call_number: i64, date: &str, score: i64) -> crate::models::CallRecord {
        let raw: RawCallRow = serde_json::from_value(json!({
            "call_number": call_number,
            "session_id": format!("s-{call_number}"),
            "status": "completed",
            "call_date": date,
            "call_length": "7 seconds",
            "engagement_score": score,
            "objection_handling_score": score,
            "information_gathering_score": score,
            "program_explanation_score": score,
            "closing_skills_score": score,
            "effectiveness_score": score
        }))
        .unwrap();
        normalize(raw)
    }

    #[test]
    fn report_lists_summary_and_trend() {
        let records = vec![
            completed_call(2, "Jan 5, 2025, 12:44 AM", 90),
            completed_call(1, "Jan 4, 2025, 03:15 PM", 70),
        ];
        let report = build_report("demo-member", None, &records);

        assert!(report.contains("# Call Performance Report"));
        assert!(report.contains("- Total calls: 2"));
        assert!(report.contains("- Average score: 80"));
        // Trend is oldest first.
        let call1 = report.find("- Call 1: 70").unwrap();
        let call2 = report.find("- Call 2: 90").unwrap();
        assert!(call1 < call2);
    }

    #[test]
    fn empty_window_reports_no_calls() {
        let report = build_report("demo-member", None, &[]);
        assert!(report.contains("No completed calls in this window."));
        assert!(!report.contains("Category Averages"));
    }
}
