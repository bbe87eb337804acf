//! Plain-text rendering of trial summaries.

use std::fmt;

use crate::trial::{TrialHistory, TrialSummary};

fn label(column: &str) -> &str {
    match column {
        "patients_assessed" => "Patients Assessed",
        "mean_q_time_nurse" => "Mean Nurse Queue (min)",
        "max_q_time_nurse" => "Max Nurse Queue (min)",
        "mean_q_time_ward" => "Mean Ward Queue (h)",
        "max_q_time_ward" => "Max Ward Queue (h)",
        "admissions_avoided" => "Admissions Avoided",
        "mean_ward_occupancy" => "Mean Ward Occupancy",
        "admission_delays" => "Admission Delays",
        "mean_los_ward" => "Mean Ward LOS (h)",
        "sdec_financial_savings" => "SDEC Financial Savings",
        "medical_staff_cost" => "SDEC Medical Staff Cost",
        "sdec_savings" => "SDEC Net Savings",
        "thrombolysis_savings" => "Thrombolysis Savings",
        "total_savings" => "Total Savings",
        "mean_severity_change" => "Mean Severity Change",
        "ich_count" => "ICH",
        "ischaemic_count" => "Ischaemic",
        "tia_count" => "TIA",
        "stroke_mimic_count" => "Stroke Mimic",
        "non_stroke_count" => "Non Stroke",
        "thrombolysed" => "Thrombolysed",
        "additional_thrombolysis" => "Additional Thrombolysis (CTP)",
        "sdec_admissions" => "SDEC Admissions",
        "minor_non_admissions" => "Minor Non-Admissions",
        "sdec_freezes" => "SDEC Closures",
        "scanner_freezes" => "CTP Closures",
        other => other,
    }
}

impl fmt::Display for TrialSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Trial Report ===")?;
        writeln!(f, "Replications: {}", self.replications)?;
        writeln!(f)?;
        writeln!(f, "{:<32} {:>14} {:>14} {:>14}", "KPI", "Mean", "Min", "Max")?;
        for stat in &self.stats {
            writeln!(
                f,
                "{:<32} {:>14.2} {:>14.2} {:>14.2}",
                label(stat.column),
                stat.mean,
                stat.min,
                stat.max
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for TrialHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (number, summary) in self.iter() {
            writeln!(f, "--- Trial {number} ---")?;
            write!(f, "{summary}")?;
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trial::SummaryStat;

    #[test]
    fn report_lists_every_column() {
        let summary = TrialSummary {
            replications: 2,
            stats: vec![
                SummaryStat {
                    column: "mean_q_time_nurse",
                    mean: 12.5,
                    min: 10.0,
                    max: 15.0,
                },
                SummaryStat {
                    column: "admissions_avoided",
                    mean: 3.0,
                    min: 2.0,
                    max: 4.0,
                },
            ],
        };
        let text = summary.to_string();
        assert!(text.starts_with("=== Trial Report ==="));
        assert!(text.contains("Replications: 2"));
        assert!(text.contains("Mean Nurse Queue (min)"));
        assert!(text.contains("12.50"));
        assert!(text.contains("Admissions Avoided"));

        let mut history = TrialHistory::new();
        history.record(summary);
        assert!(history.to_string().contains("--- Trial 1 ---"));
    }
}
