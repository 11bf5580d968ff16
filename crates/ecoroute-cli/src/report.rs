//! Console and JSON rendering of evaluation runs.

use std::fmt::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use ecoroute_ai::EvaluationReport;
use ecoroute_core::{Accuracy, BinaryLabels, DatasetSummary, EvaluationStats};
use serde::Serialize;

use crate::run::LoadedDataset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Classify,
    Route,
}

impl Mode {
    fn title(self) -> &'static str {
        match self {
            Self::Classify => "Zero-shot classification",
            Self::Route => "Semantic routing",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSummary {
    pub name: String,
    pub examples: usize,
}

/// Everything needed to reproduce and judge one evaluation pass.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: Mode,
    pub generated_at: DateTime<Utc>,
    pub seed: u64,
    pub dataset: DatasetSummary,
    pub labels: BinaryLabels,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<RouteSummary>,
    pub test_samples: usize,
    pub stats: EvaluationStats,
    pub accuracy: Accuracy,
    pub elapsed_ms: u64,
    pub cancelled: bool,
}

impl RunReport {
    pub fn new(
        mode: Mode,
        dataset: &LoadedDataset,
        labels: BinaryLabels,
        routes: Vec<RouteSummary>,
        test_samples: usize,
        outcome: &EvaluationReport,
    ) -> Self {
        Self {
            mode,
            generated_at: Utc::now(),
            seed: dataset.seed,
            dataset: dataset.summary,
            labels,
            routes,
            test_samples,
            stats: outcome.stats,
            accuracy: outcome.accuracy(),
            elapsed_ms: outcome.elapsed_ms() as u64,
            cancelled: outcome.cancelled,
        }
    }
}

pub fn render_dataset(path: &Path, dataset: &LoadedDataset) -> String {
    let s = &dataset.summary;
    let mut out = String::new();
    let _ = writeln!(out, "Dataset: {} (seed {})", path.display(), dataset.seed);
    let _ = writeln!(out, "  Positive samples: {}", s.positive);
    let _ = writeln!(out, "  Negative samples: {}", s.negative);
    if s.dropped > 0 {
        let _ = writeln!(out, "  Dropped records:  {}", s.dropped);
    }
    out
}

pub fn render(report: &RunReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "── {} ──", report.mode.title());
    let _ = writeln!(
        out,
        "  Labels:    {} / {}",
        report.labels.positive, report.labels.negative
    );
    if !report.routes.is_empty() {
        let routes: Vec<String> = report
            .routes
            .iter()
            .map(|r| format!("{} ({})", r.name, r.examples))
            .collect();
        let _ = writeln!(out, "  Routes:    {}", routes.join(", "));
    }
    let evaluated = report.stats.total();
    if report.cancelled {
        let _ = writeln!(
            out,
            "  Tested:    {evaluated} of {} (cancelled)",
            report.test_samples
        );
    } else {
        let _ = writeln!(out, "  Tested:    {evaluated}");
    }
    let _ = writeln!(out, "  Time:      {}ms", report.elapsed_ms);
    let _ = writeln!(
        out,
        "  Correct:   {}  Incorrect: {}",
        report.stats.correct, report.stats.incorrect
    );
    let _ = writeln!(out, "  Accuracy:  {}", report.accuracy);
    out
}

pub fn print_json(reports: &[RunReport]) -> anyhow::Result<()> {
    let json = match reports {
        [single] => serde_json::to_string_pretty(single)?,
        many => serde_json::to_string_pretty(many)?,
    };
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> LoadedDataset {
        LoadedDataset {
            samples: Vec::new(),
            summary: DatasetSummary {
                total: 120,
                positive: 30,
                negative: 90,
                dropped: 2,
            },
            seed: 7,
        }
    }

    fn outcome(correct: u64, incorrect: u64, cancelled: bool) -> EvaluationReport {
        EvaluationReport {
            stats: EvaluationStats { correct, incorrect },
            elapsed: std::time::Duration::from_millis(1234),
            cancelled,
        }
    }

    fn route_report(correct: u64, incorrect: u64) -> RunReport {
        RunReport::new(
            Mode::Route,
            &dataset(),
            BinaryLabels::new("environmental", "not environmental"),
            vec![
                RouteSummary {
                    name: "environmental".into(),
                    examples: 20,
                },
                RouteSummary {
                    name: "not environmental".into(),
                    examples: 80,
                },
            ],
            20,
            &outcome(correct, incorrect, false),
        )
    }

    #[test]
    fn console_report_shows_counts_and_accuracy() {
        let text = render(&route_report(18, 2));
        assert!(text.contains("Semantic routing"));
        assert!(text.contains("environmental (20), not environmental (80)"));
        assert!(text.contains("Time:      1234ms"));
        assert!(text.contains("Correct:   18  Incorrect: 2"));
        assert!(text.contains("Accuracy:  90.00 %"));
    }

    #[test]
    fn console_report_marks_missing_data() {
        let text = render(&route_report(0, 0));
        assert!(text.contains("Accuracy:  no data"));
    }

    #[test]
    fn cancelled_run_reports_progress() {
        let report = RunReport::new(
            Mode::Classify,
            &dataset(),
            BinaryLabels::new("environmental", "random other"),
            Vec::new(),
            120,
            &outcome(5, 1, true),
        );
        let text = render(&report);
        assert!(text.contains("Tested:    6 of 120 (cancelled)"));
        assert!(!text.contains("Routes:"));
    }

    #[test]
    fn dataset_header_lists_class_counts() {
        let text = render_dataset(Path::new("environmental_2k.csv"), &dataset());
        assert!(text.contains("environmental_2k.csv (seed 7)"));
        assert!(text.contains("Positive samples: 30"));
        assert!(text.contains("Negative samples: 90"));
        assert!(text.contains("Dropped records:  2"));
    }

    #[test]
    fn json_report_fields() {
        let value = serde_json::to_value(route_report(18, 2)).unwrap();
        assert_eq!(value["mode"], "route");
        assert_eq!(value["seed"], 7);
        assert_eq!(value["stats"]["correct"], 18);
        assert_eq!(value["accuracy"]["percent"], 90.0);
        assert_eq!(value["routes"][1]["examples"], 80);
        assert_eq!(value["dataset"]["dropped"], 2);
        assert!(value["generated_at"].is_string());

        let classify = RunReport::new(
            Mode::Classify,
            &dataset(),
            BinaryLabels::new("environmental", "random other"),
            Vec::new(),
            0,
            &outcome(0, 0, false),
        );
        let value = serde_json::to_value(classify).unwrap();
        assert!(value.get("routes").is_none());
        assert_eq!(value["accuracy"], "no_data");
    }
}
