//! Multi-replication trials.
//!
//! A [`Trial`] runs `number_of_runs` independent [`Model`]s over the same
//! configuration snapshot, either one after another or on the rayon pool,
//! and concatenates their outputs in replication order.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;
use strokeflow_sim::RunMetrics;
use tracing::{info, instrument};

use crate::{
    config::ModelConfig,
    error::{ConfigError, ModelResult},
    model::{Model, OccupancySample, RunOutput},
    patient::Patient,
    results::RunResults,
};

/// Concatenated output of every replication.
#[derive(Debug, Clone, Default)]
pub struct TrialOutput {
    /// One KPI row per replication.
    pub runs: Vec<RunResults>,
    /// Every patient of every replication, tagged with its run.
    pub patients: Vec<Patient>,
    /// Ward occupancy samples of every replication.
    pub ward_audit: Vec<OccupancySample>,
    /// SDEC occupancy samples of every replication.
    pub sdec_audit: Vec<OccupancySample>,
    /// Nurse queue samples of every replication.
    pub nurse_queue_audit: Vec<OccupancySample>,
    /// Engine counters summed over replications.
    pub metrics: RunMetrics,
}

impl TrialOutput {
    fn absorb(&mut self, run: RunOutput) {
        self.runs.push(run.results);
        self.patients.extend(run.patients);
        self.ward_audit.extend(run.ward_audit);
        self.sdec_audit.extend(run.sdec_audit);
        self.nurse_queue_audit.extend(run.nurse_queue_audit);
        self.metrics.absorb(&run.metrics);
    }

    /// Mean, min and max of every KPI column across replications.
    pub fn summary(&self) -> TrialSummary {
        let mut stats: Vec<SummaryStat> = Vec::new();
        for (i, row) in self.runs.iter().enumerate() {
            for (j, (column, value)) in row.columns().into_iter().enumerate() {
                if i == 0 {
                    stats.push(SummaryStat {
                        column,
                        mean: 0.0,
                        min: value,
                        max: value,
                    });
                }
                if let Some(stat) = stats.get_mut(j) {
                    stat.mean += value;
                    stat.min = stat.min.min(value);
                    stat.max = stat.max.max(value);
                }
            }
        }
        let n = self.runs.len().max(1) as f64;
        for stat in &mut stats {
            stat.mean /= n;
        }
        TrialSummary {
            replications: self.runs.len(),
            stats,
        }
    }
}

/// Cross-replication statistics of one KPI column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStat {
    /// Column name.
    pub column: &'static str,
    /// Mean over replications.
    pub mean: f64,
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
}

/// Summary table of a trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialSummary {
    /// Replications summarised.
    pub replications: usize,
    /// One entry per KPI column, in report order.
    pub stats: Vec<SummaryStat>,
}

impl TrialSummary {
    /// Statistics for `column`, if present.
    pub fn get(&self, column: &str) -> Option<&SummaryStat> {
        self.stats.iter().find(|s| s.column == column)
    }
}

/// Runs replications of one configuration.
#[derive(Debug, Clone)]
pub struct Trial {
    config: ModelConfig,
}

impl Trial {
    /// Validates `config` up front so no replication starts on a bad one.
    pub fn new(config: ModelConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The validated configuration every replication runs on.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Runs every replication on the current thread.
    #[instrument(skip_all, fields(runs = self.config.number_of_runs, seed = self.config.master_seed))]
    pub fn run(&self) -> ModelResult<TrialOutput> {
        let mut output = TrialOutput::default();
        for replication in 0..self.config.number_of_runs {
            output.absorb(Model::new(&self.config, replication)?.run()?);
        }
        info!(patients = output.patients.len(), "trial complete");
        Ok(output)
    }

    /// Runs replications on the rayon pool. The output is identical to
    /// [`Trial::run`].
    #[instrument(skip_all, fields(runs = self.config.number_of_runs, seed = self.config.master_seed))]
    pub fn run_parallel(&self) -> ModelResult<TrialOutput> {
        let runs = (0..self.config.number_of_runs)
            .into_par_iter()
            .map(|replication| Model::new(&self.config, replication)?.run())
            .collect::<ModelResult<Vec<_>>>()?;
        let mut output = TrialOutput::default();
        for run in runs {
            output.absorb(run);
        }
        info!(patients = output.patients.len(), "trial complete");
        Ok(output)
    }
}

/// Summaries of successive trials, numbered from 1.
///
/// Callers own the history and pass it along explicitly, so comparing
/// scenarios never depends on process-wide state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrialHistory {
    trials: BTreeMap<u32, TrialSummary>,
}

impl TrialHistory {
    /// An empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `summary` under the next trial number and returns it.
    pub fn record(&mut self, summary: TrialSummary) -> u32 {
        let number = self.trials.keys().next_back().map_or(1, |last| last + 1);
        self.trials.insert(number, summary);
        number
    }

    /// Summary recorded under `trial`.
    pub fn get(&self, trial: u32) -> Option<&TrialSummary> {
        self.trials.get(&trial)
    }

    /// Number of recorded trials.
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    /// Whether no trial has been recorded.
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Trials in the order they were recorded.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &TrialSummary)> {
        self.trials.iter().map(|(n, s)| (*n, s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_config() -> ModelConfig {
        ModelConfig::default().with_days(20.0).with_runs(3)
    }

    #[test]
    fn trial_rejects_invalid_config() {
        assert!(matches!(
            Trial::new(tiny_config().with_runs(0)),
            Err(ConfigError::NoReplications)
        ));
    }

    #[test]
    fn outputs_are_tagged_by_replication() {
        let output = Trial::new(tiny_config()).unwrap().run().unwrap();
        assert_eq!(output.runs.len(), 3);
        for (i, row) in output.runs.iter().enumerate() {
            assert_eq!(row.run, i as u32);
        }
        assert!(output.patients.windows(2).all(|w| w[0].run <= w[1].run));
        assert!(output.ward_audit.iter().all(|s| s.run < 3));
        assert!(output.nurse_queue_audit.iter().all(|s| s.run < 3));
        for run in 0..3 {
            assert!(output.nurse_queue_audit.iter().any(|s| s.run == run));
        }
    }

    #[test]
    fn summary_brackets_each_column() {
        let output = Trial::new(tiny_config()).unwrap().run().unwrap();
        let summary = output.summary();
        assert_eq!(summary.replications, 3);
        for stat in &summary.stats {
            assert!(stat.min <= stat.mean + 1e-9, "{}", stat.column);
            assert!(stat.mean <= stat.max + 1e-9, "{}", stat.column);
        }
        let assessed = summary.get("patients_assessed").unwrap();
        let total: usize = output.runs.iter().map(|r| r.patients_assessed).sum();
        assert!((assessed.mean - total as f64 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_summary_has_no_columns() {
        let summary = TrialOutput::default().summary();
        assert_eq!(summary.replications, 0);
        assert!(summary.stats.is_empty());
    }

    #[test]
    fn history_numbers_trials_from_one() {
        let mut history = TrialHistory::new();
        assert!(history.is_empty());
        let first = TrialOutput::default().summary();
        assert_eq!(history.record(first.clone()), 1);
        assert_eq!(history.record(first), 2);
        assert_eq!(history.len(), 2);
        assert!(history.get(2).is_some());
        assert_eq!(history.iter().map(|(n, _)| n).collect::<Vec<_>>(), vec![1, 2]);
    }
}
