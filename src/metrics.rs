//! Experiment metrics: per-step records, derived statistics, CSV export.
//!
//! The log is append-only; every completed step contributes exactly one
//! [`StepRecord`] in step order. Derived views (per-operator aggregates
//! and the run summary) are recomputed from the records on demand, and a
//! finished run exports four CSV tables for offline analysis.

// Rate and percentage computations cast counters to f64
#![allow(clippy::cast_precision_loss)]

use crate::bandit::BanditCore;
use crate::operators::Operator;
use log::{info, warn};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// One completed search step.
#[derive(Debug, Clone)]
pub struct StepRecord {
    /// 1-indexed step number.
    pub step: usize,
    /// Operator that was tried.
    pub operator: Operator,
    /// Whether the mutation applied, compiled, and passed tests.
    pub success: bool,
    /// Whether the child was strictly fitter than its parent.
    pub improvement: bool,
    /// Fitness of the variant the mutation started from.
    pub parent_fitness: Option<u64>,
    /// Fitness of the mutated variant; absent unless the step succeeded.
    pub child_fitness: Option<u64>,
    /// Reward the selector received for this step.
    pub reward: f64,
    /// Wall-clock duration of this step in milliseconds.
    pub step_duration_ms: u64,
    /// Milliseconds since the experiment started.
    pub cumulative_ms: u64,
    /// Free-text description of the tried patch.
    pub patch: String,
}

/// Aggregate statistics for one operator, derived from the step records.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OperatorAggregate {
    /// Operator name.
    pub operator: &'static str,
    /// Operator category name.
    pub category: &'static str,
    /// Whether the operator is model-driven.
    pub is_learned: bool,
    /// Times the operator was selected.
    pub selections: u32,
    /// Successful evaluations.
    pub successes: u32,
    /// Successes over selections, 0 if never selected.
    pub success_rate: f64,
    /// Steps where the operator produced a strict improvement.
    pub improvements: u32,
    /// Improvements over selections, 0 if never selected.
    pub improvement_rate: f64,
    /// Sum of rewards earned.
    pub total_reward: f64,
    /// Mean reward per selection, 0 if never selected.
    pub average_reward: f64,
    /// The selector's current quality estimate for the operator.
    pub learned_q: f64,
}

/// Selection/success/improvement counts for one side of the
/// learned-vs-classical split.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GroupSummary {
    /// Steps that used an operator from this group.
    pub selections: u32,
    /// Successful steps in this group.
    pub successes: u32,
    /// Improving steps in this group.
    pub improvements: u32,
    /// Successes over selections, 0 if the group was never used.
    pub success_rate: f64,
}

/// Run-level summary statistics.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Experiment identifier.
    pub experiment_id: String,
    /// Number of completed steps.
    pub total_steps: usize,
    /// Steps whose mutation succeeded.
    pub successful_steps: usize,
    /// Successful steps over total steps, 0 for an empty run.
    pub success_rate: f64,
    /// Steps that strictly improved on their parent.
    pub improvements: usize,
    /// Improving steps over total steps, 0 for an empty run.
    pub improvement_rate: f64,
    /// Sum of all rewards.
    pub total_reward: f64,
    /// Mean reward per step, 0 for an empty run.
    pub average_reward: f64,
    /// Baseline fitness measured during warmup.
    pub original_fitness: u64,
    /// Best fitness found.
    pub best_fitness: u64,
    /// Percentage improvement of best over baseline, 0 if baseline is 0.
    pub improvement_pct: f64,
    /// Split for model-driven operators.
    pub learned: GroupSummary,
    /// Split for classical operators.
    pub classical: GroupSummary,
    /// Wall-clock runtime in milliseconds.
    pub runtime_ms: u64,
    /// Description of the best patch, if any step improved.
    pub best_patch: Option<String>,
}

/// Accumulates step records and configuration for one experiment run.
#[derive(Debug)]
pub struct MetricsLog {
    experiment_id: String,
    output_dir: PathBuf,
    records: Vec<StepRecord>,
    configuration: Vec<(String, String)>,
    start: Instant,
    original_fitness: u64,
    best_fitness: u64,
    best_patch: Option<String>,
}

impl MetricsLog {
    /// Create a log writing under `output_dir`.
    ///
    /// The directory is created eagerly; failure to create it is only a
    /// warning here and will resurface at export time.
    #[must_use]
    pub fn new(experiment_id: String, output_dir: PathBuf) -> Self {
        if let Err(e) = std::fs::create_dir_all(&output_dir) {
            warn!("could not create output directory {}: {e}", output_dir.display());
        }
        info!("metrics log initialized: {experiment_id}");
        Self {
            experiment_id,
            output_dir,
            records: Vec::new(),
            configuration: Vec::new(),
            start: Instant::now(),
            original_fitness: 0,
            best_fitness: 0,
            best_patch: None,
        }
    }

    /// The experiment identifier.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Set one configuration pair; a repeated key overwrites its value
    /// in place, keeping first-insertion order.
    pub fn set_config(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.configuration.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.configuration.push((key, value));
        }
    }

    /// Record the warmup baseline; it seeds both the original and the
    /// best fitness.
    pub fn set_original_fitness(&mut self, fitness: u64) {
        self.original_fitness = fitness;
        self.best_fitness = fitness;
        self.set_config("original_fitness", fitness.to_string());
    }

    /// Append the record for one completed step.
    ///
    /// Improvement is derived here (success and a child strictly fitter
    /// than its parent), and the best-fitness watermark advances when a
    /// successful child beats it.
    #[allow(clippy::too_many_arguments, clippy::cast_possible_truncation)]
    pub fn log_step(
        &mut self,
        step: usize,
        operator: Operator,
        success: bool,
        parent_fitness: Option<u64>,
        child_fitness: Option<u64>,
        reward: f64,
        step_duration_ms: u64,
        patch: String,
    ) {
        let improvement = success
            && matches!((parent_fitness, child_fitness), (Some(p), Some(c)) if c < p);

        if success && let Some(child) = child_fitness && child < self.best_fitness {
            self.best_fitness = child;
            self.best_patch = Some(patch.clone());
        }

        self.records.push(StepRecord {
            step,
            operator,
            success,
            improvement,
            parent_fitness,
            child_fitness,
            reward,
            step_duration_ms,
            cumulative_ms: self.start.elapsed().as_millis() as u64,
            patch,
        });
    }

    /// All step records, in step order.
    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Best fitness seen so far (the baseline until a step improves).
    #[must_use]
    pub fn best_fitness(&self) -> u64 {
        self.best_fitness
    }

    /// Per-operator aggregates in the selector's operator order, with the
    /// selector's learned quality estimates attached.
    #[must_use]
    pub fn operator_aggregates(&self, core: &BanditCore) -> Vec<OperatorAggregate> {
        core.operators()
            .iter()
            .map(|&op| {
                let mut selections = 0u32;
                let mut successes = 0u32;
                let mut improvements = 0u32;
                let mut total_reward = 0.0f64;
                for r in self.records.iter().filter(|r| r.operator == op) {
                    selections += 1;
                    if r.success {
                        successes += 1;
                    }
                    if r.improvement {
                        improvements += 1;
                    }
                    total_reward += r.reward;
                }
                OperatorAggregate {
                    operator: op.name(),
                    category: op.category().as_str(),
                    is_learned: op.is_learned(),
                    selections,
                    successes,
                    success_rate: rate(successes, selections),
                    improvements,
                    improvement_rate: rate(improvements, selections),
                    total_reward,
                    average_reward: if selections > 0 {
                        total_reward / f64::from(selections)
                    } else {
                        0.0
                    },
                    learned_q: core.state(op).map_or(0.0, |s| s.average_quality),
                }
            })
            .collect()
    }

    /// Run-level summary over everything recorded so far.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn summary(&self) -> RunSummary {
        let total = self.records.len();
        let successful = self.records.iter().filter(|r| r.success).count();
        let improvements = self.records.iter().filter(|r| r.improvement).count();
        let total_reward: f64 = self.records.iter().map(|r| r.reward).sum();

        let group = |learned: bool| {
            let mut selections = 0u32;
            let mut successes = 0u32;
            let mut improved = 0u32;
            for r in self
                .records
                .iter()
                .filter(|r| r.operator.is_learned() == learned)
            {
                selections += 1;
                if r.success {
                    successes += 1;
                }
                if r.improvement {
                    improved += 1;
                }
            }
            GroupSummary {
                selections,
                successes,
                improvements: improved,
                success_rate: rate(successes, selections),
            }
        };

        let improvement_pct = if self.original_fitness > 0 {
            100.0 * (self.original_fitness - self.best_fitness) as f64
                / self.original_fitness as f64
        } else {
            0.0
        };

        RunSummary {
            experiment_id: self.experiment_id.clone(),
            total_steps: total,
            successful_steps: successful,
            success_rate: if total > 0 {
                successful as f64 / total as f64
            } else {
                0.0
            },
            improvements,
            improvement_rate: if total > 0 {
                improvements as f64 / total as f64
            } else {
                0.0
            },
            total_reward,
            average_reward: if total > 0 {
                total_reward / total as f64
            } else {
                0.0
            },
            original_fitness: self.original_fitness,
            best_fitness: self.best_fitness,
            improvement_pct,
            learned: group(true),
            classical: group(false),
            runtime_ms: self.start.elapsed().as_millis() as u64,
            best_patch: self.best_patch.clone(),
        }
    }

    /// Export step records as CSV.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from creating or writing the file.
    pub fn export_steps(&self, filename: &str) -> io::Result<PathBuf> {
        let path = self.output_dir.join(filename);
        let mut w = BufWriter::new(File::create(&path)?);
        writeln!(
            w,
            "step,operator,category,is_learned,success,is_improvement,\
             parent_fitness,child_fitness,reward,step_duration_ms,cumulative_time_ms,patch"
        )?;
        for r in &self.records {
            writeln!(
                w,
                "{},{},{},{},{},{},{},{},{:.6},{},{},\"{}\"",
                r.step,
                r.operator.name(),
                r.operator.category(),
                r.operator.is_learned(),
                r.success,
                r.improvement,
                r.parent_fitness.map_or_else(String::new, |v| v.to_string()),
                r.child_fitness.map_or_else(String::new, |v| v.to_string()),
                r.reward,
                r.step_duration_ms,
                r.cumulative_ms,
                escape_csv(&r.patch),
            )?;
        }
        w.flush()?;
        info!("exported steps to {}", path.display());
        Ok(path)
    }

    /// Export per-operator statistics as CSV.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from creating or writing the file.
    pub fn export_operators(&self, core: &BanditCore, filename: &str) -> io::Result<PathBuf> {
        let path = self.output_dir.join(filename);
        let mut w = BufWriter::new(File::create(&path)?);
        writeln!(
            w,
            "operator,category,is_learned,selection_count,success_count,success_rate,\
             improvement_count,improvement_rate,total_reward,avg_reward,learned_q"
        )?;
        for a in self.operator_aggregates(core) {
            writeln!(
                w,
                "{},{},{},{},{},{:.6},{},{:.6},{:.6},{:.6},{:.6}",
                a.operator,
                a.category,
                a.is_learned,
                a.selections,
                a.successes,
                a.success_rate,
                a.improvements,
                a.improvement_rate,
                a.total_reward,
                a.average_reward,
                a.learned_q,
            )?;
        }
        w.flush()?;
        info!("exported operator stats to {}", path.display());
        Ok(path)
    }

    /// Export the resolved configuration as CSV.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from creating or writing the file.
    pub fn export_config(&self, filename: &str) -> io::Result<PathBuf> {
        let path = self.output_dir.join(filename);
        let mut w = BufWriter::new(File::create(&path)?);
        writeln!(w, "key,value")?;
        for (key, value) in &self.configuration {
            writeln!(w, "{key},\"{}\"", escape_csv(value))?;
        }
        w.flush()?;
        info!("exported config to {}", path.display());
        Ok(path)
    }

    /// Export the run summary as CSV.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from creating or writing the file.
    pub fn export_summary(&self, filename: &str) -> io::Result<PathBuf> {
        let path = self.output_dir.join(filename);
        let s = self.summary();
        let mut w = BufWriter::new(File::create(&path)?);
        writeln!(w, "metric,value")?;
        writeln!(w, "experiment_id,{}", s.experiment_id)?;
        writeln!(w, "total_steps,{}", s.total_steps)?;
        writeln!(w, "successful_steps,{}", s.successful_steps)?;
        writeln!(w, "success_rate,{:.6}", s.success_rate)?;
        writeln!(w, "improvements,{}", s.improvements)?;
        writeln!(w, "improvement_rate,{:.6}", s.improvement_rate)?;
        writeln!(w, "total_reward,{:.6}", s.total_reward)?;
        writeln!(w, "avg_reward,{:.6}", s.average_reward)?;
        writeln!(w, "original_fitness,{}", s.original_fitness)?;
        writeln!(w, "best_fitness,{}", s.best_fitness)?;
        writeln!(w, "improvement_pct,{:.2}", s.improvement_pct)?;
        writeln!(w, "learned_selections,{}", s.learned.selections)?;
        writeln!(w, "learned_successes,{}", s.learned.successes)?;
        writeln!(w, "learned_improvements,{}", s.learned.improvements)?;
        writeln!(w, "learned_success_rate,{:.6}", s.learned.success_rate)?;
        writeln!(w, "classical_selections,{}", s.classical.selections)?;
        writeln!(w, "classical_successes,{}", s.classical.successes)?;
        writeln!(w, "classical_improvements,{}", s.classical.improvements)?;
        writeln!(w, "classical_success_rate,{:.6}", s.classical.success_rate)?;
        writeln!(w, "runtime_ms,{}", s.runtime_ms)?;
        writeln!(
            w,
            "best_patch,\"{}\"",
            escape_csv(s.best_patch.as_deref().unwrap_or(""))
        )?;
        w.flush()?;
        info!("exported summary to {}", path.display());
        Ok(path)
    }

    /// Export all four tables, named `<experiment_id>_{steps,operators,config,summary}.csv`.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error encountered.
    pub fn export_all(&self, core: &BanditCore) -> io::Result<()> {
        self.export_steps(&format!("{}_steps.csv", self.experiment_id))?;
        self.export_operators(core, &format!("{}_operators.csv", self.experiment_id))?;
        self.export_config(&format!("{}_config.csv", self.experiment_id))?;
        self.export_summary(&format!("{}_summary.csv", self.experiment_id))?;
        info!("all data exported to {}", self.output_dir.display());
        Ok(())
    }

    /// The directory exports are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

fn rate(numerator: u32, denominator: u32) -> f64 {
    if denominator > 0 {
        f64::from(numerator) / f64::from(denominator)
    } else {
        0.0
    }
}

/// Double embedded quotes and flatten newlines for quoted CSV fields.
fn escape_csv(s: &str) -> String {
    s.replace('"', "\"\"").replace('\n', "\\n")
}
