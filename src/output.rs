use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::data::qc::InclusionPolicy;
use crate::pipeline::{FilterOutcome, StageCounts};
use crate::stats::{OutlierBounds, Summary};

// ---------------------------------------------------------------------------
// Run log – appended to on every run
// ---------------------------------------------------------------------------

/// Append-only text log of the stage counts of every run.
pub struct RunLog {
    out: BufWriter<File>,
}

impl RunLog {
    /// Open (or create) the log and write the run banner and timestamp.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening run log {}", path.display()))?;
        let mut log = RunLog {
            out: BufWriter::new(file),
        };
        log.line(format_args!("--- RESULTS OF motion-qc ---"))?;
        log.line(format_args!("{}", chrono::Local::now()))?;
        Ok(log)
    }

    fn line(&mut self, args: std::fmt::Arguments<'_>) -> Result<()> {
        writeln!(self.out, "{args}").context("writing run log")
    }

    pub fn record_counts(&mut self, c: &StageCounts) -> Result<()> {
        self.line(format_args!("Initial number of subjects under consideration:\t{}", c.raw))?;
        self.line(format_args!(
            "Number of subjects after dropping those missing remaining_frame_mean_FD value:\t{}",
            c.with_mean_fd
        ))?;
        self.line(format_args!(
            "Number of subjects with >600seconds good scan time:\t{}",
            c.min_duration
        ))?;
        self.line(format_args!(
            "Number of subjects after anomalies removed:\t{}",
            c.without_outliers
        ))?;
        self.line(format_args!("Number of subjects after QC drop\t{}\n", c.final_subjects))
    }

    /// Flush and close.
    pub fn finish(mut self) -> Result<()> {
        self.out.flush().context("flushing run log")
    }
}

// ---------------------------------------------------------------------------
// Subject lists
// ---------------------------------------------------------------------------

/// Write one key per line, replacing any previous list.
pub fn write_subject_list<S: AsRef<str>>(path: &Path, keys: &[S]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for key in keys {
        writeln!(out, "{}", key.as_ref())
            .with_context(|| format!("writing {}", path.display()))?;
    }
    out.flush().with_context(|| format!("flushing {}", path.display()))
}

// ---------------------------------------------------------------------------
// JSON run report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub counts: StageCounts,
    pub outlier_bounds: Option<OutlierBounds>,
    pub outlier_values: Vec<f64>,
    pub policy: InclusionPolicy,
    pub alternate_policy: InclusionPolicy,
    pub alternate_policy_passing: usize,
    pub reference: Option<Summary>,
    pub target: Option<Summary>,
}

impl RunReport {
    pub fn new(outcome: &FilterOutcome, reference: &[f64]) -> Self {
        RunReport {
            counts: outcome.counts,
            outlier_bounds: outcome.bounds,
            outlier_values: outcome.outlier_values.clone(),
            policy: outcome.policy,
            alternate_policy: outcome.policy.alternate(),
            alternate_policy_passing: outcome.alternate_policy_passing,
            reference: Summary::of(reference),
            target: Summary::of(&outcome.mean_fds()),
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, self)
            .with_context(|| format!("writing {}", path.display()))?;
        out.flush().with_context(|| format!("flushing {}", path.display()))
    }
}
