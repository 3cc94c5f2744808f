use std::collections::BTreeSet;

use anyhow::Result;
use serde::Serialize;

use crate::data::filter::{drop_missing_fd, drop_outliers, mean_fd_column, min_scan_duration};
use crate::data::model::{MotionSummary, QcRecord, SubjectRecord};
use crate::data::qc::{join_complete, passing_keys, retain_passing, InclusionPolicy};
use crate::stats::{outlier_bounds, OutlierBounds};
use crate::subject_key::with_separator;

// ---------------------------------------------------------------------------
// Stage bookkeeping
// ---------------------------------------------------------------------------

/// Subject counts after each stage. Each count is ≤ the one before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    pub raw: usize,
    pub with_mean_fd: usize,
    pub min_duration: usize,
    pub without_outliers: usize,
    /// QC rows of the remaining subjects that pass the policy.
    pub qc_passing: usize,
    pub final_subjects: usize,
}

impl StageCounts {
    pub fn is_monotonic(&self) -> bool {
        self.final_subjects <= self.qc_passing
            && self.qc_passing <= self.without_outliers
            && self.without_outliers <= self.min_duration
            && self.min_duration <= self.with_mean_fd
            && self.with_mean_fd <= self.raw
    }
}

/// Everything one filtering run produces.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub counts: StageCounts,
    /// z-score bounds of the duration-filtered subjects; `None` if none were left.
    pub bounds: Option<OutlierBounds>,
    pub outlier_values: Vec<f64>,
    pub policy: InclusionPolicy,
    /// How many QC rows the other policy would have admitted.
    pub alternate_policy_passing: usize,
    pub subjects: Vec<SubjectRecord>,
}

impl FilterOutcome {
    pub fn subject_keys(&self) -> Vec<&str> {
        self.subjects.iter().map(|s| s.sub.as_str()).collect()
    }

    /// Mean FD of the final subjects, for the comparison figure.
    pub fn mean_fds(&self) -> Vec<f64> {
        mean_fd_column(&self.subjects)
    }

    /// Final keys in `NDAR_` form. Fails on the first key without the prefix.
    pub fn separated_keys(&self) -> Result<Vec<String>> {
        Ok(self
            .subjects
            .iter()
            .map(|s| with_separator(&s.sub))
            .collect::<Result<_, _>>()?)
    }
}

// ---------------------------------------------------------------------------
// The filter sequence
// ---------------------------------------------------------------------------

/// Run the four filter stages in order:
/// missing mean FD → scan duration → FD outliers → imaging QC.
///
/// Outlier bounds come from the duration-filtered subjects, not the raw table.
pub fn filter_subjects(
    summary: &MotionSummary,
    qc: &[QcRecord],
    policy: InclusionPolicy,
) -> FilterOutcome {
    let mut counts = StageCounts {
        raw: summary.len(),
        ..Default::default()
    };

    let with_fd = drop_missing_fd(&summary.records);
    counts.with_mean_fd = with_fd.len();
    log::info!("{} of {} subjects have a mean FD", counts.with_mean_fd, counts.raw);

    let long_enough = min_scan_duration(&with_fd);
    counts.min_duration = long_enough.len();
    log::info!("{} subjects have at least 10 min of usable scan", counts.min_duration);

    let bounds = outlier_bounds(&mean_fd_column(&long_enough));
    let (inliers, outlier_values) = drop_outliers(&long_enough);
    counts.without_outliers = inliers.len();
    if let Some(b) = bounds {
        log::info!(
            "outlier bounds [{:.4}, {:.4}]: {} values flagged, {} subjects left",
            b.lower,
            b.upper,
            outlier_values.len(),
            counts.without_outliers
        );
    }

    let joined = join_complete(qc, &inliers);
    log::debug!("{} QC rows joined with complete counters", joined.len());
    let passing: BTreeSet<String> = passing_keys(&joined, policy);
    counts.qc_passing = passing.len();
    let alternate_policy_passing = passing_keys(&joined, policy.alternate()).len();
    log::debug!(
        "QC policy {:?} admits {}, {:?} would admit {}",
        policy,
        counts.qc_passing,
        policy.alternate(),
        alternate_policy_passing
    );

    let subjects = retain_passing(&inliers, &passing);
    counts.final_subjects = subjects.len();
    log::info!("{} subjects pass imaging QC", counts.final_subjects);

    FilterOutcome {
        counts,
        bounds,
        outlier_values,
        policy,
        alternate_policy_passing,
        subjects,
    }
}
