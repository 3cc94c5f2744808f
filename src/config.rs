use std::path::{Path, PathBuf};

use crate::data::qc::InclusionPolicy;

/// Bins per histogram in the comparison figure.
pub const HISTOGRAM_BINS: usize = 50;

// ---------------------------------------------------------------------------
// File layout
// ---------------------------------------------------------------------------

/// Every file the pipeline reads or writes, relative to one working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Reference cohort mean FD, one value per line.
    pub reference_motion: PathBuf,
    /// Target cohort mean FD, one value per line.
    pub target_motion: PathBuf,
    pub motion_summary: PathBuf,
    /// NDA imaging QC release table; has to be copied in by hand.
    pub qc_table: PathBuf,

    pub run_log: PathBuf,
    pub subjects: PathBuf,
    /// Same subjects with `NDAR_` keys.
    pub subjects_separated: PathBuf,
    pub histogram: PathBuf,
    pub report: PathBuf,
}

impl Paths {
    /// The fixed layout under `root`.
    pub fn under(root: &Path) -> Self {
        let data = root.join("data");
        Paths {
            reference_motion: data.join("HCP500_rfMRI_motion.txt"),
            target_motion: data.join("mean_FDs.txt"),
            motion_summary: data.join("motion_summary_data.csv"),
            qc_table: data.join("mriqcrp102.txt"),
            run_log: root.join("log.txt"),
            subjects: data.join("motion_filtered_subjects.txt"),
            subjects_separated: data.join("motion_filtered_subjects_R.txt"),
            histogram: data.join("hcp_abcd_FD_histogram.png"),
            report: data.join("motion_filter_report.json"),
        }
    }

    /// Inputs paired with a hint shown when the file is absent.
    pub fn inputs(&self) -> [(&Path, Option<&'static str>); 4] {
        [
            (self.reference_motion.as_path(), None),
            (self.target_motion.as_path(), None),
            (self.motion_summary.as_path(), None),
            (
                self.qc_table.as_path(),
                Some("download it from the NDA ABCD release package and place it in data/ manually"),
            ),
        ]
    }
}

impl Default for Paths {
    fn default() -> Self {
        Paths::under(Path::new("."))
    }
}

// ---------------------------------------------------------------------------
// Pipeline configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub paths: Paths,
    /// Which QC counters decide inclusion.
    pub policy: InclusionPolicy,
    pub histogram_bins: usize,
}

impl PipelineConfig {
    pub fn under(root: &Path) -> Self {
        PipelineConfig {
            paths: Paths::under(root),
            ..Default::default()
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            paths: Paths::default(),
            policy: InclusionPolicy::default(),
            histogram_bins: HISTOGRAM_BINS,
        }
    }
}
