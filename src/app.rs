use anyhow::{Context, Result};

use crate::color::cohort_colors;
use crate::config::PipelineConfig;
use crate::data::loader::{load_motion_summary, load_motion_vector, load_qc_table};
use crate::error::PipelineError;
use crate::output::{write_subject_list, RunLog, RunReport};
use crate::pipeline::{filter_subjects, FilterOutcome};
use crate::plot::histogram::{render_comparison, Series};

// ---------------------------------------------------------------------------
// One complete run
// ---------------------------------------------------------------------------

/// Fail with the first input that is missing, before anything is written.
pub fn check_inputs(config: &PipelineConfig) -> Result<()> {
    for (path, hint) in config.paths.inputs() {
        if !path.is_file() {
            return Err(PipelineError::MissingInput {
                path: path.to_path_buf(),
                hint,
            }
            .into());
        }
    }
    Ok(())
}

/// A filtered release: the reference vector plus the pipeline result.
#[derive(Debug, Clone)]
pub struct Release {
    pub reference: Vec<f64>,
    pub outcome: FilterOutcome,
}

/// Load and filter one release, then write the run log, both subject lists
/// and the JSON report.
///
/// Subject lists are only written once every key has been reformatted, so a
/// failing run never leaves a partial list behind.
pub fn filter_release(config: &PipelineConfig) -> Result<Release> {
    let paths = &config.paths;
    check_inputs(config)?;

    let reference = load_motion_vector(&paths.reference_motion)?;
    let target_all = load_motion_vector(&paths.target_motion)?;
    log::info!(
        "loaded {} reference and {} target mean FD values",
        reference.len(),
        target_all.len()
    );

    let mut run_log = RunLog::open(&paths.run_log)?;

    let summary = load_motion_summary(&paths.motion_summary)?;
    let qc = load_qc_table(&paths.qc_table)?;
    log::info!("{} motion summary rows, {} QC rows", summary.len(), qc.len());

    let outcome = filter_subjects(&summary, &qc, config.policy);
    run_log.record_counts(&outcome.counts)?;

    let separated = outcome
        .separated_keys()
        .context("reformatting subject keys for the separated list")?;
    write_subject_list(&paths.subjects, &outcome.subject_keys())?;
    write_subject_list(&paths.subjects_separated, &separated)?;

    RunReport::new(&outcome, &reference).write(&paths.report)?;
    run_log.finish()?;

    log::info!(
        "{} subjects written to {}",
        outcome.counts.final_subjects,
        paths.subjects.display()
    );
    Ok(Release { reference, outcome })
}

/// Reference cohort vs. the filtered target cohort.
pub fn plot_release(config: &PipelineConfig, release: &Release) -> Result<()> {
    let (reference_color, target_color) = cohort_colors();
    let target = release.outcome.mean_fds();
    render_comparison(
        &config.paths.histogram,
        "Histogram of FD, HCP vs. ABCD (Filtered subset)",
        &[
            Series {
                label: "hcp",
                values: &release.reference,
                color: reference_color,
            },
            Series {
                label: "abcd",
                values: &target,
                color: target_color,
            },
        ],
        config.histogram_bins,
    )
}

pub fn run(config: &PipelineConfig) -> Result<Release> {
    let release = filter_release(config)?;
    plot_release(config, &release)?;
    Ok(release)
}
