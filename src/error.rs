use std::path::PathBuf;

use thiserror::Error;

/// Fatal conditions the pipeline reports by kind rather than as free text.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("required input file not found: {}{}", path.display(), hint.map(|h| format!(" ({h})")).unwrap_or_default())]
    MissingInput {
        path: PathBuf,
        hint: Option<&'static str>,
    },

    #[error("{} contains no values", path.display())]
    EmptyVector { path: PathBuf },

    #[error("{} is missing required column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("{} lists subject '{sub}' more than once", path.display())]
    DuplicateSubject { path: PathBuf, sub: String },
}
