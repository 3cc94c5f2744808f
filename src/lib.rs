//! Motion quality control for a cohort's rs-fMRI subjects.
//!
//! Narrows the motion summary of a release through four stages (missing mean
//! FD, scan duration, FD outliers, imaging QC), writes the surviving subject
//! lists, and plots the cohort's FD distribution against a reference cohort.

pub mod app;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod plot;
pub mod stats;
pub mod subject_key;
