//! # ncarchive
//!
//! A Rust library for locating data in the duration-aligned archives written by
//! climate-model post-processing, and for selecting time steps from them.
//!
//! ## Features
//!
//! - **Interval vocabulary**: months, month lists and season codes resolve to
//!   one canonical label (`jja`, `djf`, `ann`, ...)
//! - **File naming**: deterministic archive file names for time series and
//!   time-averaged data, aligned to fixed multi-year blocks
//! - **Time selection**: masks and values for a year range and set of months,
//!   on decoded or raw CF time axes
//! - **Staging**: local, `dmget` and `hsmget` backends behind one async trait
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ncarchive::{locate_archive_files, input::JobConfig};
//!
//! let config = JobConfig::from_file("t_surf.yaml")?;
//! for path in locate_archive_files(&config)? {
//!     println!("{}", path.display());
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Configuration Example
//!
//! ```yaml
//! run:
//!   name: test_am2
//!   root: /archive/pp
//!   duration: 5
//!   start_year: 1
//!   default_years: [21, 80]
//! variable: t_surf
//! domain: atmos
//! representation: av
//! granularity: monthly
//! interval: jja
//! staging:
//!   backend: dmget
//! ```

pub mod calendar;
pub mod cli;
pub mod dataset;
pub mod error;
pub mod input;
pub mod interval;
pub mod labels;
pub mod log;
pub mod naming;
pub mod select;
pub mod staging;
pub mod version;

#[cfg(test)]
mod tests;

use crate::input::JobConfig;
use crate::staging::{StagingBackend, StagingFactory};
use ::log::{debug, info};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Full archive paths of every file a job needs, in chronological order.
///
/// # Errors
///
/// Fails when the job has no year range or its representation cannot be
/// named (see [`naming::build_name`]).
pub fn locate_archive_files(config: &JobConfig) -> Result<Vec<PathBuf>> {
    let files = config
        .files()
        .with_context(|| format!("Cannot locate archive files for '{}'", config.variable))?;
    debug!("Located {} archive file(s) for {}", files.len(), config.variable);
    Ok(files)
}

/// Locates a job's archive files and stages them with its configured backend.
///
/// Returns the staged paths.
///
/// # Examples
///
/// ```rust,no_run
/// use ncarchive::{stage_archive_files, input::JobConfig};
///
/// # async fn run() -> anyhow::Result<()> {
/// let config = JobConfig::from_file("t_surf.yaml")?;
/// let staged = stage_archive_files(&config).await?;
/// println!("{} file(s) online", staged.len());
/// # Ok(())
/// # }
/// ```
pub async fn stage_archive_files(config: &JobConfig) -> Result<Vec<PathBuf>> {
    let files = locate_archive_files(config)?;
    let backend = StagingFactory::from_config(&config.staging)
        .context("Invalid staging configuration")?;
    info!(
        "Staging {} file(s) with {:?}",
        files.len(),
        config.staging.backend
    );
    backend
        .stage(&files)
        .await
        .context("Failed to stage archive files")?;
    Ok(files)
}
