//! # Input Configuration Module
//!
//! This module parses the job configuration that describes one archived
//! variable of a model run: where the run's post-processed archive lives, how
//! its files are chunked, which variable and representation are wanted, and
//! how the files should be staged before reading.
//!
//! ## Configuration Structure
//!
//! - **run**: the model run (archive root, chunk duration, first archive year)
//! - **variable**, **domain**: what is archived and under which component
//! - **representation**, **granularity**: `ts`/`inst`/`av`/`av_ts` and
//!   `annual`/`monthly`/`daily`/`*hr`
//! - **interval**: optional averaging window (month, list of months or code)
//! - **years**: inclusive year range, falling back to the run's default
//! - **staging**: how archive files are brought online
//!
//! Both JSON and YAML are accepted; [`JobConfig::from_file`] picks the parser
//! from the file extension.
//!
//! ## Example Usage
//!
//! ```rust
//! use ncarchive::input::JobConfig;
//!
//! let yaml = r#"
//! run:
//!   name: test_am2
//!   root: /archive/pp
//!   duration: 5
//!   start_year: 1
//! variable: t_surf
//! domain: atmos
//! representation: ts
//! granularity: annual
//! years: [21, 30]
//! "#;
//! let config = JobConfig::from_yaml(yaml)?;
//! assert_eq!(config.files()?.len(), 2);
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::error::ArchiveResult;
use crate::interval::IntervalSpec;
use crate::labels::{DateRange, EnsembleMember};
use crate::naming::{ArchiveFileDescriptor, ArchiveLayout, DataRepresentation, Granularity};
use crate::staging::StagingConfig;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A model run and the shape of its post-processed archive.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RunConfig {
    /// Experiment name, used only for display
    pub name: String,
    /// Root directory of the post-processed archive
    pub root: PathBuf,
    /// Number of years held by each archive file
    pub duration: u32,
    /// First year of the archive; file blocks are aligned to it
    pub start_year: i32,
    /// Years analysed when a job does not name its own
    #[serde(default)]
    pub default_years: Option<DateRange>,
}

/// Main configuration structure for one archived variable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct JobConfig {
    pub run: RunConfig,
    /// Name of the archived variable
    pub variable: String,
    /// Model component (`atmos`, `ocean`, ...)
    pub domain: String,
    pub representation: DataRepresentation,
    pub granularity: Granularity,
    #[serde(default)]
    pub interval: Option<IntervalSpec>,
    #[serde(default)]
    pub years: Option<DateRange>,
    #[serde(default)]
    pub ensemble_member: Option<EnsembleMember>,
    #[serde(default)]
    pub staging: StagingConfig,
}

impl JobConfig {
    /// Loads a job configuration from a JSON or YAML file.
    ///
    /// Files ending in `.yaml` or `.yml` are parsed as YAML, everything else
    /// as JSON.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use ncarchive::input::JobConfig;
    ///
    /// let config = JobConfig::from_file("t_surf.yaml")?;
    /// println!("Locating variable: {}", config.variable);
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| matches!(ext.to_lowercase().as_str(), "yaml" | "yml"));

        let config = if is_yaml {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        };
        config.with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parses a configuration from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str).context("Failed to parse JSON configuration")
    }

    /// Parses a configuration from a YAML string.
    pub fn from_yaml(yaml_str: &str) -> Result<Self> {
        serde_yaml::from_str(yaml_str).context("Failed to parse YAML configuration")
    }

    /// The years this job covers: its own range, else the run's default.
    pub fn years(&self) -> Result<DateRange> {
        self.years.or(self.run.default_years).ok_or_else(|| {
            anyhow!(
                "No years given for '{}' and run '{}' has no default_years",
                self.variable,
                self.run.name
            )
        })
    }

    /// The naming descriptor of the archive file holding `year`.
    pub fn descriptor_for(&self, year: i32) -> ArchiveFileDescriptor {
        ArchiveFileDescriptor {
            variable: self.variable.clone(),
            domain: self.domain.clone(),
            representation: self.representation,
            granularity: self.granularity.clone(),
            interval: self.interval.clone(),
            duration_years: self.run.duration,
            data_year: year,
            archive_start_year: self.run.start_year,
        }
    }

    pub fn layout(&self) -> ArchiveLayout {
        ArchiveLayout::new(&self.run.root)
    }

    /// Full archive paths of every file covering [`JobConfig::years`].
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        let years = self.years()?;
        Ok(self.archive_paths(years)?)
    }

    fn archive_paths(&self, years: DateRange) -> ArchiveResult<Vec<PathBuf>> {
        self.layout()
            .paths_for_years(&self.descriptor_for(years.start()), years.start(), years.end())
    }
}
