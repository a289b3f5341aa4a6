//! # Archive Staging Module
//!
//! Files in a tape-backed archive must be staged (recalled to disk or copied
//! to a work area) before they can be read. This module puts the available
//! staging tools behind one async interface.
//!
//! ## Backends
//!
//! - **Local**: files are already on disk; staging only verifies they exist
//! - **dmget**: `dmget <paths...>` recalls files in place
//! - **hsmget**: `hsmget -a <archive root> -p <workdir> -w <ptmpdir> <files...> -q`
//!   copies files to a work directory
//!
//! Work directories are always taken from [`StagingConfig`], never from the
//! process environment.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use ncarchive::staging::{StagingBackend, StagingConfig, StagingFactory};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let staging = StagingFactory::from_config(&StagingConfig::default())?;
//!     staging.stage(&[PathBuf::from("/archive/pp/atmos.0021-0025.t_surf.nc")]).await?;
//!     Ok(())
//! }
//! ```

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;

/// Errors that can occur while staging archive files
#[derive(Error, Debug)]
pub enum StagingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Staging command '{program}' exited with status {code:?}")]
    CommandFailed { program: String, code: Option<i32> },

    #[error("Invalid archive path: {0}")]
    InvalidPath(String),

    #[error("Missing staging setting: {0}")]
    MissingSetting(&'static str),
}

/// Result type for staging operations
pub type StagingResult<T> = Result<T, StagingError>;

/// Interface of an archive staging tool.
#[async_trait::async_trait]
pub trait StagingBackend: Send + Sync {
    /// Makes every path in `paths` available for reading.
    ///
    /// Paths are absolute archive paths. An empty list is a no-op.
    async fn stage(&self, paths: &[PathBuf]) -> StagingResult<()>;
}

/// Which staging tool to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StagingKind {
    #[default]
    Local,
    Dmget,
    Hsmget,
}

/// Staging settings, as read from a job configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StagingConfig {
    #[serde(default)]
    pub backend: StagingKind,
    /// Override for the staging executable
    #[serde(default)]
    pub program: Option<String>,
    /// hsmget destination directory (`-p`)
    #[serde(default)]
    pub workdir: Option<PathBuf>,
    /// hsmget scratch directory (`-w`)
    #[serde(default)]
    pub ptmpdir: Option<PathBuf>,
}

/// Files already on a local filesystem.
#[derive(Debug, Clone, Default)]
pub struct LocalStaging;

#[async_trait::async_trait]
impl StagingBackend for LocalStaging {
    async fn stage(&self, paths: &[PathBuf]) -> StagingResult<()> {
        for path in paths {
            match tokio::fs::metadata(path).await {
                Ok(_) => debug!("Found local file: {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(StagingError::PathNotFound(path.display().to_string()));
                }
                Err(e) => return Err(StagingError::Io(e)),
            }
        }
        Ok(())
    }
}

/// Recalls files in place with `dmget`.
#[derive(Debug, Clone)]
pub struct DmgetStaging {
    program: String,
}

impl DmgetStaging {
    pub fn new() -> Self {
        Self::with_program("dmget")
    }

    pub fn with_program(program: &str) -> Self {
        DmgetStaging {
            program: program.to_string(),
        }
    }
}

impl Default for DmgetStaging {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl StagingBackend for DmgetStaging {
    async fn stage(&self, paths: &[PathBuf]) -> StagingResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        info!("Recalling {} file(s) with {}", paths.len(), self.program);
        run(&self.program, paths.iter().map(|p| p.display().to_string()).collect()).await
    }
}

/// Copies files out of the archive with `hsmget`.
#[derive(Debug, Clone)]
pub struct HsmgetStaging {
    program: String,
    workdir: PathBuf,
    ptmpdir: PathBuf,
}

impl HsmgetStaging {
    pub fn new(workdir: PathBuf, ptmpdir: PathBuf) -> Self {
        HsmgetStaging {
            program: "hsmget".to_string(),
            workdir,
            ptmpdir,
        }
    }

    pub fn with_program(mut self, program: &str) -> Self {
        self.program = program.to_string();
        self
    }

    /// Builds the hsmget argument list.
    ///
    /// The archive root is the first two directories of the first path (e.g.
    /// `/archive/user/`); every path is given relative to it, so all paths
    /// must share that root.
    pub fn arguments(&self, paths: &[PathBuf]) -> StagingResult<Vec<String>> {
        let first = paths
            .first()
            .ok_or_else(|| StagingError::InvalidPath("no files to stage".to_string()))?;
        let root = archive_root(first)?;

        let mut args = vec![
            "-a".to_string(),
            format!("{}/", root.display()),
            "-p".to_string(),
            self.workdir.display().to_string(),
            "-w".to_string(),
            self.ptmpdir.display().to_string(),
        ];
        for path in paths {
            let relative = path
                .strip_prefix(&root)
                .map_err(|_| StagingError::InvalidPath(path.display().to_string()))?;
            args.push(relative.display().to_string());
        }
        args.push("-q".to_string());
        Ok(args)
    }
}

#[async_trait::async_trait]
impl StagingBackend for HsmgetStaging {
    async fn stage(&self, paths: &[PathBuf]) -> StagingResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let args = self.arguments(paths)?;
        info!(
            "Copying {} file(s) to {} with {}",
            paths.len(),
            self.workdir.display(),
            self.program
        );
        run(&self.program, args).await
    }
}

/// The root directory and its first child, e.g. `/archive/user`.
fn archive_root(path: &Path) -> StagingResult<PathBuf> {
    let mut components = path.components();
    match (components.next(), components.next(), components.next()) {
        (Some(Component::RootDir), Some(Component::Normal(top)), Some(Component::Normal(owner))) => {
            Ok(Path::new("/").join(top).join(owner))
        }
        _ => Err(StagingError::InvalidPath(path.display().to_string())),
    }
}

async fn run(program: &str, args: Vec<String>) -> StagingResult<()> {
    debug!("{} {}", program, args.join(" "));
    let status = Command::new(program).args(&args).status().await?;
    if status.success() {
        Ok(())
    } else {
        Err(StagingError::CommandFailed {
            program: program.to_string(),
            code: status.code(),
        })
    }
}

/// Staging backend enumeration
#[derive(Debug)]
pub enum Staging {
    Local(LocalStaging),
    Dmget(DmgetStaging),
    Hsmget(HsmgetStaging),
}

#[async_trait::async_trait]
impl StagingBackend for Staging {
    async fn stage(&self, paths: &[PathBuf]) -> StagingResult<()> {
        match self {
            Staging::Local(staging) => staging.stage(paths).await,
            Staging::Dmget(staging) => staging.stage(paths).await,
            Staging::Hsmget(staging) => staging.stage(paths).await,
        }
    }
}

/// Factory for creating staging backends from configuration
pub struct StagingFactory;

impl StagingFactory {
    /// Builds the backend described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StagingError::MissingSetting`] for hsmget without a
    /// `workdir` or `ptmpdir`.
    pub fn from_config(config: &StagingConfig) -> StagingResult<Staging> {
        match config.backend {
            StagingKind::Local => Ok(Staging::Local(LocalStaging)),
            StagingKind::Dmget => Ok(Staging::Dmget(match &config.program {
                Some(program) => DmgetStaging::with_program(program),
                None => DmgetStaging::new(),
            })),
            StagingKind::Hsmget => {
                let workdir = config
                    .workdir
                    .clone()
                    .ok_or(StagingError::MissingSetting("workdir"))?;
                let ptmpdir = config
                    .ptmpdir
                    .clone()
                    .ok_or(StagingError::MissingSetting("ptmpdir"))?;
                let staging = HsmgetStaging::new(workdir, ptmpdir);
                Ok(Staging::Hsmget(match &config.program {
                    Some(program) => staging.with_program(program),
                    None => staging,
                }))
            }
        }
    }
}
