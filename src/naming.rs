//! # Archive File Naming
//!
//! Builds the file names used by duration-aligned post-processed archives,
//! where every file covers a fixed block of `duration` years starting at a
//! multiple of `duration` from the archive's first year.
//!
//! ## Name Formats
//!
//! | Representation | Granularity | Name |
//! |---|---|---|
//! | `ts`/`inst` | annual | `atmos.0021.t_surf.nc` or `atmos.0021-0025.t_surf.nc` |
//! | `ts`/`inst` | monthly | `atmos.002101-002512.t_surf.nc` |
//! | `ts`/`inst` | daily | `atmos.00210101-00251231.t_surf.nc` |
//! | `ts`/`inst` | `*hr` | `atmos.0021010100-0025123123.t_surf.nc` |
//! | `av` | annual | `atmos.0021-0025.ann.nc` |
//! | `av` | monthly | `atmos.0021-0025.jja.nc` |
//! | `av_ts` | any | `atmos.0021-0025.01-12.nc` |
//!
//! ## Example
//!
//! ```rust
//! use ncarchive::naming::{build_name, ArchiveFileDescriptor, DataRepresentation, Granularity};
//!
//! let descriptor = ArchiveFileDescriptor {
//!     variable: "t_surf".to_string(),
//!     domain: "atmos".to_string(),
//!     representation: DataRepresentation::TimeSeries,
//!     granularity: Granularity::Annual,
//!     interval: None,
//!     duration_years: 5,
//!     data_year: 23,
//!     archive_start_year: 1,
//! };
//! assert_eq!(build_name(&descriptor)?, "atmos.0021-0025.t_surf.nc");
//! # Ok::<(), ncarchive::error::ArchiveError>(())
//! ```

use crate::error::{ArchiveError, ArchiveResult};
use crate::interval::{resolve, IntervalSpec};
use crate::labels::DateRange;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// How the archived data is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataRepresentation {
    /// Time series (`ts`)
    TimeSeries,
    /// Instantaneous snapshots (`inst`)
    Instantaneous,
    /// Time-averaged statistic over an interval (`av`)
    Averaged,
    /// Series of interval averages (`av_ts`)
    AveragedTimeSeries,
}

impl DataRepresentation {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataRepresentation::TimeSeries => "ts",
            DataRepresentation::Instantaneous => "inst",
            DataRepresentation::Averaged => "av",
            DataRepresentation::AveragedTimeSeries => "av_ts",
        }
    }

    /// Top-level archive directory holding files of this representation.
    pub fn directory(&self) -> &'static str {
        match self {
            DataRepresentation::TimeSeries | DataRepresentation::Instantaneous => "ts",
            DataRepresentation::Averaged | DataRepresentation::AveragedTimeSeries => "av",
        }
    }
}

impl FromStr for DataRepresentation {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "ts" | "time_series" => Ok(DataRepresentation::TimeSeries),
            "inst" | "instantaneous" => Ok(DataRepresentation::Instantaneous),
            "av" | "averaged" | "time_averaged" => Ok(DataRepresentation::Averaged),
            "av_ts" | "time_averaged_time_series" => Ok(DataRepresentation::AveragedTimeSeries),
            _ => Err(ArchiveError::InvalidSpec {
                kind: "data representation",
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for DataRepresentation {
    type Error = ArchiveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DataRepresentation> for String {
    fn from(value: DataRepresentation) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for DataRepresentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sampling frequency of the archived data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Granularity {
    Annual,
    Seasonal,
    Monthly,
    Daily,
    /// Sub-daily output such as `3hr` or `6hr`, kept verbatim
    SubDaily(String),
}

impl Granularity {
    pub fn as_str(&self) -> &str {
        match self {
            Granularity::Annual => "annual",
            Granularity::Seasonal => "seasonal",
            Granularity::Monthly => "monthly",
            Granularity::Daily => "daily",
            Granularity::SubDaily(tag) => tag,
        }
    }
}

impl FromStr for Granularity {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim().to_lowercase();
        match text.as_str() {
            "annual" | "ann" => Ok(Granularity::Annual),
            "seasonal" | "seas" => Ok(Granularity::Seasonal),
            "monthly" | "mon" => Ok(Granularity::Monthly),
            "daily" | "day" => Ok(Granularity::Daily),
            _ if text.contains("hr") => Ok(Granularity::SubDaily(text)),
            _ => Err(ArchiveError::InvalidSpec {
                kind: "granularity",
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Granularity {
    type Error = ArchiveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Granularity> for String {
    fn from(value: Granularity) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to name one archive file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFileDescriptor {
    pub variable: String,
    pub domain: String,
    pub representation: DataRepresentation,
    pub granularity: Granularity,
    /// Averaging window, required for monthly `av` files
    pub interval: Option<IntervalSpec>,
    pub duration_years: u32,
    pub data_year: i32,
    pub archive_start_year: i32,
}

/// The block of years covered by one archive file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveBlock {
    pub start_year: i32,
    pub end_year: i32,
}

impl ArchiveBlock {
    /// `YYYY` for a one-year block, `YYYY-YYYY` otherwise.
    pub fn label(&self) -> String {
        if self.start_year == self.end_year {
            format!("{:04}", self.start_year)
        } else {
            self.span_label()
        }
    }

    /// `YYYY-YYYY`, even for a one-year block.
    pub fn span_label(&self) -> String {
        format!("{:04}-{:04}", self.start_year, self.end_year)
    }
}

/// Aligns `data_year` onto the start of the archive block that contains it.
///
/// The offset from `archive_start_year` is taken with Euclidean remainder, so
/// the block start never lies after `data_year`.
///
/// # Errors
///
/// Returns [`ArchiveError::InvalidDuration`] for a zero duration, or one too
/// long for the block to be expressed in `i32` years.
pub fn archive_block(
    data_year: i32,
    archive_start_year: i32,
    duration_years: u32,
) -> ArchiveResult<ArchiveBlock> {
    let invalid = || ArchiveError::InvalidDuration(duration_years);
    if duration_years == 0 {
        return Err(invalid());
    }
    let duration = i32::try_from(duration_years).map_err(|_| invalid())?;
    let extra_years = data_year
        .checked_sub(archive_start_year)
        .ok_or_else(invalid)?
        .rem_euclid(duration);
    let start_year = data_year - extra_years;
    let end_year = start_year
        .checked_add(duration - 1)
        .ok_or_else(invalid)?;
    Ok(ArchiveBlock {
        start_year,
        end_year,
    })
}

/// The naming variants of the duration-aligned convention.
#[derive(Debug, Clone, PartialEq, Eq)]
enum NamingRule {
    AnnualSeries,
    MonthlySeries,
    DailySeries,
    SubDailySeries,
    Averaged { label: String },
    AveragedSeries,
}

impl NamingRule {
    fn for_descriptor(descriptor: &ArchiveFileDescriptor) -> ArchiveResult<Self> {
        use DataRepresentation::*;

        let unsupported = || ArchiveError::UnsupportedRepresentation {
            representation: descriptor.representation.to_string(),
            granularity: descriptor.granularity.to_string(),
        };

        match (&descriptor.representation, &descriptor.granularity) {
            (TimeSeries | Instantaneous, Granularity::Annual) => Ok(NamingRule::AnnualSeries),
            (TimeSeries | Instantaneous, Granularity::Monthly) => Ok(NamingRule::MonthlySeries),
            (TimeSeries | Instantaneous, Granularity::Daily) => Ok(NamingRule::DailySeries),
            (TimeSeries | Instantaneous, Granularity::SubDaily(_)) => {
                Ok(NamingRule::SubDailySeries)
            }
            (Averaged, Granularity::Annual) => Ok(NamingRule::Averaged {
                label: "ann".to_string(),
            }),
            (Averaged, Granularity::Monthly) => {
                let interval = descriptor.interval.as_ref().ok_or_else(unsupported)?;
                Ok(NamingRule::Averaged {
                    label: resolve(interval)?.label,
                })
            }
            (AveragedTimeSeries, _) => Ok(NamingRule::AveragedSeries),
            _ => Err(unsupported()),
        }
    }

    fn render(&self, domain: &str, variable: &str, block: ArchiveBlock) -> String {
        let (start, end) = (block.start_year, block.end_year);
        match self {
            NamingRule::AnnualSeries => format!("{}.{}.{}.nc", domain, block.label(), variable),
            NamingRule::MonthlySeries => {
                format!("{}.{:04}01-{:04}12.{}.nc", domain, start, end, variable)
            }
            NamingRule::DailySeries => {
                format!("{}.{:04}0101-{:04}1231.{}.nc", domain, start, end, variable)
            }
            NamingRule::SubDailySeries => {
                format!("{}.{:04}010100-{:04}123123.{}.nc", domain, start, end, variable)
            }
            NamingRule::Averaged { label } => format!("{}.{}.{}.nc", domain, block.label(), label),
            NamingRule::AveragedSeries => format!("{}.{}.01-12.nc", domain, block.span_label()),
        }
    }
}

/// Builds the archive file name for a descriptor.
///
/// # Errors
///
/// - [`ArchiveError::InvalidDuration`] for a zero duration
/// - [`ArchiveError::UnsupportedRepresentation`] when the representation and
///   granularity combination has no naming rule
/// - [`ArchiveError::UnresolvedInterval`] when a monthly `av` interval is not
///   in the vocabulary
pub fn build_name(descriptor: &ArchiveFileDescriptor) -> ArchiveResult<String> {
    let block = archive_block(
        descriptor.data_year,
        descriptor.archive_start_year,
        descriptor.duration_years,
    )?;
    let rule = NamingRule::for_descriptor(descriptor)?;
    let name = rule.render(&descriptor.domain, &descriptor.variable, block);
    debug!(
        "Year {} falls in block {}-{}: {}",
        descriptor.data_year, block.start_year, block.end_year, name
    );
    Ok(name)
}

/// Names of every archive file needed to cover `start_year..=end_year`,
/// in chronological order and without duplicates.
pub fn build_names(
    descriptor: &ArchiveFileDescriptor,
    start_year: i32,
    end_year: i32,
) -> ArchiveResult<Vec<String>> {
    let range = DateRange::new(start_year, end_year)?;
    let mut names: Vec<String> = Vec::new();
    for year in range.start()..=range.end() {
        let name = build_name(&ArchiveFileDescriptor {
            data_year: year,
            ..descriptor.clone()
        })?;
        if names.last() != Some(&name) {
            names.push(name);
        }
    }
    Ok(names)
}

/// Directory layout of a post-processed archive rooted at `root`:
/// `root/<domain>/<ts|av>/<granularity>/<duration>yr/<file>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLayout {
    root: PathBuf,
}

impl ArchiveLayout {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        ArchiveLayout {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the files of a descriptor.
    pub fn directory_for(&self, descriptor: &ArchiveFileDescriptor) -> PathBuf {
        self.root
            .join(&descriptor.domain)
            .join(descriptor.representation.directory())
            .join(descriptor.granularity.as_str())
            .join(format!("{}yr", descriptor.duration_years))
    }

    /// Full path of the archive file for a descriptor.
    pub fn path_for(&self, descriptor: &ArchiveFileDescriptor) -> ArchiveResult<PathBuf> {
        Ok(self.directory_for(descriptor).join(build_name(descriptor)?))
    }

    /// Full paths of the files covering `start_year..=end_year`.
    pub fn paths_for_years(
        &self,
        descriptor: &ArchiveFileDescriptor,
        start_year: i32,
        end_year: i32,
    ) -> ArchiveResult<Vec<PathBuf>> {
        let directory = self.directory_for(descriptor);
        Ok(build_names(descriptor, start_year, end_year)?
            .into_iter()
            .map(|name| directory.join(name))
            .collect())
    }
}
