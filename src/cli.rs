//! # CLI Module
//!
//! This module provides the command-line interface for ncarchive, including:
//! - Argument parsing with clap
//! - Job configuration loading (JSON/YAML) through the global `--config`
//! - Environment variable support with the NCARCHIVE_ prefix
//! - Merging of command-line descriptor flags over a job configuration
//! - Parsers for year ranges, intervals and month selections

use crate::input::JobConfig;
use crate::interval::{IntervalSpec, months_from_letters, resolve};
use crate::labels::DateRange;
use crate::naming::{ArchiveFileDescriptor, DataRepresentation, Granularity};
use crate::select::SelectMode;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Locate files in duration-aligned climate-model archives
#[derive(Parser, Debug)]
#[command(name = "ncarchive")]
#[command(about = "Name, locate, stage and select from climate-model archive files")]
#[command(version)]
#[command(long_about = "
ncarchive works with the archives written by climate-model post-processing,
where each variable is stored in files covering fixed multi-year blocks.

FEATURES:
  • Interval vocabulary: months, month lists and season codes (jja, djf, ann)
  • File naming: time series and time-averaged names aligned to archive blocks
  • Time selection: year and month masks over CF time axes of netCDF files
  • Staging: bring archive files online with dmget or hsmget
  • Shell completions: Auto-completion for bash, zsh, fish, and PowerShell

EXAMPLES:
  # Resolve an interval
  ncarchive interval 6,7,8

  # Name the files holding years 21-30 of a 5-year archive
  ncarchive name -n t_surf -d atmos -r ts -g monthly \\
    --duration 5 --start-year 1 --years 21:30

  # Select summer months of a file's time axis
  ncarchive select atmos.002101-002512.t_surf.nc --years 21:25 --months jja

  # Stage every file of a job
  ncarchive --config t_surf.yaml stage
")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode - suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format for structured data
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Job configuration file path (JSON or YAML)
    #[arg(short, long, global = true, env = "NCARCHIVE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve an interval to its label and months
    #[command(long_about = "
Resolve a month, a list of months or a season code to its canonical label
and the months it covers.

EXAMPLES:
  ncarchive interval 7          # jul
  ncarchive interval 12,1,2     # djf
  ncarchive interval son
  ncarchive interval ann
")]
    Interval {
        /// Month number, comma-separated months, or season code
        #[arg(value_parser = parse_interval)]
        spec: IntervalSpec,
    },

    /// Build archive file names or paths
    #[command(long_about = "
Build the archive file name for a variable and year, or every name covering
a range of years. Values missing from the command line are taken from the
job configuration given with --config.

When an archive root is known (--root or the configuration), full paths of
the form <root>/<domain>/<ts|av>/<granularity>/<duration>yr/<file> are
printed instead of bare names.

EXAMPLES:
  # One file
  ncarchive name -n t_surf -d atmos -r ts -g annual \\
    --duration 5 --start-year 1 --years 23

  # Every June-August average from years 21 to 80
  ncarchive name -n t_surf -d atmos -r av -g monthly -i jja \\
    --duration 5 --start-year 1 --years 21:80

  # From a job configuration, overriding the variable
  ncarchive --config t_surf.yaml name -n precip
")]
    Name {
        #[command(flatten)]
        descriptor: DescriptorArgs,
    },

    /// Select time steps of a netCDF file by year and month
    #[command(long_about = "
Decode the time axis of a netCDF file using its units and calendar
attributes, then select the steps inside a year range and set of months.

Months may be a month number, a comma-separated list, a season code, or a
run of month initials (e.g. 'ndjfm').

EXAMPLES:
  ncarchive select data.nc --years 1981:2010 --months djf
  ncarchive select data.nc --years 21:25 --months 6,7,8 --mode both
  ncarchive select data.nc --years 1 --time-var Time --mode values
")]
    Select {
        /// NetCDF file to read
        file: PathBuf,

        /// Name of the time coordinate variable
        #[arg(long, default_value = "time", env = "NCARCHIVE_TIME_VAR")]
        time_var: String,

        /// Year range: start:end (inclusive) or a single year
        #[arg(long, value_parser = parse_year_range)]
        years: DateRange,

        /// Months to keep (default: all)
        #[arg(long, value_parser = parse_months)]
        months: Option<MonthsArg>,

        /// What to report: mask, values or both
        #[arg(long, default_value = "mask", value_parser = parse_select_mode)]
        mode: SelectMode,
    },

    /// Resolve a versioned dataset directory
    #[command(long_about = "
List the version directories (names starting with 'v') under a dataset
root, pick one by index and append the selector. Negative indices count
from the most recent version.

EXAMPLES:
  ncarchive version /data/CMIP5/tas Amon          # latest
  ncarchive version /data/CMIP5/tas Amon --index 0
  ncarchive version /data/CMIP5/tas Amon --index -2
")]
    Version {
        /// Dataset root holding the version directories
        root: PathBuf,

        /// Path appended below the chosen version
        selector: String,

        /// Version index; negative counts from the latest
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        index: isize,
    },

    /// Stage every archive file of a job configuration
    #[command(long_about = "
Locate every archive file a job configuration needs and bring them online
with the staging backend it names (local, dmget or hsmget).

EXAMPLES:
  ncarchive --config t_surf.yaml stage
  ncarchive --config t_surf.yaml stage --dry-run
")]
    Stage {
        /// List the files without staging them
        #[arg(long, env = "NCARCHIVE_DRY_RUN")]
        dry_run: bool,
    },

    /// Generate shell completions
    #[command(long_about = "
Generate shell completion scripts for bash, zsh, fish, and PowerShell.

INSTALLATION:
  # Bash
  ncarchive completions bash > ~/.bash_completion.d/ncarchive

  # Zsh
  ncarchive completions zsh > ~/.zsh/completions/_ncarchive

  # Fish
  ncarchive completions fish > ~/.config/fish/completions/ncarchive.fish
")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON structured output
    Json,
    /// YAML structured output
    Yaml,
}

/// Month selection argument from command line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonthsArg(pub Vec<u8>);

/// Descriptor flags of the `name` command. Each one overrides the matching
/// job configuration value.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct DescriptorArgs {
    /// Archived variable name
    #[arg(short = 'n', long, env = "NCARCHIVE_VARIABLE")]
    pub variable: Option<String>,

    /// Model component (atmos, ocean, ...)
    #[arg(short, long, env = "NCARCHIVE_DOMAIN")]
    pub domain: Option<String>,

    /// Data representation: ts, inst, av or av_ts
    #[arg(short, long, env = "NCARCHIVE_REPRESENTATION", value_parser = parse_representation)]
    pub representation: Option<DataRepresentation>,

    /// Granularity: annual, monthly, daily, 3hr, ...
    #[arg(short, long, env = "NCARCHIVE_GRANULARITY", value_parser = parse_granularity)]
    pub granularity: Option<Granularity>,

    /// Averaging interval for monthly av files
    #[arg(short, long, env = "NCARCHIVE_INTERVAL", value_parser = parse_interval)]
    pub interval: Option<IntervalSpec>,

    /// Years held by each archive file
    #[arg(long, env = "NCARCHIVE_DURATION")]
    pub duration: Option<u32>,

    /// First year of the archive
    #[arg(long, env = "NCARCHIVE_START_YEAR", allow_negative_numbers = true)]
    pub start_year: Option<i32>,

    /// Year range: start:end (inclusive) or a single year
    #[arg(long, env = "NCARCHIVE_YEARS", value_parser = parse_year_range)]
    pub years: Option<DateRange>,

    /// Archive root; prints full paths when known
    #[arg(long, env = "NCARCHIVE_ROOT")]
    pub root: Option<PathBuf>,
}

/// A fully specified naming request.
#[derive(Debug, Clone, PartialEq)]
pub struct NameRequest {
    pub descriptor: ArchiveFileDescriptor,
    pub years: DateRange,
    pub root: Option<PathBuf>,
}

impl DescriptorArgs {
    /// Merges the flags over an optional job configuration.
    /// Priority: CLI arguments > configuration file.
    pub fn resolve(&self, base: Option<&JobConfig>) -> Result<NameRequest, String> {
        let missing = |flag: &str| format!("Missing {} (give it on the command line or in --config)", flag);

        let variable = self
            .variable
            .clone()
            .or_else(|| base.map(|c| c.variable.clone()))
            .ok_or_else(|| missing("--variable"))?;
        let domain = self
            .domain
            .clone()
            .or_else(|| base.map(|c| c.domain.clone()))
            .ok_or_else(|| missing("--domain"))?;
        let representation = self
            .representation
            .or_else(|| base.map(|c| c.representation))
            .ok_or_else(|| missing("--representation"))?;
        let granularity = self
            .granularity
            .clone()
            .or_else(|| base.map(|c| c.granularity.clone()))
            .ok_or_else(|| missing("--granularity"))?;
        let interval = self
            .interval
            .clone()
            .or_else(|| base.and_then(|c| c.interval.clone()));
        let duration_years = self
            .duration
            .or_else(|| base.map(|c| c.run.duration))
            .ok_or_else(|| missing("--duration"))?;
        let archive_start_year = self
            .start_year
            .or_else(|| base.map(|c| c.run.start_year))
            .ok_or_else(|| missing("--start-year"))?;
        let years = self
            .years
            .or_else(|| base.and_then(|c| c.years().ok()))
            .ok_or_else(|| missing("--years"))?;
        let root = self
            .root
            .clone()
            .or_else(|| base.map(|c| c.run.root.clone()));

        Ok(NameRequest {
            descriptor: ArchiveFileDescriptor {
                variable,
                domain,
                representation,
                granularity,
                interval,
                duration_years,
                data_year: years.start(),
                archive_start_year,
            },
            years,
            root,
        })
    }
}

/// Parse a year range from a command line argument
/// Format: start:end or a single year
pub fn parse_year_range(s: &str) -> Result<DateRange, String> {
    let parse_year = |text: &str| {
        text.trim()
            .parse::<i32>()
            .map_err(|_| format!("Invalid year '{}' in range '{}'", text.trim(), s))
    };

    let (start, end) = match s.split_once(':') {
        Some((start, end)) => (parse_year(start)?, parse_year(end)?),
        None => {
            let year = parse_year(s)?;
            (year, year)
        }
    };
    DateRange::new(start, end).map_err(|e| e.to_string())
}

/// Parse an interval: month number, comma-separated months or season code.
/// Only intervals with a canonical label are accepted.
pub fn parse_interval(s: &str) -> Result<IntervalSpec, String> {
    let spec = s.parse::<IntervalSpec>().map_err(|e| e.to_string())?;
    resolve(&spec).map_err(|e| e.to_string())?;
    Ok(spec)
}

/// Parse a month selection: month numbers, a season code, or a run of month
/// initials
/// Format: 7 | 1,5,9 | jja | ndjfm
pub fn parse_months(s: &str) -> Result<MonthsArg, String> {
    let is_month = |m: &u8| (1..=12).contains(m);
    let months = match s.parse::<IntervalSpec>() {
        Ok(IntervalSpec::Month(month)) if is_month(&month) => Ok(vec![month]),
        Ok(IntervalSpec::Months(months)) if !months.is_empty() && months.iter().all(is_month) => {
            Ok(months)
        }
        Ok(spec) => match resolve(&spec) {
            Ok(resolved) => Ok(resolved.months),
            Err(_) => months_from_letters(s).map_err(|e| e.to_string()),
        },
        Err(_) => months_from_letters(s).map_err(|e| e.to_string()),
    }?;
    Ok(MonthsArg(months))
}

fn parse_select_mode(s: &str) -> Result<SelectMode, String> {
    s.parse::<SelectMode>().map_err(|e| e.to_string())
}

fn parse_representation(s: &str) -> Result<DataRepresentation, String> {
    s.parse::<DataRepresentation>().map_err(|e| e.to_string())
}

fn parse_granularity(s: &str) -> Result<Granularity, String> {
    s.parse::<Granularity>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{JobConfig, RunConfig};
    use crate::staging::StagingConfig;

    fn job() -> JobConfig {
        JobConfig {
            run: RunConfig {
                name: "test_am2".to_string(),
                root: PathBuf::from("/archive/pp"),
                duration: 5,
                start_year: 1,
                default_years: Some(DateRange::new(21, 80).unwrap()),
            },
            variable: "t_surf".to_string(),
            domain: "atmos".to_string(),
            representation: DataRepresentation::TimeSeries,
            granularity: Granularity::Monthly,
            interval: None,
            years: None,
            ensemble_member: None,
            staging: StagingConfig::default(),
        }
    }

    #[test]
    fn test_parse_year_range() {
        let range = parse_year_range("1981:2010").unwrap();
        assert_eq!((range.start(), range.end()), (1981, 2010));

        let single = parse_year_range("21").unwrap();
        assert_eq!((single.start(), single.end()), (21, 21));

        // Test invalid formats
        assert!(parse_year_range("2010:1981").is_err()); // end < start
        assert!(parse_year_range("1981:").is_err());
        assert!(parse_year_range("abc").is_err());
        assert!(parse_year_range("1:2:3").is_err());
    }

    #[test]
    fn test_parse_months() {
        assert_eq!(parse_months("7").unwrap().0, vec![7]);
        assert_eq!(parse_months("6,7,8").unwrap().0, vec![6, 7, 8]);
        // Month lists need not form a season
        assert_eq!(parse_months("1,5,9").unwrap().0, vec![1, 5, 9]);
        assert_eq!(parse_months("djf").unwrap().0, vec![1, 2, 12]);
        assert_eq!(parse_months("ann").unwrap().0.len(), 12);
        // Initials that are not a season code
        assert_eq!(parse_months("ndjfm").unwrap().0, vec![11, 12, 1, 2, 3]);

        assert!(parse_months("xyz").is_err());
        assert!(parse_months("0,13").is_err());
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("7").unwrap(), IntervalSpec::Month(7));
        assert_eq!(
            parse_interval("jja").unwrap(),
            IntervalSpec::Season("jja".to_string())
        );
        assert!(parse_interval("13").is_err());
        assert!(parse_interval("1,5").is_err()); // no canonical label
        assert!(parse_interval("xyz").is_err());
    }

    #[test]
    fn test_descriptor_from_flags_only() {
        let args = DescriptorArgs {
            variable: Some("t_surf".to_string()),
            domain: Some("atmos".to_string()),
            representation: Some(DataRepresentation::TimeSeries),
            granularity: Some(Granularity::Annual),
            duration: Some(5),
            start_year: Some(1),
            years: Some(DateRange::new(23, 23).unwrap()),
            ..Default::default()
        };
        let request = args.resolve(None).unwrap();
        assert_eq!(request.descriptor.data_year, 23);
        assert_eq!(request.descriptor.duration_years, 5);
        assert!(request.root.is_none());
    }

    #[test]
    fn test_descriptor_missing_flag() {
        let args = DescriptorArgs {
            variable: Some("t_surf".to_string()),
            ..Default::default()
        };
        let err = args.resolve(None).unwrap_err();
        assert!(err.contains("--domain"));
    }

    #[test]
    fn test_descriptor_merge_priority() {
        let config = job();

        // Config alone
        let request = DescriptorArgs::default().resolve(Some(&config)).unwrap();
        assert_eq!(request.descriptor.variable, "t_surf");
        assert_eq!((request.years.start(), request.years.end()), (21, 80));
        assert_eq!(request.root, Some(PathBuf::from("/archive/pp")));

        // CLI arguments win over the config
        let args = DescriptorArgs {
            variable: Some("precip".to_string()),
            years: Some(DateRange::new(31, 35).unwrap()),
            root: Some(PathBuf::from("/scratch/pp")),
            ..Default::default()
        };
        let request = args.resolve(Some(&config)).unwrap();
        assert_eq!(request.descriptor.variable, "precip");
        assert_eq!(request.descriptor.domain, "atmos");
        assert_eq!(request.years.start(), 31);
        assert_eq!(request.root, Some(PathBuf::from("/scratch/pp")));
    }
}
