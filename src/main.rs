use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser};
use log::info;
use ncarchive::calendar::CfDecoder;
use ncarchive::cli::{Cli, Commands, DescriptorArgs, MonthsArg, OutputFormat};
use ncarchive::dataset::read_time_axis;
use ncarchive::input::JobConfig;
use ncarchive::interval::{IntervalSpec, resolve};
use ncarchive::labels::DateRange;
use ncarchive::log::{config_echo, init_logging, show_farewell_with_timing, show_greeting};
use ncarchive::naming::{ArchiveLayout, build_names};
use ncarchive::select::{SelectMode, TimeAxisQuery};
use ncarchive::version::{VersionIndex, resolve_version_dir};
use ncarchive::{locate_archive_files, stage_archive_files};
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match &cli.command {
        Commands::Interval { spec } => run_interval(spec, cli.output_format),
        Commands::Name { descriptor } => run_name(descriptor, &cli),
        Commands::Select {
            file,
            time_var,
            years,
            months,
            mode,
        } => run_select(file, time_var, *years, months.as_ref(), *mode, cli.output_format),
        Commands::Version {
            root,
            selector,
            index,
        } => run_version(root, selector, *index, cli.output_format),
        Commands::Stage { dry_run } => run_stage(&cli, *dry_run).await,
        Commands::Completions { shell, output } => run_completions(*shell, output.as_deref()),
    }
}

fn emit<T: Serialize>(format: OutputFormat, value: &T, human: impl FnOnce(&T)) -> Result<()> {
    match format {
        OutputFormat::Human => human(value),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Option<JobConfig>> {
    cli.config
        .as_ref()
        .map(|path| {
            info!("Loading configuration from {}", path.display());
            JobConfig::from_file(path)
        })
        .transpose()
}

fn run_interval(spec: &IntervalSpec, format: OutputFormat) -> Result<()> {
    let resolved = resolve(spec)?;
    emit(format, &resolved, |r| {
        let months: Vec<String> = r.months.iter().map(|m| m.to_string()).collect();
        println!("{}: {}", r.label, months.join(", "));
    })
}

fn run_name(args: &DescriptorArgs, cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let request = args.resolve(config.as_ref()).map_err(|e| anyhow!(e))?;
    let (start, end) = (request.years.start(), request.years.end());

    let entries: Vec<String> = match &request.root {
        Some(root) => ArchiveLayout::new(root)
            .paths_for_years(&request.descriptor, start, end)?
            .iter()
            .map(|path| path.display().to_string())
            .collect(),
        None => build_names(&request.descriptor, start, end)?,
    };
    emit(cli.output_format, &entries, |entries| {
        for entry in entries {
            println!("{}", entry);
        }
    })
}

#[derive(Serialize)]
struct SelectReport<'a> {
    file: &'a Path,
    units: &'a str,
    calendar: &'a str,
    total: usize,
    selected: usize,
    indices: Option<Vec<usize>>,
    selection: ncarchive::select::Selection<f64>,
}

fn run_select(
    file: &Path,
    time_var: &str,
    years: DateRange,
    months: Option<&MonthsArg>,
    mode: SelectMode,
    format: OutputFormat,
) -> Result<()> {
    let axis = read_time_axis(file, time_var)
        .with_context(|| format!("Cannot read time axis of {}", file.display()))?;
    let months = months.map(|m| m.0.clone()).unwrap_or_else(|| (1..=12).collect());
    let query = TimeAxisQuery::new(years.start(), years.end(), months, mode)?;
    let selection = axis.select(&query, &CfDecoder)?;

    let report = SelectReport {
        file,
        units: &axis.units,
        calendar: &axis.calendar,
        total: axis.values.len(),
        selected: selection.len(),
        indices: selection.indices(),
        selection,
    };
    emit(format, &report, |r| {
        println!(
            "{}: {} of {} time steps selected ({}, {})",
            r.file.display(),
            r.selected,
            r.total,
            r.units,
            r.calendar
        );
        if let Some(indices) = &r.indices {
            println!("  indices: {:?}", indices);
        }
        if let Some(values) = r.selection.values() {
            println!("  values: {:?}", values);
        }
    })
}

fn run_version(root: &Path, selector: &str, index: isize, format: OutputFormat) -> Result<()> {
    let path = resolve_version_dir(root, selector, VersionIndex(index))?;
    emit(format, &path, |path| println!("{}", path.display()))
}

async fn run_stage(cli: &Cli, dry_run: bool) -> Result<()> {
    let start_time = Instant::now();
    let config_path = cli
        .config
        .as_ref()
        .ok_or_else(|| anyhow!("The stage command needs a job configuration (--config)"))?;
    let human = cli.output_format == OutputFormat::Human && !cli.quiet;

    if human {
        show_greeting(&config_path.display().to_string());
    }
    let config = JobConfig::from_file(config_path)?;
    if human {
        config_echo(&config);
    }

    let files: Vec<PathBuf> = if dry_run {
        locate_archive_files(&config)?
    } else {
        stage_archive_files(&config).await?
    };

    emit(cli.output_format, &files, |files| {
        if human {
            println!("\nArchive files{}:", if dry_run { " (dry run)" } else { "" });
            for file in files {
                println!("  {}", file.display());
            }
        }
    })?;
    if human {
        show_farewell_with_timing(start_time.elapsed());
    }
    Ok(())
}

fn run_completions(shell: clap_complete::Shell, output: Option<&Path>) -> Result<()> {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    match output {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            clap_complete::generate(shell, &mut command, name, &mut file);
            info!("Completions written to {}", path.display());
        }
        None => {
            let mut stdout = io::stdout();
            clap_complete::generate(shell, &mut command, name, &mut stdout);
            stdout.flush()?;
        }
    }
    Ok(())
}
