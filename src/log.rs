use crate::input::JobConfig;
use crate::labels::ensemble_label;
use log::{LevelFilter, debug};
use std::time::Duration;

/// Initialises `env_logger`. `RUST_LOG`, when set, wins over the flags.
pub fn init_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        LevelFilter::Error
    } else if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }
    if builder.try_init().is_err() {
        debug!("Logger already initialised, keeping the existing one");
    }
}

pub fn show_greeting(config_path: &str) {
    println!("=== Climate Archive Locator ===");
    println!("Loading configuration from: {}", config_path);
}

pub fn config_echo(config: &JobConfig) {
    println!("\nConfiguration:");
    println!("  Run: {}", config.run.name);
    println!("  Archive root: {}", config.run.root.display());
    println!(
        "  Chunking: {} year(s) from year {:04}",
        config.run.duration, config.run.start_year
    );
    println!("  Variable: {}", config.variable);
    println!("  Domain: {}", config.domain);
    println!(
        "  Representation: {} ({})",
        config.representation, config.granularity
    );
    if let Some(interval) = &config.interval {
        println!("  Interval: {}", interval);
    }
    match config.years {
        Some(years) => println!("  Years: {}", years),
        None => {
            if let Some(years) = config.run.default_years {
                println!("  Years: {} (run default)", years);
            }
        }
    }
    let member = ensemble_label(config.ensemble_member.as_ref());
    if !member.is_empty() {
        println!("  Ensemble: {}", member);
    }
    println!("  Staging: {:?}", config.staging.backend);
}

pub fn show_farewell_with_timing(elapsed: Duration) {
    println!("\n=== Done in {:.2?} ===", elapsed);
}
