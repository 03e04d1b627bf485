use crate::analyzers::SeriesAnalyzer;
use crate::cli::args::{Cli, Commands, SiteArgs};
use crate::config::AppConfig;
use crate::models::{DailyRecord, DerivedRecord};
use crate::processors::{fill_calendar_gaps, FeaturePipeline, ImmersionSeries, IntegrityChecker};
use crate::readers::ObservationReader;
use crate::utils::filename::{
    generate_default_output_filename, generate_default_rolling_filename, OutputFormat,
};
use crate::utils::progress::ProgressReporter;
use crate::writers::{CsvWriter, ParquetWriter};
use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, Level};

pub fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    let mut config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Derive {
            input,
            output,
            site,
            compression,
            parallel,
            max_workers,
            chunk_size,
            fill_gaps,
            mmap,
        } => {
            apply_site_overrides(&mut config, &site);
            config.reader.use_mmap |= mmap;

            let output_file = output.unwrap_or_else(generate_default_output_filename);
            println!("Deriving features from {}", input.display());
            println!("Output file: {}", output_file.display());

            let records = read_input(&config, &input, fill_gaps)?;
            let workers = if parallel { max_workers } else { 1 };
            let pipeline = FeaturePipeline::new(config.pipeline.clone())?
                .with_max_workers(workers)
                .with_chunk_size(chunk_size);

            let progress =
                ProgressReporter::new(records.len() as u64, "Deriving features...", false);
            let derived = pipeline.run(&records, Some(&progress))?;
            progress.finish_with_message(&format!("Derived {} records", derived.len()));

            let checker = IntegrityChecker::new();
            let report = checker.check_derived(&derived);
            println!("\n{}", checker.generate_summary(&report));

            if derived.is_empty() {
                println!("No records to write");
                return Ok(());
            }

            if let Some(parent) = output_file.parent() {
                std::fs::create_dir_all(parent)?;
            }

            match OutputFormat::from_path(&output_file) {
                OutputFormat::Parquet => {
                    let writer = ParquetWriter::new().with_compression(&compression)?;
                    writer.write_records(&derived, &output_file, chunk_size)?;
                    println!("\n{}", writer.get_file_info(&output_file)?.summary());
                }
                OutputFormat::Csv => {
                    CsvWriter::new()
                        .with_delimiter(config.reader.delimiter_byte()?)
                        .write_records(&derived, &output_file)?;
                }
            }

            print_statistics(&derived, false)?;
            println!("Processing complete!");
        }

        Commands::Validate { input, site } => {
            apply_site_overrides(&mut config, &site);
            println!("Validating observations in {}", input.display());

            let records = read_input(&config, &input, false)?;
            let derived = FeaturePipeline::new(config.pipeline.clone())?.derive(&records);

            let checker = IntegrityChecker::new();
            let report = checker.check_derived(&derived);
            println!("\n{}", checker.generate_summary(&report));

            if report.has_violations() {
                println!("Found {} domain violations", report.violations.len());
            } else {
                println!("All records passed validation checks");
            }
        }

        Commands::Immersion {
            input,
            output,
            site,
            window,
            fill_gaps,
        } => {
            apply_site_overrides(&mut config, &site);
            if let Some(window) = window {
                config.pipeline.rolling_window_length = window;
            }

            let output_file = output.unwrap_or_else(generate_default_rolling_filename);
            let records = read_input(&config, &input, fill_gaps)?;
            let pipeline = FeaturePipeline::new(config.pipeline.clone())?;

            let progress = ProgressReporter::new_spinner("Computing rolling immersion...", false);
            let derived = pipeline.derive(&records);
            let series = ImmersionSeries::from_derived(
                &derived,
                pipeline.elevations(),
                config.pipeline.rolling_window_length,
            )?;
            progress.finish_with_message(&format!(
                "Rolling window {} over {} days",
                series.window,
                series.len()
            ));

            match series.first_full_window() {
                Some(index) => println!("First full window ends on {}", series.dates[index]),
                None => println!(
                    "Series of {} days is shorter than the {}-day window; all values missing",
                    series.len(),
                    series.window
                ),
            }

            if let Some(parent) = output_file.parent() {
                std::fs::create_dir_all(parent)?;
            }
            CsvWriter::new()
                .with_delimiter(config.reader.delimiter_byte()?)
                .write_immersion_series(&series, &output_file)?;
            println!("Wrote {}", output_file.display());
        }

        Commands::Info { file, json } => {
            let writer = ParquetWriter::new();
            let file_info = writer
                .get_file_info(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let derived = writer.read_records(&file)?;

            print_statistics(&derived, json)?;

            if !json {
                println!("\nFile Details:");
                println!("{}", file_info.summary());
            }
        }
    }

    Ok(())
}

fn apply_site_overrides(config: &mut AppConfig, site: &SiteArgs) {
    if let Some(latitude) = site.latitude {
        config.pipeline.latitude_deg = latitude;
    }
    if let Some(k_rs) = site.k_rs {
        config.pipeline.k_rs = k_rs;
    }
    if let Some(threshold) = site.cloudy_threshold {
        config.pipeline.cloudy_threshold = threshold;
    }
}

fn read_input(config: &AppConfig, input: &Path, fill_gaps: bool) -> Result<Vec<DailyRecord>> {
    let reader = ObservationReader::new(config.reader.clone());
    let records = reader
        .read_observations(input)
        .with_context(|| format!("reading observations from {}", input.display()))?;

    if fill_gaps {
        let filled = fill_calendar_gaps(&records);
        info!("Filled {} missing days", filled.len() - records.len());
        Ok(filled)
    } else {
        Ok(records)
    }
}

fn print_statistics(derived: &[DerivedRecord], json: bool) -> Result<()> {
    if derived.is_empty() {
        println!("No records to analyze");
        return Ok(());
    }

    let stats = SeriesAnalyzer::new().analyze(derived)?;
    if json {
        println!("{}", stats.to_json()?);
    } else {
        println!("\n{}", stats.detailed_summary());
    }
    Ok(())
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    // A second initialisation (tests, embedding) keeps the existing subscriber
    let _ = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    Ok(())
}
