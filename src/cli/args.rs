use crate::utils::constants::COMPRESSION_SNAPPY;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cloud-immersion")]
#[command(about = "Cloud base, radiation and elevation-band immersion from daily weather data")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Configuration file (TOML)")]
    pub config: Option<PathBuf>,
}

/// Overrides for the configured site constants
#[derive(Args, Debug, Clone, Default)]
pub struct SiteArgs {
    #[arg(long, allow_hyphen_values = true, help = "Site latitude in decimal degrees")]
    pub latitude: Option<f64>,

    #[arg(long, help = "Hargreaves adjustment coefficient")]
    pub k_rs: Option<f64>,

    #[arg(long, help = "Clearness index below which a day is cloudy")]
    pub cloudy_threshold: Option<f64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Derive dew point, cloud base, radiation, cloudiness and immersion flags
    Derive {
        #[arg(short, long, help = "Input observation file")]
        input: PathBuf,

        #[arg(
            short,
            long,
            help = "Output .csv or .parquet [default: output/cloud-immersion-{YYMMDD}.parquet]"
        )]
        output: Option<PathBuf>,

        #[command(flatten)]
        site: SiteArgs,

        #[arg(long, default_value = COMPRESSION_SNAPPY)]
        compression: String,

        #[arg(long, help = "Derive rows on a worker pool")]
        parallel: bool,

        #[arg(long, default_value_t = num_cpus::get())]
        max_workers: usize,

        #[arg(long, default_value = "1000")]
        chunk_size: usize,

        #[arg(long, help = "Insert missing rows for absent calendar days")]
        fill_gaps: bool,

        #[arg(long, help = "Memory-map the input file")]
        mmap: bool,
    },

    /// Report domain violations in an observation file without writing output
    Validate {
        #[arg(short, long, help = "Input observation file")]
        input: PathBuf,

        #[command(flatten)]
        site: SiteArgs,
    },

    /// Rolling cloudy-day and per-band immersion percentages
    Immersion {
        #[arg(short, long, help = "Input observation file")]
        input: PathBuf,

        #[arg(
            short,
            long,
            help = "Output CSV [default: output/cloud-immersion-rolling-{YYMMDD}.csv]"
        )]
        output: Option<PathBuf>,

        #[command(flatten)]
        site: SiteArgs,

        #[arg(short, long, help = "Rolling window length in days")]
        window: Option<usize>,

        #[arg(long, help = "Insert missing rows for absent calendar days")]
        fill_gaps: bool,
    },

    /// Display information about a derived Parquet file
    Info {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(long, help = "Print statistics as JSON")]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_derive() {
        let cli = Cli::parse_from([
            "cloud-immersion",
            "derive",
            "--input",
            "power.csv",
            "--latitude",
            "-12.5",
            "--parallel",
        ]);

        match cli.command {
            Commands::Derive {
                input,
                site,
                parallel,
                output,
                ..
            } => {
                assert_eq!(input, PathBuf::from("power.csv"));
                assert_eq!(site.latitude, Some(-12.5));
                assert!(parallel);
                assert!(output.is_none());
            }
            _ => panic!("expected derive"),
        }
    }
}
