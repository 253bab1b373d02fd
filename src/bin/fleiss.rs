#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use fleiss_kappa::options::load_options_from_path;
use fleiss_kappa::simulate::{simulate_table, SimulationConfig};
use fleiss_kappa::{render_markdown, FleissOptions, RatingTable};

#[derive(Parser)]
#[command(name = "fleiss", version, about = "Fleiss' kappa for multiple raters")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute Fleiss' kappa from a JSON rating table
    Analyze {
        /// Rating table JSON: {"raters": [...], "subjects": [{"ratings": [...], "weight": 1}]}
        #[arg(long)]
        input: PathBuf,
        /// Options JSON (e.g. {"confidence_level": 90})
        #[arg(long)]
        config: Option<PathBuf>,
        /// Confidence level in percent; overrides --config. Clamped to [50, 99.999]
        #[arg(long)]
        cilevel: Option<f64>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Md)]
        format: OutputFormat,
        /// Write here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Write a synthetic rating table with a known agreement level
    Simulate {
        #[arg(long, default_value_t = 100)]
        subjects: usize,
        #[arg(long, default_value_t = 4)]
        raters: usize,
        #[arg(long, default_value_t = 3)]
        categories: usize,
        /// Probability that a rater reports the true category
        #[arg(long, default_value_t = 0.5)]
        agreement: f64,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Md,
    Json,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let value = serde_json::from_str(&raw)
        .map_err(|e| format!("failed to parse {}: {e}", path.display()))?;
    Ok(value)
}

fn write_output(out: Option<&Path>, body: &str) -> io::Result<()> {
    match out {
        Some(path) => {
            let mut file = File::create(path)?;
            file.write_all(body.as_bytes())
        }
        None => io::stdout().write_all(body.as_bytes()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            input,
            config,
            cilevel,
            format,
            out,
        } => {
            let table: RatingTable = read_json(&input)?;
            let mut options = match config {
                Some(path) => load_options_from_path(path)?,
                None => FleissOptions::default(),
            };
            if let Some(level) = cilevel {
                options = options.with_confidence_level(level);
            }

            let report = fleiss_kappa::run(&table, &options)?;
            let body = match format {
                OutputFormat::Md => render_markdown(&report),
                OutputFormat::Json => {
                    let mut s = serde_json::to_string_pretty(&report)?;
                    s.push('\n');
                    s
                }
            };
            write_output(out.as_deref(), &body)?;
        }
        Commands::Simulate {
            subjects,
            raters,
            categories,
            agreement,
            seed,
            out,
        } => {
            let cfg = SimulationConfig {
                subjects,
                raters,
                categories,
                agreement,
                seed,
            };
            let table = simulate_table(&cfg)?;
            let mut file = File::create(&out)?;
            serde_json::to_writer_pretty(&mut file, &table)?;
            writeln!(file)?;
            eprintln!("[simulate] {} subjects written to {}", subjects, out.display());
        }
    }

    Ok(())
}
