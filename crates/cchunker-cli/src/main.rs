mod commands;

use clap::{Args, Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use cchunker_core::polynomial::Polynomial;

#[derive(Parser)]
#[command(name = "cchunker")]
#[command(about = "Content defined chunking of stdin for deduplicating backup tools")]
#[command(
    long_about = "Content defined chunking of stdin for deduplicating backup tools.\n\n\
    Chunks are shared across similar data, which makes them suitable for deduplication. \
    What happens to each chunk is decided by a CHUNK PROCESSOR: a command and arguments \
    that reads one chunk on stdin. On any IO or processor error cchunker exits non-zero."
)]
#[command(version)]
struct Cli {
    /// Path to a TOML config file (polynomial, profile, strict_lines)
    #[arg(long, global = true, env = "CCHUNKER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by the chunking modes.
#[derive(Args, Debug, Clone, Default)]
pub struct ChunkArgs {
    /// Polynomial for content defined chunking, decimal or 0x hex.
    /// Should be generated with `cchunker new-polynomial`
    #[arg(long)]
    polynomial: Option<Polynomial>,

    /// Min size 512 KiB, max size 8 MiB, average about 1 MiB
    #[arg(long, conflicts_with = "large_chunks")]
    small_chunks: bool,

    /// Min size 1 MiB, max size 32 MiB, average about 8 MiB
    #[arg(long)]
    large_chunks: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk stdin once; every processor's output is passed through to stdout
    Split {
        #[command(flatten)]
        chunking: ChunkArgs,

        /// CHUNK PROCESSOR command and arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<OsString>,
    },

    /// Chunk stdin repeatedly until it collapses to a single summary line.
    /// The processor must print exactly one line per chunk
    Reduce {
        #[command(flatten)]
        chunking: ChunkArgs,

        /// Accept processor output that is not exactly one line
        #[arg(long)]
        no_line_check: bool,

        /// CHUNK PROCESSOR command and arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<OsString>,
    },

    /// Generate a new chunking polynomial, print it on stdout and exit
    NewPolynomial,

    /// Check that a polynomial is suitable for content defined chunking
    CheckPolynomial {
        /// Polynomial to check (default: the configured one)
        #[arg(long)]
        polynomial: Option<Polynomial>,
    },
}

/// Used when `RUST_LOG` is unset, empty or unparsable.
const DEFAULT_LOG_FILTER: &str = "cchunker=warn,cchunker_core=warn";

fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn main() -> anyhow::Result<()> {
    // stdout carries chunk data, so logs go to stderr.
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(rust_log.as_deref()))
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Split {
            ref chunking,
            ref command,
        } => {
            let config = commands::resolve_config(config_path, chunking)?;
            commands::split::run(&config, command)
        }
        Commands::Reduce {
            ref chunking,
            no_line_check,
            ref command,
        } => {
            let mut config = commands::resolve_config(config_path, chunking)?;
            if no_line_check {
                config.strict_lines = false;
            }
            commands::reduce::run(&config, command)
        }
        Commands::NewPolynomial => commands::polynomial::generate(),
        Commands::CheckPolynomial { polynomial } => {
            let config = commands::resolve_config(config_path, &ChunkArgs::default())?;
            commands::polynomial::check(polynomial.unwrap_or(config.polynomial))
        }
    }
}
