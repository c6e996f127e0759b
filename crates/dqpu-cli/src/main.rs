//! DQPU Command-Line Interface
//!
//! Trap, sample and verify quantum circuits, or run a whole requester,
//! verifier and sampler round trip on a local devnet.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::devnet::DevnetOptions;
use commands::{devnet, sample, samplers, trap, untrap, verify, version};

/// DQPU - trap-verified distributed quantum sampling
#[derive(Parser)]
#[command(name = "dqpu")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Node configuration file (YAML)
    #[arg(short, long, global = true, env = "DQPU_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add trap qubits to a circuit
    Trap {
        /// Input file (OpenQASM 2)
        input: PathBuf,

        /// Output file for the trapped circuit (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Where to write the trap metadata
        #[arg(short, long, default_value = "traps.json")]
        traps: PathBuf,

        /// Trapping method
        #[arg(long, default_value = dqpu_trap::BASIC_METHOD)]
        method: String,

        /// Number of traps to insert
        #[arg(short, long, default_value = "1")]
        level: u32,

        /// Seed for trap placement
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Sample a circuit locally
    Sample {
        /// Input file (OpenQASM 2)
        input: PathBuf,

        /// Number of shots
        #[arg(short, long, default_value = "1024")]
        shots: u64,

        /// Sampler to use
        #[arg(long, default_value = dqpu_adapter_sim::STATEVECTOR)]
        sampler: String,

        /// Sampler seed
        #[arg(long)]
        seed: Option<u64>,

        /// Output file for the counts (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a result file against its traps
    Verify {
        /// Trap metadata file
        #[arg(short, long)]
        traps: PathBuf,

        /// Counts file (JSON)
        #[arg(short, long)]
        results: PathBuf,

        /// Trapping method
        #[arg(long, default_value = dqpu_trap::BASIC_METHOD)]
        method: String,

        /// Expected number of shots
        #[arg(short, long)]
        shots: Option<u64>,
    },

    /// Remove trap bits from a result file
    Untrap {
        /// Trap metadata file
        #[arg(short, long)]
        traps: PathBuf,

        /// Counts file (JSON)
        #[arg(short, long)]
        results: PathBuf,

        /// Trapping method
        #[arg(long, default_value = dqpu_trap::BASIC_METHOD)]
        method: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List available samplers
    Samplers {
        /// Run each sampler's self-test
        #[arg(long)]
        self_test: bool,
    },

    /// Run circuits through a local requester, verifier and sampler
    Devnet {
        /// Circuit files (OpenQASM 2)
        #[arg(required = true)]
        circuits: Vec<PathBuf>,

        /// Shots per job
        #[arg(short, long, default_value = "1024")]
        shots: u64,

        /// Reward per job
        #[arg(long, default_value = "0.5")]
        reward: f64,

        /// Sampler to use (defaults to the configured one)
        #[arg(long)]
        sampler: Option<String>,

        /// Seed for trap placement and sampling
        #[arg(long)]
        seed: Option<u64>,

        /// Give up after this many polling cycles
        #[arg(long, default_value = "16")]
        max_cycles: u32,

        /// State directory (overrides the configuration)
        #[arg(long)]
        state_dir: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    // Execute command
    let result = match cli.command {
        Commands::Trap {
            input,
            output,
            traps,
            method,
            level,
            seed,
        } => trap::execute(&input, output.as_deref(), &traps, &method, level, seed),

        Commands::Sample {
            input,
            shots,
            sampler,
            seed,
            output,
        } => sample::execute(&input, output.as_deref(), shots, &sampler, seed).await,

        Commands::Verify {
            traps,
            results,
            method,
            shots,
        } => verify::execute(&traps, &results, &method, shots),

        Commands::Untrap {
            traps,
            results,
            method,
            output,
        } => untrap::execute(&traps, &results, output.as_deref(), &method),

        Commands::Samplers { self_test } => samplers::execute(self_test).await,

        Commands::Devnet {
            circuits,
            shots,
            reward,
            sampler,
            seed,
            max_cycles,
            state_dir,
        } => {
            let options = DevnetOptions {
                circuits,
                shots,
                reward,
                sampler,
                seed,
                max_cycles,
                state_dir,
            };
            devnet::execute(cli.config.as_deref(), options).await
        }

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    // Handle errors
    if let Err(e) = result {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_trap_defaults() {
        let cli = Cli::try_parse_from(["dqpu", "trap", "bell.qasm"]).unwrap();
        match cli.command {
            Commands::Trap {
                traps,
                method,
                level,
                seed,
                ..
            } => {
                assert_eq!(traps, PathBuf::from("traps.json"));
                assert_eq!(method, "basic");
                assert_eq!(level, 1);
                assert_eq!(seed, None);
            }
            _ => panic!("expected trap command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from([
            "dqpu",
            "devnet",
            "a.qasm",
            "b.qasm",
            "-vv",
            "--config",
            "node.yaml",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("node.yaml")));
        match cli.command {
            Commands::Devnet {
                circuits, shots, ..
            } => {
                assert_eq!(circuits.len(), 2);
                assert_eq!(shots, 1024);
            }
            _ => panic!("expected devnet command"),
        }
    }

    #[test]
    fn test_devnet_needs_circuits() {
        assert!(Cli::try_parse_from(["dqpu", "devnet"]).is_err());
    }
}
