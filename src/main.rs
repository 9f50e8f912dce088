use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use qkd_sim::detection::EveStrategy;
use qkd_sim::protocols::Protocol;
use qkd_sim::{QkdSimulator, SimulationConfig};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "qkd-sim")]
#[command(about = "Quantum key distribution simulator with eavesdropping detection")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides the configured RNG seed
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Logging level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every protocol, or a single one with --protocol
    Simulate {
        #[arg(short, long, allow_negative_numbers = true)]
        rounds: Option<i64>,
        #[arg(short, long)]
        protocol: Option<Protocol>,
    },
    /// Run a detection batch
    Detect {
        #[arg(short, long, default_value_t = 3)]
        qubits: usize,
        #[arg(short, long, default_value_t = 100)]
        rounds: usize,
        /// Put Eve on the channel
        #[arg(long)]
        eve: bool,
        #[arg(long, default_value = "intercept-resend")]
        strategy: EveStrategy,
    },
    /// Print the anomaly timeline
    Timeline {
        /// Fill the window with fabricated demo records
        #[arg(long)]
        synthetic: bool,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.log_level.as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => SimulationConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    let simulator = QkdSimulator::new(config)?;

    match cli.command {
        Commands::Simulate { rounds, protocol } => {
            let rounds =
                rounds.unwrap_or_else(|| simulator.config().default_rounds as i64);
            match protocol {
                Some(protocol) => {
                    info!(%protocol, rounds, "running single protocol");
                    let session = simulator.simulate_protocol(protocol, rounds)?;
                    print_json(&session)?;
                }
                None => print_json(&simulator.run_simulation(rounds)?)?,
            }
        }
        Commands::Detect {
            qubits,
            rounds,
            eve,
            strategy,
        } => {
            let result = simulator.detect(qubits, rounds, eve, strategy)?;
            print_json(&result)?;
        }
        Commands::Timeline { synthetic } => {
            if synthetic && !simulator.config().detection.synthetic_history {
                simulator.load_synthetic_history();
            }
            print_json(&simulator.timeline())?;
        }
    }

    Ok(())
}
