//! ncps-bench: trains and evaluates continuous-time recurrent cells on
//! synthetic sequence tasks.

use std::path::PathBuf;

use anyhow::Context;
use burn::backend::{Autodiff, NdArray};
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use ncps::cells::CfcMode;
use ncps::config::load_config;
use ncps::experiments::{cell_comparison, liquid, CellKind, SplitEval};
use ncps::training::StopReason;

type Backend = Autodiff<NdArray<f32>>;

/// Continuous-time RNN benchmarks
#[derive(Parser, Debug)]
#[command(name = "ncps-bench", version, about, long_about = None)]
struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Train CTRNN, CTGRU and ELTC cells on a sine/cosine sequence
    Compare {
        /// Number of training epochs
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Cells to train, comma separated (ctrnn, ctgru, eltc, cfc)
        #[arg(long, value_delimiter = ',')]
        cells: Option<Vec<CellKind>>,

        #[arg(long)]
        seed: Option<u64>,
    },
    /// Run a CfC regressor on the sequence-sum task
    Liquid {
        /// CfC mode: default (or gated), pure, no_gate
        #[arg(short, long)]
        mode: Option<CfcMode>,

        /// Epochs to train before evaluating (0 evaluates the untrained model)
        #[arg(long)]
        train_epochs: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_filter(filter),
        )
        .init();

    let mut config = load_config(cli.config.as_deref()).context("loading configuration")?;
    let device = Default::default();

    match cli.command {
        Commands::Compare {
            epochs,
            cells,
            seed,
        } => {
            let compare = &mut config.compare;
            if let Some(epochs) = epochs {
                compare.training.num_epochs = epochs;
            }
            if let Some(cells) = cells {
                compare.cells = cells;
            }
            if let Some(seed) = seed {
                compare.seed = seed;
            }

            let report = cell_comparison::run::<Backend>(compare, &device)
                .context("cell comparison failed")?;

            for training in &report.reports {
                match (training.stop_reason, training.stopped_at) {
                    (StopReason::Diverged, Some(epoch)) => println!(
                        "Training {} failed at epoch {epoch} with NaN loss.",
                        training.name
                    ),
                    (StopReason::EarlyStopped, Some(epoch)) => println!(
                        "{}: early stopping triggered at epoch {epoch}",
                        training.name
                    ),
                    _ => {}
                }
            }

            println!("\nTraining complete. Final losses:");
            for (name, loss) in &report.final_losses {
                println!("{name}: {loss:.6}");
            }
        }
        Commands::Liquid {
            mode,
            train_epochs,
            seed,
        } => {
            let liquid_config = &mut config.liquid;
            if let Some(mode) = mode {
                liquid_config.mode = mode;
            }
            if let Some(train_epochs) = train_epochs {
                liquid_config.train_epochs = train_epochs;
            }
            if let Some(seed) = seed {
                liquid_config.seed = seed;
            }

            let report =
                liquid::run::<Backend>(liquid_config, &device).context("liquid run failed")?;

            println!("\nProcessing training data...");
            print_split(&report.train, "Training");
            println!("\nProcessing test data...");
            print_split(&report.test, "Test");
        }
    }

    Ok(())
}

fn print_split(eval: &SplitEval, label: &str) {
    println!("Input shape: {:?}", eval.input_shape);
    println!("Time deltas shape: {:?}", eval.time_shape);
    println!("Output shape: {:?}", eval.output_shape);
    println!("{label} MSE: {:.4}", eval.mse);
}
