// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Uses `clap` to parse
// the command line; all work is delegated to Layer 2.
//
// Three commands are supported:
//   1. `train`    — trains the model, checkpointing the best epoch
//   2. `evaluate` — mean F-score of a checkpoint on a test split
//   3. `predict`  — one image → one OBJ mesh
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, PredictArgs, TrainArgs};

use crate::application::train_use_case::TrainConfig;

#[derive(Parser, Debug)]
#[command(
    name = "mesh-recon",
    version,
    about = "Train and run a single-image triangle mesh reconstruction model."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the use case, then print the completion line.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args)?,
            Commands::Evaluate(args) => run_evaluate(args)?,
            Commands::Predict(args)  => run_predict(args)?,
        }
        println!("Done!");
        Ok(())
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on '{}'", args.train_manifest.display());
    let config = TrainConfig::try_from(args)?;
    let summary = TrainUseCase::new(config).execute()?;
    tracing::info!(
        "Training finished: {} epochs, {} checkpoint writes",
        summary.epoch_scores.len(),
        summary.checkpoints_written
    );
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let score = EvaluateUseCase::new(args.into()).execute()?;
    println!("f-score: {score}");
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let output = args.output.clone();
    let count  = PredictUseCase::new(args.checkpoint, args.image, args.output).execute()?;
    println!("Wrote {} vertices to '{}'", count, output.display());
    Ok(())
}
