// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments, dispatches to a use case, prints results.
// Nothing below this layer writes to stdout.
//
//   1. `search`  — grid search, saves the best model
//   2. `predict` — classifies an image with that model

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PredictArgs, SearchArgs};
use std::path::Path;

use crate::application::search_use_case::SearchReport;

#[derive(Parser, Debug)]
#[command(
    name = "gridtune",
    version,
    about = "Grid-search learning rate and batch size for fine-tuning a pretrained ResNet-18 image classifier."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Search(args)  => run_search(args),
            Commands::Predict(args) => run_predict(args),
        }
    }
}

fn run_search(args: SearchArgs) -> Result<()> {
    use crate::application::search_use_case::SearchUseCase;

    tracing::info!("Starting grid search on images in: {}", args.data_dir);
    let report = SearchUseCase::new(args.into()).execute()?;
    print!("{}", render_summary(&report));
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let use_case = PredictUseCase::new(&args.output_dir)?;
    let prediction = use_case.predict(Path::new(&args.image))?;
    println!("{}: {} ({:.1}%)", args.image, prediction.class, prediction.probability * 100.0);
    Ok(())
}

fn render_summary(report: &SearchReport) -> String {
    let outcome = &report.outcome;
    let best = &outcome.best;
    let mut out = String::new();

    out.push_str(&format!("\n{:>5}  {:>10}  {:>13}  {:>10}  {:>8}  {:>8}\n",
        "trial", "batch_size", "learning_rate", "train_loss", "val_loss", "val_acc"));
    for t in &outcome.trials {
        let marker = if t.trial == best.trial { " *" } else { "" };
        out.push_str(&format!("{:>5}  {:>10}  {:>13.2e}  {:>10.4}  {:>8.4}  {:>7.2}%{}\n",
            t.trial, t.params.batch_size, t.params.learning_rate,
            t.train_loss, t.val_loss, t.val_accuracy * 100.0, marker));
    }

    out.push_str(&format!(
        "\nBest: batch_size={}, learning_rate={:e}, val_acc={:.2}% (trial {} of {})\n",
        best.params.batch_size,
        best.params.learning_rate,
        best.val_accuracy * 100.0,
        best.trial,
        outcome.trials.len(),
    ));
    out.push_str(&format!(
        "Recommended learning rate range: {:.3e} .. {:.3e}\n",
        outcome.lr_range.low, outcome.lr_range.high
    ));
    out.push_str(&format!(
        "Recommended batch size range:    {} .. {}\n",
        outcome.batch_range.low, outcome.batch_range.high
    ));
    out.push_str(&format!("Classes: {}\n", report.classes.join(", ")));
    out.push_str(&format!("Model saved to {}\n", report.model_path.display()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{hyperparams::TrialParams, trial::{SearchOutcome, TrialResult}};
    use std::path::PathBuf;

    #[test]
    fn test_cli_parses_search_flags() {
        let cli = Cli::try_parse_from([
            "gridtune", "search", "--data-dir", "hymenoptera", "--num-lr", "3",
            "--lr-min", "0.001", "--val-fraction", "0.2", "--freeze-backbone",
        ])
        .unwrap();
        match cli.command {
            Commands::Search(a) => {
                assert_eq!(a.data_dir, "hymenoptera");
                assert_eq!(a.num_lr, 3);
                assert_eq!(a.lr_min, 0.001);
                assert_eq!(a.val_fraction, Some(0.2));
                assert!(a.freeze_backbone);
                assert_eq!(a.epochs, 5);
                assert!(a.weights.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_predict_requires_image() {
        assert!(Cli::try_parse_from(["gridtune", "predict"]).is_err());
    }

    #[test]
    fn test_summary_marks_best_and_ranges() {
        let trial = |n, bs, lr, acc| TrialResult {
            trial: n,
            params: TrialParams { batch_size: bs, learning_rate: lr },
            train_loss: 0.1,
            val_loss: 0.2,
            val_accuracy: acc,
            elapsed_secs: 1.0,
        };
        let outcome = SearchOutcome::from_trials(vec![
            trial(1, 8, 0.01, 0.5),
            trial(2, 16, 0.001, 0.9),
        ])
        .unwrap();
        let report = SearchReport {
            outcome,
            classes: vec!["ants".into(), "bees".into()],
            model_path: PathBuf::from("artifacts/best_model.mpk"),
        };

        let text = render_summary(&report);
        assert!(text.contains("Best: batch_size=16, learning_rate=1e-3"));
        assert!(text.contains("Recommended batch size range:    14 .. 18"));
        assert!(text.contains("9.000e-4 .. 1.100e-3"));
        assert_eq!(text.lines().filter(|l| l.ends_with(" *")).count(), 1);
    }
}
