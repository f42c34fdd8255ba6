// ============================================================
// Layer 2 — Grid Search
// ============================================================
// The nested loop at the centre of the tool:
//
//   for batch_size in grid.batch_sizes        (outer)
//     for learning_rate in grid.learning_rates (inner)
//       train a fresh model     → TrialRunner::run
//       keep it if most accurate so far
//
// Only the running best model is held in memory; every other
// trained model is dropped as soon as its metrics are known.

use anyhow::{anyhow, ensure, Context, Result};

use crate::domain::{
    hyperparams::ParamGrid,
    traits::TrialRunner,
    trial::{SearchOutcome, TrialResult},
};

/// Run every grid point through `runner` and return the search
/// outcome with the model of the most accurate trial.
///
/// `on_trial` sees each result as soon as it is known (used to
/// append to trials.csv). Any error from the runner or the callback
/// stops the search.
pub fn find_best_model<M, R, F>(
    grid:         &ParamGrid,
    runner:       &mut R,
    mut on_trial: F,
) -> Result<(SearchOutcome, M)>
where
    R: TrialRunner<M>,
    F: FnMut(&TrialResult) -> Result<()>,
{
    ensure!(!grid.is_empty(), "parameter grid is empty");

    let total = grid.len();
    let mut trials: Vec<TrialResult> = Vec::with_capacity(total);
    let mut best: Option<(TrialResult, M)> = None;

    for (i, params) in grid.combinations().enumerate() {
        let trial = i + 1;
        tracing::info!(
            "Trial {trial}/{total}: batch_size={}, learning_rate={:e}",
            params.batch_size,
            params.learning_rate
        );

        let (result, model) = runner
            .run(trial, &params)
            .with_context(|| format!("trial {trial} (batch_size={}, learning_rate={:e}) failed",
                params.batch_size, params.learning_rate))?;

        tracing::info!(
            "Trial {trial}/{total}: val_acc={:.2}% val_loss={:.4} ({:.1}s)",
            result.val_accuracy * 100.0,
            result.val_loss,
            result.elapsed_secs
        );
        on_trial(&result)?;

        let improved = match &best {
            Some((b, _)) => result.beats(b),
            None         => true,
        };
        if improved {
            tracing::info!("New best: trial {trial}");
            best = Some((result.clone(), model));
        }
        trials.push(result);
    }

    let (_, model) = best.ok_or_else(|| anyhow!("no trial produced a model"))?;
    let outcome = SearchOutcome::from_trials(trials)?;
    Ok((outcome, model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::hyperparams::TrialParams;

    /// Returns scripted accuracies in call order; the "model" is the trial number.
    struct ScriptedRunner {
        accuracies: Vec<f64>,
        seen:       Vec<TrialParams>,
        fail_at:    Option<usize>,
    }

    impl ScriptedRunner {
        fn new(accuracies: Vec<f64>) -> Self {
            Self { accuracies, seen: Vec::new(), fail_at: None }
        }
    }

    impl TrialRunner<usize> for ScriptedRunner {
        fn run(&mut self, trial: usize, params: &TrialParams) -> Result<(TrialResult, usize)> {
            if self.fail_at == Some(trial) {
                return Err(anyhow!("out of memory"));
            }
            self.seen.push(*params);
            let result = TrialResult {
                trial,
                params: *params,
                train_loss: 0.1,
                val_loss: 0.2,
                val_accuracy: self.accuracies[trial - 1],
                elapsed_secs: 0.0,
            };
            Ok((result, trial))
        }
    }

    fn grid() -> ParamGrid {
        ParamGrid::generate(1e-3, 1e-1, 3, 4, 2).unwrap()
    }

    #[test]
    fn test_every_combination_is_tried_in_order() {
        let grid = grid();
        let mut runner = ScriptedRunner::new(vec![0.5; 6]);
        let mut logged = Vec::new();

        let (outcome, _) = find_best_model(&grid, &mut runner, |t| {
            logged.push(t.trial);
            Ok(())
        })
        .unwrap();

        assert_eq!(outcome.trials.len(), 6);
        assert_eq!(logged, vec![1, 2, 3, 4, 5, 6]);
        let expected: Vec<TrialParams> = grid.combinations().collect();
        assert_eq!(runner.seen, expected);
    }

    #[test]
    fn test_best_model_is_kept() {
        let mut runner = ScriptedRunner::new(vec![0.5, 0.6, 0.95, 0.7, 0.94, 0.1]);
        let (outcome, model) = find_best_model(&grid(), &mut runner, |_| Ok(())).unwrap();

        assert_eq!(model, 3);
        assert_eq!(outcome.best.trial, 3);
        assert_eq!(outcome.best.params.batch_size, 4);
        assert_eq!(outcome.batch_range.low, 4);
    }

    #[test]
    fn test_tie_keeps_first_model() {
        let mut runner = ScriptedRunner::new(vec![0.8, 0.9, 0.9, 0.9, 0.2, 0.2]);
        let (outcome, model) = find_best_model(&grid(), &mut runner, |_| Ok(())).unwrap();
        assert_eq!(model, 2);
        assert_eq!(outcome.best.trial, 2);
    }

    #[test]
    fn test_empty_grid_is_error() {
        let grid = ParamGrid { learning_rates: vec![], batch_sizes: vec![4] };
        let mut runner = ScriptedRunner::new(vec![]);
        let err = find_best_model(&grid, &mut runner, |_| Ok(())).unwrap_err();
        assert!(err.to_string().contains("empty"));
        assert!(runner.seen.is_empty());
    }

    #[test]
    fn test_failed_trial_stops_search() {
        let mut runner = ScriptedRunner::new(vec![0.5; 6]);
        runner.fail_at = Some(2);
        let err = find_best_model(&grid(), &mut runner, |_| Ok(())).unwrap_err();
        assert!(format!("{err:#}").contains("trial 2"));
        assert_eq!(runner.seen.len(), 1);
    }

    #[test]
    fn test_callback_error_stops_search() {
        let mut runner = ScriptedRunner::new(vec![0.5; 6]);
        let result = find_best_model(&grid(), &mut runner, |_| Err(anyhow!("disk full")));
        assert!(result.is_err());
        assert_eq!(runner.seen.len(), 1);
    }
}
