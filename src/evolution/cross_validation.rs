//! Held-out evaluation: explicit train/test files and k-fold partitions.

use super::algorithm::PopulationAlgorithm;
use super::config::Parameters;
use super::types::{fitness_cmp, Breed, Individual};
use crate::dataset::Dataset;
use crate::error::{Result, SymregError};
use crate::metrics::ErrorFn;
use log::{debug, info};
use std::cmp::Ordering;

/// Outcome of a cross-validation run.
#[derive(Debug, Clone)]
pub struct CrossValidation<T> {
    /// Best individual over all folds, by held-out primary error.
    pub best: T,

    /// Fold that produced `best`.
    pub best_fold: usize,

    /// Held-out errors as `errors[function][fold]`. Row 0 is the evaluation
    /// function, followed by the extra reporting functions in order.
    pub errors: Vec<Vec<f64>>,
}

impl<T> CrossValidation<T> {
    pub fn num_folds(&self) -> usize {
        self.errors.first().map_or(0, Vec::len)
    }

    /// Mean held-out error per function.
    pub fn mean_errors(&self) -> Vec<f64> {
        self.errors
            .iter()
            .map(|row| {
                if row.is_empty() {
                    f64::NAN
                } else {
                    row.iter().sum::<f64>() / row.len() as f64
                }
            })
            .collect()
    }
}

impl<T: Breed> PopulationAlgorithm<T> {
    /// Trains a fresh population on `train` and reports every reporting
    /// function on `test`. The error matrix has a single fold column.
    pub fn fit_cv_files(
        &mut self,
        train: &Dataset,
        test: &Dataset,
        params: &Parameters,
    ) -> Result<CrossValidation<T>> {
        if train.num_variables() != test.num_variables() {
            return Err(SymregError::InvalidData(format!(
                "train has {} variables, test has {}",
                train.num_variables(),
                test.num_variables()
            )));
        }
        self.run_folds(&[(train.clone(), test.clone())], params)
    }

    /// k-fold cross-validation over the loaded data.
    ///
    /// The rows are split into `k` contiguous folds; each fold is held out
    /// once while a fresh population is trained on the rest.
    pub fn perform_k_cross_validation(
        &mut self,
        k: usize,
        params: &Parameters,
    ) -> Result<CrossValidation<T>> {
        let folds = self.data.folds(k)?;
        self.run_folds(&folds, params)
    }

    /// Trains on each `(train, test)` pair, then restores the data that was
    /// loaded before the call.
    fn run_folds(
        &mut self,
        folds: &[(Dataset, Dataset)],
        params: &Parameters,
    ) -> Result<CrossValidation<T>> {
        params.validate().map_err(SymregError::InvalidConfig)?;
        let reporting = params.reporting_functions();

        let saved = self.data.clone();
        let outcome = self.train_folds(folds, &reporting, params);
        self.data = saved;
        outcome
    }

    fn train_folds(
        &mut self,
        folds: &[(Dataset, Dataset)],
        reporting: &[ErrorFn],
        params: &Parameters,
    ) -> Result<CrossValidation<T>> {
        let mut errors = vec![Vec::with_capacity(folds.len()); reporting.len()];
        let mut best: Option<(usize, T)> = None;

        for (fold, (train, test)) in folds.iter().enumerate() {
            self.load_dataset(train.clone())?;
            self.generate_population(self.population_size, self.max_depth, self.prob_variable)?;
            let report = self.fit(params)?;

            let predicted: Vec<f64> = test
                .features
                .iter()
                .map(|row| report.best.predict(row))
                .collect();
            for (row, f) in errors.iter_mut().zip(reporting) {
                row.push(f(&predicted, &test.labels));
            }

            let held_out = errors[0][fold];
            if params.verbose {
                info!("fold {fold}: train {} held-out {held_out}", report.best_fitness);
            } else {
                debug!("fold {fold}: train {} held-out {held_out}", report.best_fitness);
            }

            let improves = match &best {
                None => true,
                Some((b, _)) => fitness_cmp(held_out, errors[0][*b]) == Ordering::Less,
            };
            if improves {
                best = Some((fold, report.best));
            }
        }

        let (best_fold, best) =
            best.ok_or_else(|| SymregError::InvalidConfig("no folds to train on".into()))?;
        Ok(CrossValidation {
            best,
            best_fold,
            errors,
        })
    }
}
