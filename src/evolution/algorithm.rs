//! Generational driver shared by GP and GA-P.
//!
//! [`PopulationAlgorithm`] owns the training data, the population and the
//! seeded generator. Each generation it:
//!
//! 1. builds a mating pool by tournament selection,
//! 2. hands the pool to the individual type's [`Breed`] policy,
//! 3. restores the previous best if it was lost (elitism),
//! 4. evaluates the new individuals and locates the best.
//!
//! The loop runs `num_evaluations / population_size` generations with no
//! early stopping.

use super::config::Parameters;
use super::population::Population;
use super::types::{fitness_cmp, Breed, GenerationContext, Individual};
use crate::dataset::Dataset;
use crate::error::{Result, SymregError};
use crate::random::{create_rng, unit, SymRng};
use log::{debug, info};
use rand::Rng;
use std::cmp::Ordering;
use std::path::Path;

/// Result of a [`PopulationAlgorithm::fit`] run.
#[derive(Debug, Clone)]
pub struct FitReport<T> {
    /// Best individual of the final population.
    pub best: T,

    /// Training fitness of `best`.
    pub best_fitness: f64,

    /// Number of generations executed.
    pub generations: usize,

    /// Best fitness after initial evaluation and after each generation.
    pub fitness_history: Vec<f64>,
}

/// Generic generational algorithm over individuals of type `T`.
///
/// # Usage
///
/// ```
/// use u_symreg::evolution::{GpAlgorithm, Parameters};
///
/// let data: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
/// let labels: Vec<f64> = data.iter().map(|r| 3.0 * r[0]).collect();
///
/// let mut gp = GpAlgorithm::new(data, labels, 42, 20, 15, 0.5).unwrap();
/// let report = gp.fit(&Parameters::new(400, u_symreg::metrics::mse)).unwrap();
/// assert_eq!(report.generations, 20);
/// assert!(report.best_fitness.is_finite());
/// ```
#[derive(Debug, Clone)]
pub struct PopulationAlgorithm<T> {
    pub(crate) data: Dataset,
    pub(crate) population: Population<T>,
    pub(crate) population_size: usize,
    pub(crate) max_depth: usize,
    pub(crate) prob_variable: f64,
    pub(crate) rng: SymRng,
}

impl<T: Breed> PopulationAlgorithm<T> {
    /// Loads the data and generates a random initial population.
    ///
    /// Fails on inconsistent data, a zero population size or tree capacity,
    /// or a variable probability outside `[0, 1]`.
    pub fn new(
        data: Vec<Vec<f64>>,
        labels: Vec<f64>,
        seed: u64,
        population_size: usize,
        max_depth: usize,
        prob_variable: f64,
    ) -> Result<Self> {
        Self::from_dataset(
            Dataset::new(data, labels)?,
            seed,
            population_size,
            max_depth,
            prob_variable,
        )
    }

    pub fn from_dataset(
        data: Dataset,
        seed: u64,
        population_size: usize,
        max_depth: usize,
        prob_variable: f64,
    ) -> Result<Self> {
        if data.is_empty() {
            return Err(SymregError::InvalidData("no training rows".into()));
        }

        let mut alg = Self {
            data,
            population: Population::new(),
            population_size,
            max_depth,
            prob_variable,
            rng: create_rng(seed),
        };
        alg.generate_population(population_size, max_depth, prob_variable)?;
        Ok(alg)
    }

    /// Reads a delimited file (last column is the label) and builds the
    /// algorithm on it; see [`Dataset::read_delimited`].
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        comment: char,
        delimiter: char,
        seed: u64,
        population_size: usize,
        max_depth: usize,
        prob_variable: f64,
    ) -> Result<Self> {
        let data = Dataset::read_delimited(path, comment, delimiter)?;
        Self::from_dataset(data, seed, population_size, max_depth, prob_variable)
    }

    /// Restarts the generator from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = create_rng(seed);
    }

    /// Replaces the training data. The population is kept.
    pub fn load_data(&mut self, data: Vec<Vec<f64>>, labels: Vec<f64>) -> Result<()> {
        self.load_dataset(Dataset::new(data, labels)?)
    }

    pub fn load_dataset(&mut self, data: Dataset) -> Result<()> {
        if data.is_empty() {
            return Err(SymregError::InvalidData("no training rows".into()));
        }
        self.data = data;
        Ok(())
    }

    /// Replaces the population with `size` fresh random individuals.
    ///
    /// Fails on a zero size or tree capacity, or a variable probability
    /// outside `[0, 1]`; the current population is then kept.
    pub fn generate_population(
        &mut self,
        size: usize,
        max_depth: usize,
        prob_variable: f64,
    ) -> Result<()> {
        if size == 0 {
            return Err(SymregError::InvalidConfig(
                "population_size must be at least 1".into(),
            ));
        }
        if max_depth == 0 {
            return Err(SymregError::InvalidConfig(
                "max_depth must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&prob_variable) {
            return Err(SymregError::InvalidConfig(format!(
                "prob_variable must be within [0, 1], got {prob_variable}"
            )));
        }
        self.population_size = size;
        self.max_depth = max_depth;
        self.prob_variable = prob_variable;
        self.population = Population::random(
            size,
            max_depth,
            prob_variable,
            self.data.num_variables(),
            max_depth,
            &mut self.rng,
        );
        Ok(())
    }

    // ---- Accessors ----

    pub fn dataset(&self) -> &Dataset {
        &self.data
    }

    pub fn data(&self) -> &[Vec<f64>] {
        &self.data.features
    }

    pub fn labels(&self) -> &[f64] {
        &self.data.labels
    }

    pub fn num_variables(&self) -> usize {
        self.data.num_variables()
    }

    pub fn num_rows(&self) -> usize {
        self.data.len()
    }

    pub fn population(&self) -> &Population<T> {
        &self.population
    }

    pub fn population_size(&self) -> usize {
        self.population_size
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn prob_variable(&self) -> f64 {
        self.prob_variable
    }

    /// Best individual of the current population.
    pub fn best_individual(&self) -> &T {
        self.population.best()
    }

    // ---- Prediction ----

    /// Output of the best individual on one row.
    pub fn predict(&self, row: &[f64]) -> f64 {
        self.population.best().predict(row)
    }

    pub fn predict_all(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        let best = self.population.best();
        rows.iter().map(|row| best.predict(row)).collect()
    }

    // ---- Generation steps ----

    /// Evaluates the current population on the training data.
    pub fn evaluate_population(&mut self, params: &Parameters) {
        self.population.evaluate(
            &self.data.features,
            &self.data.labels,
            params.evaluation_fn,
            params.parallel,
        );
    }

    /// A mating pool of the same size, filled by repeated tournaments.
    pub fn tournament_selection(&mut self, k: usize) -> Population<T> {
        let mut pool = Vec::with_capacity(self.population.len());
        for _ in 0..self.population.len() {
            let idx = self.population.select(k, &mut self.rng);
            pool.push(self.population[idx].clone());
        }
        Population::from_individuals(pool)
    }

    /// Puts `previous_best` back in place of the worst individual unless an
    /// evaluated individual is at least as fit.
    pub fn apply_elitism(&mut self, previous_best: &T) {
        let target = previous_best.fitness();
        let kept = self
            .population
            .iter()
            .any(|ind| ind.is_evaluated() && fitness_cmp(ind.fitness(), target) != Ordering::Greater);
        if kept {
            return;
        }
        let worst = self.population.worst_index();
        debug!("elitism: restoring previous best {target} at slot {worst}");
        self.population.set(worst, previous_best.clone());
    }

    /// Runs the generational loop on the loaded data.
    ///
    /// Returns an error if `params` is invalid or the population is empty.
    pub fn fit(&mut self, params: &Parameters) -> Result<FitReport<T>> {
        params.validate().map_err(SymregError::InvalidConfig)?;
        if self.population.is_empty() {
            return Err(SymregError::InvalidConfig("population is empty".into()));
        }

        let generations = params.num_evaluations / self.population.len();
        let num_variables = self.num_variables();

        self.evaluate_population(params);
        let mut best = self.population.best().clone();
        let mut fitness_history = Vec::with_capacity(generations + 1);
        fitness_history.push(best.fitness());

        for generation in 0..generations {
            let mut pool = self.tournament_selection(params.tournament_size);
            let ctx = GenerationContext {
                params,
                generation,
                max_generations: generations,
                num_variables,
            };
            T::breed(&mut pool, &ctx, &mut self.rng);
            self.population = pool;

            self.apply_elitism(&best);
            self.evaluate_population(params);
            T::after_generation(&mut self.population);

            best = self.population.best().clone();
            fitness_history.push(best.fitness());

            if params.verbose {
                info!("{generation}\t{}", best.fitness());
            } else {
                debug!("generation {generation}: best {}", best.fitness());
            }
        }

        Ok(FitReport {
            best_fitness: best.fitness(),
            best,
            generations,
            fitness_history,
        })
    }
}

/// Draws GP mutation independently for two children.
///
/// Returns which children were mutated.
pub fn apply_gp_mutations<T: Individual, R: Rng>(
    first: &mut T,
    second: &mut T,
    probability: f64,
    num_variables: usize,
    rng: &mut R,
) -> (bool, bool) {
    let mut mutated = (false, false);
    if unit(rng) < probability {
        first.mutate_gp(num_variables, rng);
        mutated.0 = true;
    }
    if unit(rng) < probability {
        second.mutate_gp(num_variables, rng);
        mutated.1 = true;
    }
    mutated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::GpAlgorithm;
    use crate::expr::{Expression, Node};
    use crate::metrics::mse;

    fn linear_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let data: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64 / 3.0, 1.0]).collect();
        let labels = data.iter().map(|r| 2.0 * r[0] + 1.0).collect();
        (data, labels)
    }

    fn params(evals: usize) -> Parameters {
        Parameters::new(evals, mse).with_parallel(false)
    }

    #[test]
    fn test_new_validates() {
        let (data, labels) = linear_data();
        assert!(GpAlgorithm::new(data.clone(), labels.clone(), 1, 0, 10, 0.5).is_err());
        assert!(GpAlgorithm::new(data.clone(), labels.clone(), 1, 10, 0, 0.5).is_err());
        assert!(GpAlgorithm::new(data.clone(), labels.clone(), 1, 10, 10, 1.5).is_err());
        assert!(GpAlgorithm::new(data, vec![1.0], 1, 10, 10, 0.5).is_err());
        assert!(GpAlgorithm::new(Vec::new(), Vec::new(), 1, 10, 10, 0.5).is_err());
    }

    #[test]
    fn test_generate_population_validates() {
        let (data, labels) = linear_data();
        let mut gp = GpAlgorithm::new(data, labels, 1, 6, 10, 0.5).unwrap();
        assert!(matches!(
            gp.generate_population(0, 10, 0.5),
            Err(SymregError::InvalidConfig(_))
        ));
        assert!(gp.generate_population(5, 0, 0.5).is_err());
        assert!(gp.generate_population(5, 10, -0.1).is_err());
        assert_eq!(gp.population().len(), 6);
        assert_eq!(gp.population_size(), 6);
        assert!(gp.predict(&[1.0, 1.0]).is_finite());

        gp.generate_population(4, 8, 1.0).unwrap();
        assert_eq!(gp.population().len(), 4);
        assert!(gp.population().iter().all(|e| e.len() <= 8));
    }

    #[test]
    fn test_initial_population() {
        let (data, labels) = linear_data();
        let gp = GpAlgorithm::new(data, labels, 1, 25, 12, 0.5).unwrap();
        assert_eq!(gp.population().len(), 25);
        assert_eq!(gp.num_variables(), 2);
        assert!(gp.population().iter().all(|e| e.len() <= 12));
    }

    #[test]
    fn test_generations_from_budget() {
        let (data, labels) = linear_data();
        let mut gp = GpAlgorithm::new(data, labels, 1, 10, 10, 0.5).unwrap();
        let report = gp.fit(&params(105)).unwrap();
        assert_eq!(report.generations, 10);
        assert_eq!(report.fitness_history.len(), 11);
    }

    #[test]
    fn test_best_fitness_never_worsens() {
        let (data, labels) = linear_data();
        let mut gp = GpAlgorithm::new(data, labels, 7, 30, 15, 0.5).unwrap();
        let report = gp.fit(&params(1500)).unwrap();
        for w in report.fitness_history.windows(2) {
            assert!(w[1] <= w[0], "history {:?}", report.fitness_history);
        }
        assert_eq!(report.best_fitness, report.best.fitness());
    }

    #[test]
    fn test_same_seed_same_result() {
        let (data, labels) = linear_data();
        let run = || {
            let mut gp = GpAlgorithm::new(data.clone(), labels.clone(), 99, 20, 15, 0.5).unwrap();
            gp.fit(&params(600)).unwrap()
        };
        let (a, b) = (run(), run());
        assert_eq!(a.best, b.best);
        assert_eq!(a.best_fitness.to_bits(), b.best_fitness.to_bits());
    }

    #[test]
    fn test_fit_rejects_invalid_params() {
        let (data, labels) = linear_data();
        let mut gp = GpAlgorithm::new(data, labels, 1, 10, 10, 0.5).unwrap();
        assert!(matches!(
            gp.fit(&params(100).with_tournament_size(0)),
            Err(SymregError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_elitism_restores_lost_best() {
        let (data, labels) = linear_data();
        let mut gp = GpAlgorithm::new(data, labels, 3, 4, 10, 0.5).unwrap();

        let mut elite = Expression::from_tree(vec![Node::Variable(0)], 10);
        elite.set_fitness(0.25);
        for i in 0..4 {
            let mut e = Expression::from_tree(vec![Node::Number(i as f64)], 10);
            e.set_fitness(1.0 + i as f64);
            gp.population.set(i, e);
        }
        gp.population[2].invalidate();

        gp.apply_elitism(&elite);
        // the unevaluated slot counts as worst
        assert_eq!(gp.population[2], elite);
        assert_eq!(gp.population.best_index(), 2);
    }

    #[test]
    fn test_elitism_keeps_population_when_best_survives() {
        let (data, labels) = linear_data();
        let mut gp = GpAlgorithm::new(data, labels, 3, 3, 10, 0.5).unwrap();
        for i in 0..3 {
            let mut e = Expression::from_tree(vec![Node::Number(i as f64)], 10);
            e.set_fitness(0.5 + i as f64);
            gp.population.set(i, e);
        }
        let before = gp.population.clone();
        let mut elite = Expression::from_tree(vec![Node::Variable(1)], 10);
        elite.set_fitness(0.5);
        gp.apply_elitism(&elite);
        for i in 0..3 {
            assert_eq!(gp.population[i], before[i]);
        }
    }

    #[test]
    fn test_tournament_selection_keeps_size() {
        let (data, labels) = linear_data();
        let mut gp = GpAlgorithm::new(data, labels, 5, 12, 10, 0.5).unwrap();
        gp.evaluate_population(&params(10));
        let pool = gp.tournament_selection(3);
        assert_eq!(pool.len(), 12);
    }

    #[test]
    fn test_predict_uses_best() {
        let (data, labels) = linear_data();
        let mut gp = GpAlgorithm::new(data.clone(), labels, 5, 3, 10, 0.5).unwrap();
        let mut e = Expression::from_tree(vec![Node::Variable(0)], 10);
        e.set_fitness(0.0);
        gp.population.set(1, e);
        assert_eq!(gp.predict(&[4.5, 1.0]), 4.5);
        let all = gp.predict_all(&data[..3]);
        assert_eq!(all, vec![data[0][0], data[1][0], data[2][0]]);
    }

    #[test]
    fn test_apply_gp_mutations_probability_bounds() {
        let mut rng = create_rng(1);
        let mut a = Expression::random(10, 0.3, 2, 10, &mut rng);
        let mut b = a.clone();
        assert_eq!(apply_gp_mutations(&mut a, &mut b, 0.0, 2, &mut rng), (false, false));
        assert_eq!(apply_gp_mutations(&mut a, &mut b, 1.0, 2, &mut rng), (true, true));
    }
}
