//! Run configuration.
//!
//! [`Parameters`] holds everything that controls the generational loop.
//! Population size, tree capacity and variable probability belong to the
//! algorithm instance instead, since they shape the initial population.

use crate::expr::gap::DEFAULT_BLX_ALPHA;
use crate::metrics::{mae, mse, rmse, ErrorFn};

/// Configuration for the GP and GA-P generational loops.
///
/// GA-specific probabilities are ignored by plain GP.
///
/// # Defaults
///
/// ```
/// use u_symreg::evolution::Parameters;
///
/// let params = Parameters::default();
/// assert_eq!(params.num_evaluations, 10_000);
/// assert_eq!(params.tournament_size, 3);
/// ```
///
/// # Builder Pattern
///
/// ```
/// use u_symreg::evolution::Parameters;
/// use u_symreg::metrics::{mae, rmse};
///
/// let params = Parameters::default()
///     .with_num_evaluations(50_000)
///     .with_gp_crossover_probability(0.8)
///     .with_tournament_size(4)
///     .with_error_function(rmse)
///     .with_error_function(mae);
/// assert_eq!(params.reporting_functions().len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct Parameters {
    /// Evaluation budget. The run lasts
    /// `num_evaluations / population_size` generations.
    pub num_evaluations: usize,

    /// Fitness function; lower is better.
    pub evaluation_fn: ErrorFn,

    /// Probability of subtree crossover for a pair (0.0–1.0).
    pub gp_crossover_probability: f64,

    /// Probability of BLX-alpha crossover of the chromosomes (0.0–1.0).
    pub ga_crossover_probability: f64,

    /// Probability of GP mutation, drawn per child (0.0–1.0).
    pub gp_mutation_probability: f64,

    /// Probability of non-uniform chromosome mutation, drawn per child.
    pub ga_mutation_probability: f64,

    /// Probability that a GA-P mother skips the same-niche partner search.
    pub inter_niche_crossover_probability: f64,

    /// Number of contestants per tournament.
    pub tournament_size: usize,

    /// Exploration factor of BLX-alpha crossover.
    pub blx_alpha: f64,

    /// Log the best fitness of every generation at `info` level.
    pub verbose: bool,

    /// Whether to evaluate individuals in parallel using rayon.
    pub parallel: bool,

    /// Extra functions reported by cross-validation after
    /// [`evaluation_fn`](Self::evaluation_fn).
    pub error_functions: Vec<ErrorFn>,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            num_evaluations: 10_000,
            evaluation_fn: mse,
            gp_crossover_probability: 0.8,
            ga_crossover_probability: 0.8,
            gp_mutation_probability: 0.1,
            ga_mutation_probability: 0.1,
            inter_niche_crossover_probability: 0.5,
            tournament_size: 3,
            blx_alpha: DEFAULT_BLX_ALPHA,
            verbose: false,
            parallel: true,
            error_functions: Vec::new(),
        }
    }
}

impl Parameters {
    /// Defaults with the given budget and fitness function.
    pub fn new(num_evaluations: usize, evaluation_fn: ErrorFn) -> Self {
        Self {
            num_evaluations,
            evaluation_fn,
            ..Self::default()
        }
    }

    /// MSE fitness with RMSE and MAE reported alongside.
    pub fn with_standard_reports(num_evaluations: usize) -> Self {
        Self::new(num_evaluations, mse)
            .with_error_function(rmse)
            .with_error_function(mae)
    }

    pub fn with_num_evaluations(mut self, n: usize) -> Self {
        self.num_evaluations = n;
        self
    }

    pub fn with_evaluation_fn(mut self, f: ErrorFn) -> Self {
        self.evaluation_fn = f;
        self
    }

    pub fn with_gp_crossover_probability(mut self, p: f64) -> Self {
        self.gp_crossover_probability = p.clamp(0.0, 1.0);
        self
    }

    pub fn with_ga_crossover_probability(mut self, p: f64) -> Self {
        self.ga_crossover_probability = p.clamp(0.0, 1.0);
        self
    }

    pub fn with_gp_mutation_probability(mut self, p: f64) -> Self {
        self.gp_mutation_probability = p.clamp(0.0, 1.0);
        self
    }

    pub fn with_ga_mutation_probability(mut self, p: f64) -> Self {
        self.ga_mutation_probability = p.clamp(0.0, 1.0);
        self
    }

    pub fn with_inter_niche_crossover_probability(mut self, p: f64) -> Self {
        self.inter_niche_crossover_probability = p.clamp(0.0, 1.0);
        self
    }

    pub fn with_tournament_size(mut self, k: usize) -> Self {
        self.tournament_size = k;
        self
    }

    /// Sets the BLX-alpha factor; negative values become 0.
    pub fn with_blx_alpha(mut self, alpha: f64) -> Self {
        self.blx_alpha = alpha.max(0.0);
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Enables or disables parallel evaluation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Appends a reporting function.
    pub fn with_error_function(mut self, f: ErrorFn) -> Self {
        self.error_functions.push(f);
        self
    }

    /// The evaluation function followed by the extra reporting functions.
    pub fn reporting_functions(&self) -> Vec<ErrorFn> {
        std::iter::once(self.evaluation_fn)
            .chain(self.error_functions.iter().copied())
            .collect()
    }

    /// Validates the configuration.
    ///
    /// Returns `Err` with a description if any parameter is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.num_evaluations == 0 {
            return Err("num_evaluations must be at least 1".into());
        }
        if self.tournament_size == 0 {
            return Err("tournament_size must be at least 1".into());
        }
        let probabilities = [
            ("gp_crossover_probability", self.gp_crossover_probability),
            ("ga_crossover_probability", self.ga_crossover_probability),
            ("gp_mutation_probability", self.gp_mutation_probability),
            ("ga_mutation_probability", self.ga_mutation_probability),
            (
                "inter_niche_crossover_probability",
                self.inter_niche_crossover_probability,
            ),
        ];
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(format!("{name} must be within [0, 1], got {p}"));
            }
        }
        if self.blx_alpha.is_nan() || self.blx_alpha < 0.0 {
            return Err("blx_alpha must be non-negative".into());
        }
        Ok(())
    }
}
