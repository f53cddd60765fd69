//! Evolutionary symbolic regression.
//!
//! Evolves arithmetic expression trees that approximate a labelling
//! function over tabular data:
//!
//! - **Expressions**: binary trees over `+ - * /`, variables and constants,
//!   stored as preorder-flattened node vectors with a node-count capacity.
//! - **Genetic Programming (GP)**: subtree crossover, point and subtree
//!   mutation, tournament selection and elitism.
//! - **GA-P**: trees whose constants live in a real-valued chromosome,
//!   evolved jointly with BLX-alpha crossover, non-uniform mutation and
//!   niche-aware pairing.
//! - **Cross-validation**: train/test files and contiguous k-fold runs
//!   reporting several error functions.
//!
//! # Architecture
//!
//! [`expr`] holds the representation and the genetic operators,
//! [`evolution`] the generic generational driver. Randomness always flows
//! through an explicit `&mut impl Rng` created by [`random::create_rng`],
//! so a fixed seed reproduces a run.
//!
//! # Example
//!
//! ```
//! use u_symreg::evolution::{GapAlgorithm, Parameters};
//!
//! let data: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64 * 0.1]).collect();
//! let labels: Vec<f64> = data.iter().map(|r| r[0] * r[0] + 0.5).collect();
//!
//! let mut gap = GapAlgorithm::new(data, labels, 7, 30, 15, 0.5).unwrap();
//! let report = gap.fit(&Parameters::with_standard_reports(900)).unwrap();
//! println!("{} -> {}", report.best, report.best_fitness);
//! ```

pub mod dataset;
pub mod error;
pub mod evolution;
pub mod expr;
pub mod metrics;
pub mod random;

pub use dataset::Dataset;
pub use error::{Result, SymregError};
