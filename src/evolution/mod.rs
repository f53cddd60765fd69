//! Generational evolution of expressions.
//!
//! A generic driver parameterised by the individual type. The individual
//! decides how a mating pool is bred through [`Breed`]; everything else
//! (selection, elitism, evaluation, cross-validation) is shared.
//!
//! # Core Traits
//!
//! - [`Individual`]: random construction, cached evaluation, GP operators
//! - [`Breed`]: per-generation pairing and operator application
//!
//! # Key Types
//!
//! - [`Parameters`]: run configuration with builder setters
//! - [`Population`]: individuals plus best tracking
//! - [`PopulationAlgorithm`]: data, population and seeded generator
//! - [`GpAlgorithm`] / [`GapAlgorithm`]: the two concrete drivers
//! - [`FitReport`] / [`CrossValidation`]: run results
//!
//! # References
//!
//! - Koza (1992), *Genetic Programming: On the Programming of Computers by
//!   Means of Natural Selection*
//! - Howard & D'Angelo (1995), "The GA-P: A Genetic Algorithm and Genetic
//!   Programming Hybrid"

mod algorithm;
mod config;
mod cross_validation;
mod gap;
mod gp;
mod population;
mod selection;
mod types;

pub use algorithm::{apply_gp_mutations, FitReport, PopulationAlgorithm};
pub use config::Parameters;
pub use cross_validation::CrossValidation;
pub use gap::GapAlgorithm;
pub use gp::GpAlgorithm;
pub use population::Population;
pub use selection::tournament;
pub use types::{fitness_cmp, Breed, GenerationContext, Individual};
