//! Shift Schedule Optimizer Library
//!
//! A genetic algorithm that staffs a set of shift requirements from an
//! employee roster, balancing labor cost, demand coverage, employee
//! satisfaction, schedule stability and regulatory compliance.
//!
//! # Features
//!
//! - Seeded, reproducible evolution (tournament selection, single-point crossover, elitism)
//! - Weighted multi-objective fitness with hard-constraint penalties
//! - Parallel fitness evaluation on a rayon pool
//! - Convergence and wall-clock termination with per-generation history
//!
//! # Example
//!
//! ```no_run
//! use shift_ga::context::OptimizationContext;
//! use shift_ga::genetic::{default_objective_weights, optimize, GeneticParameters};
//!
//! let json = std::fs::read_to_string("context.json").unwrap();
//! let context = OptimizationContext::from_json_str(&json).unwrap();
//!
//! let params = GeneticParameters { generations: 50, ..Default::default() };
//! let result = optimize(&context, &default_objective_weights(), params).unwrap();
//!
//! println!("Best fitness: {:.4}", result.best_fitness());
//! ```

pub mod chromosome;
pub mod context;
pub mod error;
pub mod genetic;
pub mod report;

pub use chromosome::{Chromosome, Genes, ObjectiveKind, ObjectiveScores};
pub use context::OptimizationContext;
pub use error::{OptimizerError, Result};
pub use genetic::{optimize, optimize_and_record, GeneticParameters};
pub use report::{OptimizationResult, ResultSink, TerminationReason};
