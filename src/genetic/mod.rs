//! Genetic search over staffing schedules.

pub mod constraints;
pub mod evolution;
pub mod fitness;
pub mod initializer;
pub mod operators;
pub mod params;
pub mod selection;

pub use evolution::{optimize, optimize_and_record, EvolutionController, EvolutionState};
pub use fitness::{default_objective_weights, EvaluatorSettings, FitnessEvaluator, ObjectiveWeights};
pub use params::GeneticParameters;
