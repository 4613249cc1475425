//! Genetic algorithm configuration.

use crate::error::{OptimizerError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Genetic Algorithm configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticParameters {
    /// Population size
    pub population_size: usize,
    /// Maximum number of generations
    pub generations: usize,
    /// Crossover probability
    pub crossover_rate: f64,
    /// Mutation probability per child
    pub mutation_rate: f64,
    /// Fraction of the population carried over unchanged
    pub elite_fraction: f64,
    /// Tournament size for selection
    pub tournament_size: usize,
    /// Minimum relative improvement over the trailing window to keep going
    pub convergence_threshold: f64,
    /// Wall-clock budget in seconds (optional)
    pub time_budget_secs: Option<f64>,
    /// Random seed
    pub seed: u64,
    /// Size of a dedicated evaluation pool; the global rayon pool when unset
    pub worker_threads: Option<usize>,
    /// Fitness the improvement percentage is measured against; generation 0 best when unset
    pub baseline_fitness: Option<f64>,
}

impl Default for GeneticParameters {
    fn default() -> Self {
        GeneticParameters {
            population_size: 50,
            generations: 100,
            crossover_rate: 0.8,
            mutation_rate: 0.1,
            elite_fraction: 0.1,
            tournament_size: 3,
            convergence_threshold: 0.001,
            time_budget_secs: None,
            seed: 42,
            worker_threads: None,
            baseline_fitness: None,
        }
    }
}

impl GeneticParameters {
    /// Reject configurations a run cannot be built from
    pub fn validate(&self) -> Result<()> {
        if self.population_size == 0 {
            return Err(invalid("population_size must be at least 1"));
        }
        if self.generations == 0 {
            return Err(invalid("generations must be at least 1"));
        }
        if self.tournament_size == 0 {
            return Err(invalid("tournament_size must be at least 1"));
        }
        for (name, rate) in [
            ("crossover_rate", self.crossover_rate),
            ("mutation_rate", self.mutation_rate),
            ("elite_fraction", self.elite_fraction),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(invalid(&format!("{} must lie in [0, 1], got {}", name, rate)));
            }
        }
        if !self.convergence_threshold.is_finite() || self.convergence_threshold < 0.0 {
            return Err(invalid("convergence_threshold must be a non-negative number"));
        }
        if let Some(secs) = self.time_budget_secs {
            if !secs.is_finite() || secs < 0.0 {
                return Err(invalid("time_budget_secs must be a non-negative number"));
            }
        }
        if self.worker_threads == Some(0) {
            return Err(invalid("worker_threads must be at least 1 when set"));
        }
        Ok(())
    }

    /// Number of elites carried into each generation, never below one
    pub fn elite_count(&self) -> usize {
        ((self.elite_fraction * self.population_size as f64) as usize)
            .clamp(1, self.population_size.max(1))
    }

    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_secs.map(Duration::from_secs_f64)
    }
}

fn invalid(message: &str) -> OptimizerError {
    OptimizerError::InvalidParameters(message.to_string())
}
