//! Result reporting.
//!
//! Packages the final population and generation history into an
//! [`OptimizationResult`] and hands it to an external [`ResultSink`].

use crate::chromosome::{Chromosome, Evaluation, Genes, ObjectiveScores};
use crate::error::Result;
use crate::genetic::selection::compare_rank;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Why a run stopped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Configured generation count reached
    MaxGenerations,
    /// Relative improvement over the trailing window fell below the threshold
    Converged,
    /// Wall-clock budget spent; best-so-far returned
    TimeBudgetExceeded,
    /// Context could not support a run; degenerate result
    ContextUnavailable(String),
}

/// Snapshot of one generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub generation: usize,
    pub best_fitness: f64,
    pub average_fitness: f64,
    pub fitness_std_dev: f64,
    /// Objective breakdown of the generation's best chromosome
    pub best_scores: ObjectiveScores,
    pub best_violations: usize,
    /// Mean pairwise gene distance over the leading members
    pub diversity: f64,
    /// Seconds since the run started
    pub elapsed_secs: f64,
}

impl GenerationRecord {
    pub fn from_population(generation: usize, population: &[Chromosome], elapsed_secs: f64) -> Self {
        let stats = PopulationStatistics::from_population(population);
        let best = best_of(population);

        GenerationRecord {
            generation,
            best_fitness: stats.best_fitness,
            average_fitness: stats.mean_fitness,
            fitness_std_dev: stats.fitness_std_dev,
            best_scores: best.map(|c| *c.objective_scores()).unwrap_or_default(),
            best_violations: best.map(|c| c.constraint_violations().len()).unwrap_or(0),
            diversity: population_diversity(population),
            elapsed_secs,
        }
    }
}

/// Fitness statistics of a population
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationStatistics {
    pub size: usize,
    pub best_fitness: f64,
    pub worst_fitness: f64,
    pub mean_fitness: f64,
    pub fitness_std_dev: f64,
    /// Members with no hard violation
    pub violation_free: usize,
    pub failed_evaluations: usize,
}

impl PopulationStatistics {
    pub fn from_population(population: &[Chromosome]) -> Self {
        if population.is_empty() {
            return PopulationStatistics::default();
        }

        let fitness: Vec<f64> = population.iter().map(|c| c.fitness()).collect();
        let fitness_std_dev = if fitness.len() < 2 {
            0.0
        } else {
            fitness.iter().population_std_dev()
        };

        PopulationStatistics {
            size: population.len(),
            best_fitness: fitness.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            worst_fitness: fitness.iter().cloned().fold(f64::INFINITY, f64::min),
            mean_fitness: fitness.iter().mean(),
            fitness_std_dev,
            violation_free: population
                .iter()
                .filter(|c| c.constraint_violations().is_empty() && !c.evaluation_failed())
                .count(),
            failed_evaluations: population.iter().filter(|c| c.evaluation_failed()).count(),
        }
    }
}

/// Final outcome of a run. Built once, never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub best: Chromosome,
    pub generation_reached: usize,
    pub convergence_achieved: bool,
    /// Stopped by the time budget
    pub partial: bool,
    /// Produced from an unusable context
    pub degenerate: bool,
    pub termination: TerminationReason,
    pub elapsed_secs: f64,
    pub baseline_fitness: f64,
    pub improvement_percentage: f64,
    pub final_population: Vec<Chromosome>,
    pub history: Vec<GenerationRecord>,
    pub statistics: PopulationStatistics,
}

impl OptimizationResult {
    pub fn best_fitness(&self) -> f64 {
        self.best.fitness()
    }
}

impl std::fmt::Display for OptimizationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scores = self.best.objective_scores();
        writeln!(f, "Optimization result ({:?})", self.termination)?;
        writeln!(f, "  Best fitness: {:.4}", self.best_fitness())?;
        writeln!(f, "  Generations: {}", self.generation_reached)?;
        writeln!(f, "  Improvement: {:.2}% over {:.4}", self.improvement_percentage, self.baseline_fitness)?;
        writeln!(
            f,
            "  Scores: cost {:.3}  coverage {:.3}  satisfaction {:.3}  stability {:.3}  compliance {:.3}",
            scores.cost, scores.coverage, scores.satisfaction, scores.stability, scores.compliance
        )?;
        writeln!(f, "  Violations: {}", self.best.constraint_violations().len())?;
        writeln!(f, "  Time: {:.4}s", self.elapsed_secs)?;
        for (shift_id, staff) in &self.best.genes().shift_assignments {
            let staff: Vec<&str> = staff.iter().map(|s| s.as_str()).collect();
            writeln!(f, "  {}: {}", shift_id, staff.join(", "))?;
        }
        Ok(())
    }
}

/// Builds results; the baseline defaults to generation 0's best fitness
#[derive(Debug, Clone, Default)]
pub struct ResultReporter {
    baseline_fitness: Option<f64>,
}

impl ResultReporter {
    pub fn new(baseline_fitness: Option<f64>) -> Self {
        ResultReporter { baseline_fitness }
    }

    pub fn build(
        &self,
        best: Chromosome,
        final_population: Vec<Chromosome>,
        history: Vec<GenerationRecord>,
        termination: TerminationReason,
        elapsed_secs: f64,
    ) -> OptimizationResult {
        let baseline_fitness = self
            .baseline_fitness
            .or_else(|| history.first().map(|r| r.best_fitness))
            .unwrap_or(0.0);
        let generation_reached = history.last().map(|r| r.generation).unwrap_or(0);

        OptimizationResult {
            improvement_percentage: improvement_percentage(best.fitness(), baseline_fitness),
            statistics: PopulationStatistics::from_population(&final_population),
            convergence_achieved: termination == TerminationReason::Converged,
            partial: termination == TerminationReason::TimeBudgetExceeded,
            degenerate: matches!(termination, TerminationReason::ContextUnavailable(_)),
            best,
            generation_reached,
            termination,
            elapsed_secs,
            baseline_fitness,
            final_population,
            history,
        }
    }

    /// Zero-fitness result for a context that cannot be optimized
    pub fn degenerate(&self, reason: String, elapsed_secs: f64) -> OptimizationResult {
        let mut best = Chromosome::new(0, Genes::default(), 0);
        best.apply_evaluation(Evaluation {
            fitness: 0.0,
            objective_scores: ObjectiveScores::default(),
            violations: Vec::new(),
        });
        let population = vec![best.clone()];
        let history = vec![GenerationRecord::from_population(0, &population, elapsed_secs)];

        self.build(
            best,
            population,
            history,
            TerminationReason::ContextUnavailable(reason),
            elapsed_secs,
        )
    }
}

/// Percentage gain of `best` over `baseline`; zero for a non-positive baseline
pub fn improvement_percentage(best: f64, baseline: f64) -> f64 {
    if baseline <= 0.0 {
        return 0.0;
    }
    (best - baseline) / baseline * 100.0
}

/// Highest ranked member
pub fn best_of(population: &[Chromosome]) -> Option<&Chromosome> {
    population.iter().max_by(|a, b| compare_rank(a, b))
}

/// Mean pairwise gene distance over the first 20 members
pub fn population_diversity(population: &[Chromosome]) -> f64 {
    let sample = &population[..population.len().min(20)];
    if sample.len() < 2 {
        return 0.0;
    }

    let mut total = 0usize;
    let mut count = 0usize;
    for i in 0..sample.len() {
        for j in i + 1..sample.len() {
            total += sample[i].genes().distance(sample[j].genes());
            count += 1;
        }
    }

    total as f64 / count as f64
}

/// Outbound persistence boundary
pub trait ResultSink {
    fn record(&mut self, result: &OptimizationResult) -> Result<()>;
}

/// Keeps recorded results in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub results: Vec<OptimizationResult>,
}

impl ResultSink for MemorySink {
    fn record(&mut self, result: &OptimizationResult) -> Result<()> {
        self.results.push(result.clone());
        Ok(())
    }
}
