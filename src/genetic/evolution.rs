//! Evolution controller.
//!
//! Drives the generational loop: elitism, tournament selection, crossover,
//! mutation and parallel re-scoring, with convergence and time-budget
//! termination. The loop itself is sequential and owns the only RNG; only
//! fitness evaluation fans out across the rayon pool.

use crate::chromosome::{Chromosome, IdSequence};
use crate::context::OptimizationContext;
use crate::error::{OptimizerError, Result};
use crate::genetic::fitness::{FitnessEvaluator, EvaluatorSettings, ObjectiveWeights};
use crate::genetic::initializer::initialize_population;
use crate::genetic::operators::{crossover, mutate};
use crate::genetic::params::GeneticParameters;
use crate::genetic::selection::{compare_rank, select, sort_by_rank};
use crate::report::{best_of, GenerationRecord, OptimizationResult, ResultReporter, ResultSink, TerminationReason};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::time::Instant;

/// Generations between the two best-fitness values compared for convergence
pub const CONVERGENCE_WINDOW: usize = 10;

/// Phase the controller is in
///
/// [`EvolutionController::state`] reports the last phase entered, and every
/// transition is logged at `trace` level. The breeding phases (`Selecting`, `Breeding`, `Mutating`)
/// repeat once per offspring pair inside a generation, so callers of
/// [`EvolutionController::run`] only ever observe `Initializing` before the
/// run and `Terminated` after it; the intermediate phases show up in the trace.
#[derive(Debug, Clone, PartialEq)]
pub enum EvolutionState {
    Initializing,
    Evaluating,
    Selecting,
    Breeding,
    Mutating,
    ScoringOffspring,
    ConvergenceCheck,
    Terminated(TerminationReason),
}

/// Genetic Algorithm controller for one run
pub struct EvolutionController<'a> {
    params: GeneticParameters,
    context: &'a OptimizationContext,
    evaluator: FitnessEvaluator<'a>,
    pool: Option<rayon::ThreadPool>,
    rng: ChaCha8Rng,
    ids: IdSequence,
    population: Vec<Chromosome>,
    best: Option<Chromosome>,
    history: Vec<GenerationRecord>,
    generation: usize,
    state: EvolutionState,
}

impl<'a> EvolutionController<'a> {
    pub fn new(
        context: &'a OptimizationContext,
        weights: &ObjectiveWeights,
        params: GeneticParameters,
    ) -> Result<Self> {
        Self::with_settings(context, weights, params, EvaluatorSettings::default())
    }

    pub fn with_settings(
        context: &'a OptimizationContext,
        weights: &ObjectiveWeights,
        params: GeneticParameters,
        settings: EvaluatorSettings,
    ) -> Result<Self> {
        params.validate()?;

        let pool = match params.worker_threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| OptimizerError::ThreadPool(e.to_string()))?,
            ),
            None => None,
        };
        let rng = ChaCha8Rng::seed_from_u64(params.seed);

        Ok(EvolutionController {
            evaluator: FitnessEvaluator::with_settings(context, weights, settings),
            params,
            context,
            pool,
            rng,
            ids: IdSequence::default(),
            population: Vec::new(),
            best: None,
            history: Vec::new(),
            generation: 0,
            state: EvolutionState::Initializing,
        })
    }

    pub fn state(&self) -> &EvolutionState {
        &self.state
    }

    pub fn current_generation(&self) -> usize {
        self.generation
    }

    pub fn population(&self) -> &[Chromosome] {
        &self.population
    }

    fn enter(&mut self, state: EvolutionState) {
        log::trace!("[GA] Gen {} -> {:?}", self.generation, state);
        self.state = state;
    }

    /// Run to termination and package the result
    pub fn run(&mut self) -> OptimizationResult {
        let start = Instant::now();
        let reporter = ResultReporter::new(self.params.baseline_fitness);

        if let Err(e) = self.context.validate() {
            let reason = match e {
                OptimizerError::ContextUnavailable(reason) => reason,
                other => other.to_string(),
            };
            log::warn!("[GA] Context unavailable: {}; returning degenerate result", reason);
            self.enter(EvolutionState::Terminated(TerminationReason::ContextUnavailable(reason.clone())));
            return reporter.degenerate(reason, start.elapsed().as_secs_f64());
        }

        self.initialize(&start);

        let budget = self.params.time_budget();
        let reason = loop {
            if self.generation >= self.params.generations {
                break TerminationReason::MaxGenerations;
            }
            if budget.map_or(false, |b| start.elapsed() >= b) {
                break TerminationReason::TimeBudgetExceeded;
            }

            self.evolve();
            self.record_generation(&start);

            self.enter(EvolutionState::ConvergenceCheck);
            if self.has_converged() {
                break TerminationReason::Converged;
            }
        };

        log::info!(
            "[GA] Terminated after generation {} ({:?}), best fitness {:.4}, {:.2}s",
            self.generation,
            reason,
            self.best.as_ref().map_or(0.0, |b| b.fitness()),
            start.elapsed().as_secs_f64()
        );
        self.enter(EvolutionState::Terminated(reason.clone()));

        let best = match self.best.clone() {
            Some(best) => best,
            None => return reporter.degenerate("no chromosome was produced".to_string(), start.elapsed().as_secs_f64()),
        };
        reporter.build(
            best,
            self.population.clone(),
            self.history.clone(),
            reason,
            start.elapsed().as_secs_f64(),
        )
    }

    fn initialize(&mut self, start: &Instant) {
        self.enter(EvolutionState::Initializing);
        self.population = initialize_population(
            self.context,
            self.params.population_size,
            &mut self.ids,
            &mut self.rng,
        );

        self.enter(EvolutionState::Evaluating);
        self.evaluate_population();
        self.record_generation(start);

        let failed = self.population.iter().filter(|c| c.evaluation_failed()).count();
        log::info!(
            "[GA] Initialized population: {} (failed evaluations: {}), best fitness {:.4}",
            self.population.len(),
            failed,
            self.best.as_ref().map_or(0.0, |b| b.fitness())
        );
    }

    /// Create the next generation
    fn evolve(&mut self) {
        self.generation += 1;
        let generation = self.generation;
        let size = self.params.population_size;

        let mut parents = std::mem::take(&mut self.population);
        sort_by_rank(&mut parents);

        let mut next: Vec<Chromosome> = parents
            .iter()
            .filter(|c| !c.evaluation_failed())
            .take(self.params.elite_count())
            .cloned()
            .collect();

        while next.len() < size {
            self.enter(EvolutionState::Selecting);
            let picks = select(&parents, self.params.tournament_size, 2, &mut self.rng);
            let (parent_a, parent_b) = (&parents[picks[0]], &parents[picks[1]]);

            self.enter(EvolutionState::Breeding);
            let (genes_a, genes_b) = if self.rng.gen_bool(self.params.crossover_rate) {
                crossover(parent_a, parent_b, self.context, &mut self.rng)
            } else {
                (parent_a.genes().clone(), parent_b.genes().clone())
            };

            self.enter(EvolutionState::Mutating);
            for genes in [genes_a, genes_b] {
                if next.len() >= size {
                    break;
                }
                let mut child = Chromosome::new(self.ids.next_id(), genes, generation);
                if self.rng.gen_bool(self.params.mutation_rate) {
                    child = mutate(child, self.context, &mut self.rng);
                }
                next.push(child);
            }
        }

        self.population = next;
        self.enter(EvolutionState::ScoringOffspring);
        self.evaluate_population();
    }

    /// Score every unscored member in parallel; failures score zero
    fn evaluate_population(&mut self) {
        match &self.pool {
            Some(pool) => pool.install(|| evaluate_all(&self.evaluator, &mut self.population)),
            None => evaluate_all(&self.evaluator, &mut self.population),
        }

        if let Some(candidate) = best_of(&self.population) {
            let improved = self
                .best
                .as_ref()
                .map_or(true, |best| compare_rank(candidate, best) == Ordering::Greater);
            if improved {
                self.best = Some(candidate.clone());
            }
        }
    }

    fn record_generation(&mut self, start: &Instant) {
        let record = GenerationRecord::from_population(
            self.generation,
            &self.population,
            start.elapsed().as_secs_f64(),
        );
        log::debug!(
            "[GA] Gen {}  Best {:.4}  Avg {:.4}  Diversity {:.2}  Elapsed {:.2}s",
            record.generation,
            record.best_fitness,
            record.average_fitness,
            record.diversity,
            record.elapsed_secs
        );
        self.history.push(record);
    }

    /// Relative gain of the current best over the best one window back
    fn has_converged(&self) -> bool {
        if self.generation < CONVERGENCE_WINDOW || self.history.len() <= CONVERGENCE_WINDOW {
            return false;
        }
        let current = self.history[self.history.len() - 1].best_fitness;
        let previous = self.history[self.history.len() - 1 - CONVERGENCE_WINDOW].best_fitness;

        let relative = if previous > 0.0 {
            (current - previous) / previous
        } else if current > previous {
            f64::INFINITY
        } else {
            0.0
        };
        relative < self.params.convergence_threshold
    }
}

fn evaluate_all(evaluator: &FitnessEvaluator<'_>, population: &mut [Chromosome]) {
    population
        .par_iter_mut()
        .filter(|c| !c.is_evaluated())
        .for_each(|chromosome| match evaluator.evaluate(chromosome) {
            Ok(evaluation) => chromosome.apply_evaluation(evaluation),
            Err(e) => {
                log::warn!("[GA] {}; scoring as zero", e);
                chromosome.mark_evaluation_failed();
            }
        });
}

/// Optimize a schedule for `context`
///
/// Only invalid `params` produce an `Err`; an unusable context yields a
/// degenerate zero-fitness result.
pub fn optimize(
    context: &OptimizationContext,
    objective_weights: &ObjectiveWeights,
    params: GeneticParameters,
) -> Result<OptimizationResult> {
    let mut controller = EvolutionController::new(context, objective_weights, params)?;
    Ok(controller.run())
}

/// Optimize, then hand the result to `sink`
pub fn optimize_and_record(
    context: &OptimizationContext,
    objective_weights: &ObjectiveWeights,
    params: GeneticParameters,
    sink: &mut dyn ResultSink,
) -> Result<OptimizationResult> {
    let result = optimize(context, objective_weights, params)?;
    sink.record(&result)?;
    Ok(result)
}
