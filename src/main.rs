//! Shift Schedule Optimizer - Command Line Interface
//!
//! Loads an optimization context from JSON, runs the genetic optimizer and
//! writes the result and its generation history.

use clap::{Parser, Subcommand};
use serde::Serialize;
use shift_ga::context::OptimizationContext;
use shift_ga::error::{OptimizerError, Result};
use shift_ga::genetic::{default_objective_weights, optimize_and_record, GeneticParameters, ObjectiveWeights};
use shift_ga::report::{GenerationRecord, OptimizationResult, ResultSink};

use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "shift-ga")]
#[command(version = "1.0")]
#[command(about = "Genetic optimizer for workforce shift scheduling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize a schedule for a context file
    Solve {
        /// Context JSON (employees, shifts, demand, limits)
        #[arg(short, long)]
        context: PathBuf,

        /// Genetic parameters JSON; missing fields take defaults
        #[arg(short, long)]
        params: Option<PathBuf>,

        /// Objective weights JSON, e.g. {"cost": 0.3, "coverage": 0.4}
        #[arg(short, long)]
        weights: Option<PathBuf>,

        /// Random seed
        #[arg(short, long)]
        seed: Option<u64>,

        /// Maximum number of generations
        #[arg(short, long)]
        generations: Option<usize>,

        /// Population size
        #[arg(long)]
        population: Option<usize>,

        /// Time limit in seconds
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Write the result as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the generation history as CSV
        #[arg(long)]
        history: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Analyze a context file
    Analyze {
        /// Context JSON
        #[arg(short, long)]
        context: PathBuf,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Solve { context, params, weights, seed, generations, population, time_limit, output, history, verbose } => {
            let overrides = Overrides { seed, generations, population, time_limit };
            solve(&context, params, weights, overrides, output, history, verbose)
        }

        Commands::Analyze { context } => analyze(&context),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

struct Overrides {
    seed: Option<u64>,
    generations: Option<usize>,
    population: Option<usize>,
    time_limit: Option<f64>,
}

fn solve(
    context_path: &Path,
    params_path: Option<PathBuf>,
    weights_path: Option<PathBuf>,
    overrides: Overrides,
    output: Option<PathBuf>,
    history: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    println!("Loading context from {:?}...", context_path);
    let context = load_context(context_path)?;

    let mut params: GeneticParameters = match params_path {
        Some(path) => read_json(&path)?,
        None => GeneticParameters::default(),
    };
    if let Some(seed) = overrides.seed {
        params.seed = seed;
    }
    if let Some(generations) = overrides.generations {
        params.generations = generations;
    }
    if let Some(population) = overrides.population {
        params.population_size = population;
    }
    if let Some(secs) = overrides.time_limit {
        params.time_budget_secs = Some(secs);
    }

    let weights: ObjectiveWeights = match weights_path {
        Some(path) => read_json(&path)?,
        None => default_objective_weights(),
    };

    if verbose {
        println!("{}", context.statistics());
        println!("Parameters: {:?}", params);
        println!("Weights: {:?}", weights);
    }

    println!("Optimizing with population {} for up to {} generations...", params.population_size, params.generations);
    let mut sink = FileSink { output, history };
    let result = optimize_and_record(&context, &weights, params, &mut sink)?;

    println!("\n{}", result);
    if result.degenerate {
        println!("Warning: context could not be optimized ({:?})", result.termination);
    }

    Ok(())
}

fn analyze(context_path: &Path) -> Result<()> {
    let context = load_context(context_path)?;

    println!("========== Context Analysis ==========\n");
    println!("{}", context.statistics());

    match context.validate() {
        Ok(()) => println!("Context is ready for optimization"),
        Err(e) => println!("Context cannot be optimized: {}", e),
    }

    println!("\nShift Requirements:");
    for shift in &context.shifts {
        println!(
            "  {}: {} -> {} ({:.1}h), {} agents, skills [{}], priority {}",
            shift.id,
            shift.start,
            shift.end,
            shift.duration_hours(),
            shift.required_agents,
            shift.required_skills.join(", "),
            shift.priority
        );
    }

    Ok(())
}

fn load_context(path: &Path) -> Result<OptimizationContext> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| OptimizerError::ContextUnavailable(format!("cannot read {:?}: {}", path, e)))?;
    OptimizationContext::from_json_str(&json)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| OptimizerError::InvalidParameters(format!("cannot read {:?}: {}", path, e)))?;
    serde_json::from_str(&json)
        .map_err(|e| OptimizerError::InvalidParameters(format!("cannot parse {:?}: {}", path, e)))
}

/// One CSV row per generation
#[derive(Debug, Serialize)]
struct HistoryRow {
    generation: usize,
    best_fitness: f64,
    average_fitness: f64,
    fitness_std_dev: f64,
    cost: f64,
    coverage: f64,
    satisfaction: f64,
    stability: f64,
    compliance: f64,
    best_violations: usize,
    diversity: f64,
    elapsed_secs: f64,
}

impl From<&GenerationRecord> for HistoryRow {
    fn from(record: &GenerationRecord) -> Self {
        HistoryRow {
            generation: record.generation,
            best_fitness: record.best_fitness,
            average_fitness: record.average_fitness,
            fitness_std_dev: record.fitness_std_dev,
            cost: record.best_scores.cost,
            coverage: record.best_scores.coverage,
            satisfaction: record.best_scores.satisfaction,
            stability: record.best_scores.stability,
            compliance: record.best_scores.compliance,
            best_violations: record.best_violations,
            diversity: record.diversity,
            elapsed_secs: record.elapsed_secs,
        }
    }
}

/// Writes the result JSON and history CSV
struct FileSink {
    output: Option<PathBuf>,
    history: Option<PathBuf>,
}

impl ResultSink for FileSink {
    fn record(&mut self, result: &OptimizationResult) -> Result<()> {
        if let Some(path) = &self.output {
            let json = serde_json::to_string_pretty(result).map_err(|e| OptimizerError::Sink(e.to_string()))?;
            std::fs::write(path, json).map_err(|e| OptimizerError::Sink(format!("{:?}: {}", path, e)))?;
            println!("Result saved to {:?}", path);
        }

        if let Some(path) = &self.history {
            export_history_csv(path, &result.history).map_err(|e| OptimizerError::Sink(format!("{:?}: {}", path, e)))?;
            println!("History saved to {:?}", path);
        }

        Ok(())
    }
}

fn export_history_csv(path: &Path, history: &[GenerationRecord]) -> std::result::Result<(), csv::Error> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);

    for record in history {
        writer.serialize(HistoryRow::from(record))?;
    }

    writer.flush()?;
    Ok(())
}
