//! End-to-end properties of the optimizer.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use shift_ga::chromosome::{Genes, IdSequence};
use shift_ga::context::OptimizationContext;
use shift_ga::genetic::fitness::COMPLIANT_SCORE_FLOOR;
use shift_ga::genetic::initializer::initialize_population;
use shift_ga::genetic::{default_objective_weights, optimize, GeneticParameters};
use shift_ga::report::{MemorySink, TerminationReason};
use shift_ga::{optimize_and_record, OptimizerError};

const CONTEXT: &str = r#"{
  "employees": [
    {"id": "ana", "department": "support", "role": "team_lead", "skills": ["voice", "chat"], "primary_skill": "voice",
     "hourly_rate": 31.0, "overtime_rate": 46.5, "max_hours_per_week": 40.0, "shift_preference": "morning"},
    {"id": "ben", "department": "support", "role": "senior", "skills": ["voice", "email"], "primary_skill": "voice",
     "hourly_rate": 25.0, "overtime_rate": 37.5, "max_hours_per_week": 40.0, "shift_preference": "afternoon"},
    {"id": "cleo", "department": "support", "role": "agent", "skills": ["chat"], "primary_skill": "chat",
     "hourly_rate": 18.0, "overtime_rate": 27.0, "max_hours_per_week": 32.0, "shift_preference": "flexible"},
    {"id": "dev", "department": "support", "role": "agent", "skills": ["voice"], "primary_skill": "voice",
     "hourly_rate": 17.5, "overtime_rate": 26.25, "max_hours_per_week": 40.0, "shift_preference": "evening"},
    {"id": "eli", "department": "support", "role": "agent", "skills": ["email", "chat"], "primary_skill": "email",
     "hourly_rate": 19.0, "overtime_rate": 28.5, "max_hours_per_week": 40.0, "shift_preference": "morning"}
  ],
  "shifts": [
    {"id": "early", "start": "2024-03-04T08:00:00", "end": "2024-03-04T16:00:00", "required_agents": 2,
     "required_skills": ["voice"], "target_service_level": 0.8, "priority": 1},
    {"id": "late", "start": "2024-03-04T12:00:00", "end": "2024-03-04T20:00:00", "required_agents": 3,
     "required_skills": ["chat", "voice"], "target_service_level": 0.8, "priority": 2},
    {"id": "email", "start": "2024-03-05T09:00:00", "end": "2024-03-05T13:00:00", "required_agents": 1,
     "required_skills": ["email"], "target_service_level": 0.9, "priority": 1}
  ],
  "demand": [
    {"start": "2024-03-04T09:00:00", "end": "2024-03-04T10:00:00", "contact_volume": 18.0,
     "required_service_level": 0.8, "skill_requirements": {"voice": 1.0}, "business_priority": 2},
    {"start": "2024-03-04T15:00:00", "end": "2024-03-04T16:00:00", "contact_volume": 27.0,
     "required_service_level": 0.8, "skill_requirements": {"chat": 0.5, "voice": 0.5}, "business_priority": 1}
  ]
}"#;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn load_context() -> OptimizationContext {
    OptimizationContext::from_json_str(CONTEXT).unwrap()
}

fn scenario_params() -> GeneticParameters {
    GeneticParameters {
        population_size: 20,
        generations: 10,
        mutation_rate: 0.1,
        crossover_rate: 0.8,
        elite_fraction: 0.1,
        seed: 2024,
        ..Default::default()
    }
}

#[test]
fn test_scenario_staffs_every_shift() {
    init_logging();
    let context = load_context();
    let result = optimize(&context, &default_objective_weights(), scenario_params()).unwrap();

    assert!(result.generation_reached <= 10);
    assert!(!result.degenerate);
    for shift in &context.shifts {
        assert_eq!(result.best.genes().shift_assignments[&shift.id].len(), shift.required_agents);
    }
}

#[test]
fn test_same_seed_same_result() {
    init_logging();
    let context = load_context();
    let weights = default_objective_weights();
    let first = optimize(&context, &weights, scenario_params()).unwrap();
    let second = optimize(&context, &weights, scenario_params()).unwrap();

    assert_eq!(first.best, second.best);
    assert_eq!(first.final_population, second.final_population);
    assert_eq!(first.generation_reached, second.generation_reached);
    assert_eq!(first.termination, second.termination);
    let curve = |r: &shift_ga::OptimizationResult| -> Vec<(f64, f64, f64)> {
        r.history.iter().map(|h| (h.best_fitness, h.average_fitness, h.diversity)).collect()
    };
    assert_eq!(curve(&first), curve(&second));
}

#[test]
fn test_best_fitness_never_drops() {
    init_logging();
    let context = load_context();
    let params = GeneticParameters {
        generations: 30,
        convergence_threshold: 0.0,
        ..scenario_params()
    };
    let result = optimize(&context, &default_objective_weights(), params).unwrap();

    for pair in result.history.windows(2) {
        assert!(pair[1].best_fitness >= pair[0].best_fitness);
    }
}

#[test]
fn test_population_size_is_constant() {
    init_logging();
    let context = load_context();
    let params = GeneticParameters { population_size: 17, ..scenario_params() };
    let result = optimize(&context, &default_objective_weights(), params).unwrap();

    assert_eq!(result.final_population.len(), 17);
    assert_eq!(result.statistics.size, 17);
}

#[test]
fn test_no_gene_drift_without_variation() {
    init_logging();
    let context = load_context();
    let params = GeneticParameters {
        mutation_rate: 0.0,
        crossover_rate: 0.0,
        convergence_threshold: 0.0,
        ..scenario_params()
    };

    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let initial: Vec<Genes> = initialize_population(&context, params.population_size, &mut IdSequence::default(), &mut rng)
        .into_iter()
        .map(|c| c.into_genes())
        .collect();

    let result = optimize(&context, &default_objective_weights(), params).unwrap();
    for chromosome in &result.final_population {
        assert!(initial.contains(chromosome.genes()));
    }
}

#[test]
fn test_fitness_bounds_and_compliance_floor() {
    init_logging();
    let context = load_context();
    let result = optimize(&context, &default_objective_weights(), scenario_params()).unwrap();

    for chromosome in &result.final_population {
        assert!((0.0..=1.0).contains(&chromosome.fitness()));
        if chromosome.constraint_violations().is_empty() {
            assert!(chromosome.objective_scores().compliance >= COMPLIANT_SCORE_FLOOR);
        }
    }
}

#[test]
fn test_zero_time_budget_returns_initial_best() {
    init_logging();
    let context = load_context();
    let params = GeneticParameters {
        time_budget_secs: Some(0.0),
        ..scenario_params()
    };
    let result = optimize(&context, &default_objective_weights(), params).unwrap();

    assert!(result.partial);
    assert_eq!(result.termination, TerminationReason::TimeBudgetExceeded);
    assert_eq!(result.generation_reached, 0);
    assert_eq!(result.history.len(), 1);
    assert!(result.best.is_evaluated());
    assert_eq!(result.best.generation(), 0);
}

#[test]
fn test_zero_employees_is_degenerate() {
    init_logging();
    let mut context = load_context();
    context.employees.clear();

    let result = optimize(&context, &default_objective_weights(), scenario_params()).unwrap();
    assert!(result.degenerate);
    assert_eq!(result.best_fitness(), 0.0);
    assert!(matches!(result.termination, TerminationReason::ContextUnavailable(_)));
}

#[test]
fn test_structural_misconfiguration_is_an_error() {
    let context = load_context();
    let params = GeneticParameters { generations: 0, ..scenario_params() };
    assert!(matches!(
        optimize(&context, &default_objective_weights(), params),
        Err(OptimizerError::InvalidParameters(_))
    ));
}

#[test]
fn test_sink_receives_result() {
    init_logging();
    let context = load_context();
    let mut sink = MemorySink::default();
    let result = optimize_and_record(&context, &default_objective_weights(), scenario_params(), &mut sink).unwrap();

    assert_eq!(sink.results.len(), 1);
    assert_eq!(sink.results[0].best_fitness(), result.best_fitness());
}
