//! Multi-objective fitness evaluation.
//!
//! Each objective is normalized to [0,1] (higher is better). The weighted sum
//! is reduced by a flat penalty per hard violation and clamped to [0,1].

use crate::chromosome::{Chromosome, Evaluation, Genes, ObjectiveKind, ObjectiveScores};
use crate::context::{Employee, OptimizationContext};
use crate::error::{OptimizerError, Result};
use crate::genetic::constraints::{compute_workloads, violations_from_workloads, Workload};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::{BTreeMap, BTreeSet};

/// Fitness lost per hard violation
pub const VIOLATION_PENALTY: f64 = 0.1;
/// Lowest compliance score a violation-free schedule can reach
pub const COMPLIANT_SCORE_FLOOR: f64 = 0.5;

/// Objective weights keyed by objective
pub type ObjectiveWeights = BTreeMap<ObjectiveKind, f64>;

pub fn default_objective_weights() -> ObjectiveWeights {
    [
        (ObjectiveKind::Cost, 0.25),
        (ObjectiveKind::Coverage, 0.30),
        (ObjectiveKind::Satisfaction, 0.20),
        (ObjectiveKind::Stability, 0.10),
        (ObjectiveKind::Compliance, 0.15),
    ]
    .into_iter()
    .collect()
}

/// Constants used by the objective functions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorSettings {
    /// Cost per hour scoring 1.0
    pub cost_band_low: f64,
    /// Cost per hour scoring 0.0
    pub cost_band_high: f64,
    /// Contacts one agent absorbs per demand interval
    pub contacts_per_agent: f64,
    /// Overtime standard deviation at which stability credit reaches zero
    pub expected_max_overtime_deviation: f64,
    /// Baseline schedule-consistency credit in the satisfaction score
    pub consistency_credit: f64,
    /// Fixed rest-period credit in the compliance score
    pub rest_period_credit: f64,
}

impl Default for EvaluatorSettings {
    fn default() -> Self {
        EvaluatorSettings {
            cost_band_low: 15.0,
            cost_band_high: 35.0,
            contacts_per_agent: 10.0,
            expected_max_overtime_deviation: 2.0,
            consistency_credit: 0.8,
            rest_period_credit: 1.0,
        }
    }
}

/// Scores chromosomes against one context. Shared read-only by every worker.
#[derive(Debug, Clone)]
pub struct FitnessEvaluator<'a> {
    context: &'a OptimizationContext,
    weights: [(ObjectiveKind, f64); 5],
    settings: EvaluatorSettings,
}

impl<'a> FitnessEvaluator<'a> {
    pub fn new(context: &'a OptimizationContext, weights: &ObjectiveWeights) -> Self {
        Self::with_settings(context, weights, EvaluatorSettings::default())
    }

    pub fn with_settings(
        context: &'a OptimizationContext,
        weights: &ObjectiveWeights,
        settings: EvaluatorSettings,
    ) -> Self {
        FitnessEvaluator {
            context,
            weights: normalize_weights(weights),
            settings,
        }
    }

    pub fn context(&self) -> &OptimizationContext {
        self.context
    }

    /// Score a chromosome
    pub fn evaluate(&self, chromosome: &Chromosome) -> Result<Evaluation> {
        self.evaluate_genes(chromosome.genes()).map_err(|e| match e {
            OptimizerError::EvaluationFailure { reason, .. } => OptimizerError::EvaluationFailure {
                chromosome: chromosome.id(),
                reason,
            },
            other => other,
        })
    }

    /// Score a set of genes
    pub fn evaluate_genes(&self, genes: &Genes) -> Result<Evaluation> {
        let workloads = compute_workloads(genes, self.context)?;
        let violations = violations_from_workloads(&workloads, self.context);

        let objective_scores = ObjectiveScores {
            cost: self.cost_efficiency(&workloads),
            coverage: self.coverage_quality(genes),
            satisfaction: self.employee_satisfaction(genes, &workloads),
            stability: self.schedule_stability(genes),
            compliance: self.compliance_adherence(&workloads),
        };

        let weighted: f64 = self
            .weights
            .iter()
            .map(|&(kind, w)| w * objective_scores.get(kind))
            .sum();
        let fitness = (weighted - VIOLATION_PENALTY * violations.len() as f64).clamp(0.0, 1.0);

        if !fitness.is_finite() {
            return Err(OptimizerError::EvaluationFailure {
                chromosome: 0,
                reason: "fitness is not a finite number".to_string(),
            });
        }

        Ok(Evaluation {
            fitness,
            objective_scores,
            violations,
        })
    }

    /// Labor cost per hour mapped onto the reference band
    fn cost_efficiency(&self, workloads: &BTreeMap<String, Workload>) -> f64 {
        let mut cost = 0.0;
        let mut hours = 0.0;
        for employee in &self.context.employees {
            if let Some(load) = workloads.get(&employee.id) {
                cost += load.regular_hours * employee.hourly_rate
                    + load.overtime_hours * employee.overtime_rate;
                hours += load.total_hours();
            }
        }
        if hours <= 0.0 {
            return 0.0;
        }

        let band = self.settings.cost_band_high - self.settings.cost_band_low;
        if band <= 0.0 {
            return 0.0;
        }
        let cost_per_hour = cost / hours;
        ((self.settings.cost_band_high - cost_per_hour) / band).clamp(0.0, 1.0)
    }

    /// Staffing of each demand interval by on-duty, correctly skilled agents
    fn coverage_quality(&self, genes: &Genes) -> f64 {
        if self.context.demand.is_empty() {
            return self.staffing_quality(genes);
        }

        let mut total = 0.0;
        for interval in &self.context.demand {
            let required = interval.required_agents(self.settings.contacts_per_agent);
            if required == 0 {
                total += 1.0;
                continue;
            }

            let on_duty: BTreeSet<&str> = self
                .context
                .shifts
                .iter()
                .filter(|s| s.covers(&interval.start, &interval.end))
                .filter_map(|s| genes.shift_assignments.get(&s.id))
                .flat_map(|staff| staff.iter().map(|e| e.as_str()))
                .collect();
            let skilled = on_duty
                .iter()
                .filter(|id| {
                    self.context
                        .employee(id)
                        .map(|e| interval.requires_skill(allocated_primary(genes, e)))
                        .unwrap_or(false)
                })
                .count();

            let coverage_ratio = (on_duty.len() as f64 / required as f64).min(1.0);
            let skill_ratio = (skilled as f64 / required as f64).min(1.0);
            total += 0.7 * coverage_ratio + 0.3 * skill_ratio;
        }

        total / self.context.demand.len() as f64
    }

    /// Coverage without a demand forecast: filled slots against shift requirements
    fn staffing_quality(&self, genes: &Genes) -> f64 {
        if self.context.shifts.is_empty() {
            return 0.0;
        }

        let mut total = 0.0;
        for shift in &self.context.shifts {
            if shift.required_agents == 0 {
                total += 1.0;
                continue;
            }
            let staff = genes.shift_assignments.get(&shift.id);
            let assigned = staff.map(|s| s.len()).unwrap_or(0);
            let matched = staff
                .map(|s| {
                    s.iter()
                        .filter(|id| {
                            self.context
                                .employee(id)
                                .map(|e| {
                                    let skill = allocated_primary(genes, e);
                                    shift.required_skills.is_empty()
                                        || shift.required_skills.iter().any(|r| r == skill)
                                })
                                .unwrap_or(false)
                        })
                        .count()
                })
                .unwrap_or(0);

            let required = shift.required_agents as f64;
            total += 0.7 * (assigned as f64 / required).min(1.0)
                + 0.3 * (matched as f64 / required).min(1.0);
        }

        total / self.context.shifts.len() as f64
    }

    /// Preference, skill use, overtime load and consistency per working employee
    fn employee_satisfaction(&self, genes: &Genes, workloads: &BTreeMap<String, Workload>) -> f64 {
        let mut scores = Vec::new();

        for employee in &self.context.employees {
            let shifts: Vec<_> = genes
                .shifts_of(&employee.id)
                .into_iter()
                .filter_map(|id| self.context.shift(id))
                .collect();
            if shifts.is_empty() {
                continue;
            }

            let preference = shifts
                .iter()
                .map(|s| employee.shift_preference.match_score(&s.start))
                .sum::<f64>()
                / shifts.len() as f64;
            let skill_use = skill_utilization(genes, employee);
            let overtime = workloads
                .get(&employee.id)
                .map(|l| l.overtime_hours)
                .unwrap_or(0.0);
            let overtime_score = if overtime <= 2.0 {
                1.0
            } else if overtime <= 4.0 {
                0.7
            } else {
                0.3
            };

            scores.push((preference + skill_use + overtime_score + self.settings.consistency_credit) / 4.0);
        }

        if scores.is_empty() {
            0.0
        } else {
            scores.iter().mean()
        }
    }

    /// Low duplication, even overtime and in-skill allocation
    fn schedule_stability(&self, genes: &Genes) -> f64 {
        if self.context.employees.is_empty() {
            return 0.0;
        }

        let filled = genes.filled_slots();
        let uniqueness = if filled == 0 {
            0.0
        } else {
            genes.employees_used().len() as f64 / filled as f64
        };

        let overtimes: Vec<f64> = self
            .context
            .employees
            .iter()
            .map(|e| genes.overtime(&e.id))
            .collect();
        let deviation = if overtimes.len() < 2 {
            0.0
        } else {
            overtimes.iter().population_std_dev()
        };
        let evenness = if self.settings.expected_max_overtime_deviation > 0.0 {
            1.0 - (deviation / self.settings.expected_max_overtime_deviation).min(1.0)
        } else {
            1.0
        };

        let in_skill = self
            .context
            .employees
            .iter()
            .filter(|e| e.has_skill(allocated_primary(genes, e)))
            .count() as f64
            / self.context.employees.len() as f64;

        0.4 * uniqueness + 0.3 * evenness + 0.3 * in_skill
    }

    /// Soft regulatory adherence, averaged across the roster
    fn compliance_adherence(&self, workloads: &BTreeMap<String, Workload>) -> f64 {
        let limits = &self.context.limits;
        let mut scores = Vec::new();

        for employee in &self.context.employees {
            let load = workloads.get(&employee.id).copied().unwrap_or_default();
            let limit = limits.weekly_hours_limit(employee);

            let hours_credit = if load.total_hours() <= limit {
                1.0
            } else if load.total_hours() <= limit * 1.1 {
                0.7
            } else {
                0.3
            };
            let overtime_credit = if load.overtime_hours <= limits.max_daily_overtime {
                1.0
            } else if limits.max_daily_overtime > 0.0 {
                limits.max_daily_overtime / load.overtime_hours
            } else {
                0.0
            };

            scores.push((hours_credit + overtime_credit) / 2.0);
        }

        if scores.is_empty() {
            return 0.0;
        }
        0.8 * scores.iter().mean() + 0.2 * self.settings.rest_period_credit
    }
}

/// Score a chromosome with default evaluator settings
pub fn evaluate(
    chromosome: &Chromosome,
    context: &OptimizationContext,
    weights: &ObjectiveWeights,
) -> Result<Evaluation> {
    FitnessEvaluator::new(context, weights).evaluate(chromosome)
}

/// Weights in objective order, clamped non-negative and summing to one
fn normalize_weights(weights: &ObjectiveWeights) -> [(ObjectiveKind, f64); 5] {
    let raw = |w: &ObjectiveWeights, kind: ObjectiveKind| {
        w.get(&kind)
            .copied()
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(0.0)
    };
    let total: f64 = ObjectiveKind::ALL.iter().map(|&k| raw(weights, k)).sum();
    let defaults = default_objective_weights();
    let (source, total) = if total > 0.0 {
        (weights, total)
    } else {
        (&defaults, 1.0)
    };

    ObjectiveKind::ALL.map(|kind| (kind, raw(source, kind) / total))
}

/// Allocated primary skill, falling back to the declared one
fn allocated_primary<'g>(genes: &'g Genes, employee: &'g Employee) -> &'g str {
    genes
        .skill_allocations
        .get(&employee.id)
        .map(|a| a.primary.as_str())
        .unwrap_or(employee.primary_skill.as_str())
}

/// Share of the employee's skills put to use by the allocation, in [0,1]
fn skill_utilization(genes: &Genes, employee: &Employee) -> f64 {
    let capacity = employee.skills.len().min(2);
    if capacity == 0 {
        return 0.5;
    }

    let primary = allocated_primary(genes, employee);
    let mut used = usize::from(employee.has_skill(primary));
    if let Some(secondary) = genes
        .skill_allocations
        .get(&employee.id)
        .and_then(|a| a.secondary.as_deref())
    {
        if secondary != primary && employee.has_skill(secondary) {
            used += 1;
        }
    }

    (used as f64 / capacity as f64).min(1.0)
}
