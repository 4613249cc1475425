//! Chromosome representation of a candidate schedule.
//!
//! A [`Chromosome`] owns its [`Genes`] by value. Scores are derived data:
//! every mutable access to the genes drops the scores, and the evolution
//! controller re-evaluates before the chromosome is ranked again.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Skills an employee works under in this schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillAllocation {
    pub primary: String,
    pub secondary: Option<String>,
}

/// A planned break inside one of the employee's shifts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakInterval {
    pub shift_id: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Schedule genes. Ordered maps keep iteration (and therefore runs) reproducible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Genes {
    /// Shift id -> employees working it
    pub shift_assignments: BTreeMap<String, BTreeSet<String>>,
    /// Employee id -> allocated skills
    pub skill_allocations: BTreeMap<String, SkillAllocation>,
    /// Employee id -> overtime hours
    pub overtime_hours: BTreeMap<String, f64>,
    /// Employee id -> breaks
    pub break_schedule: BTreeMap<String, Vec<BreakInterval>>,
}

impl Genes {
    pub fn is_empty(&self) -> bool {
        self.shift_assignments.is_empty() && self.skill_allocations.is_empty()
    }

    /// Number of (shift, employee) slots filled
    pub fn filled_slots(&self) -> usize {
        self.shift_assignments.values().map(|s| s.len()).sum()
    }

    /// Distinct employees holding at least one shift
    pub fn employees_used(&self) -> BTreeSet<&str> {
        self.shift_assignments
            .values()
            .flat_map(|s| s.iter().map(|e| e.as_str()))
            .collect()
    }

    /// Shift ids assigned to `employee_id`, in shift-id order
    pub fn shifts_of(&self, employee_id: &str) -> Vec<&str> {
        self.shift_assignments
            .iter()
            .filter(|(_, staff)| staff.contains(employee_id))
            .map(|(shift_id, _)| shift_id.as_str())
            .collect()
    }

    pub fn overtime(&self, employee_id: &str) -> f64 {
        self.overtime_hours.get(employee_id).copied().unwrap_or(0.0)
    }

    /// Number of gene entries that differ between two schedules
    pub fn distance(&self, other: &Genes) -> usize {
        let shifts: BTreeSet<&String> = self
            .shift_assignments
            .keys()
            .chain(other.shift_assignments.keys())
            .collect();
        let assignment_diff: usize = shifts
            .into_iter()
            .map(|id| match (self.shift_assignments.get(id), other.shift_assignments.get(id)) {
                (Some(a), Some(b)) => a.symmetric_difference(b).count(),
                (Some(a), None) | (None, Some(a)) => a.len(),
                (None, None) => 0,
            })
            .sum();
        let skill_diff = self
            .skill_allocations
            .iter()
            .filter(|(id, alloc)| other.skill_allocations.get(*id) != Some(*alloc))
            .count();
        let overtime_diff = self
            .overtime_hours
            .iter()
            .filter(|(id, hours)| (other.overtime(id) - **hours).abs() > 1e-9)
            .count();

        assignment_diff + skill_diff + overtime_diff
    }
}

/// The five scored objectives
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveKind {
    Cost,
    Coverage,
    Satisfaction,
    Stability,
    Compliance,
}

impl ObjectiveKind {
    pub const ALL: [ObjectiveKind; 5] = [
        ObjectiveKind::Cost,
        ObjectiveKind::Coverage,
        ObjectiveKind::Satisfaction,
        ObjectiveKind::Stability,
        ObjectiveKind::Compliance,
    ];
}

/// Per-objective scores, each in [0,1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveScores {
    pub cost: f64,
    pub coverage: f64,
    pub satisfaction: f64,
    pub stability: f64,
    pub compliance: f64,
}

impl ObjectiveScores {
    pub fn get(&self, kind: ObjectiveKind) -> f64 {
        match kind {
            ObjectiveKind::Cost => self.cost,
            ObjectiveKind::Coverage => self.coverage,
            ObjectiveKind::Satisfaction => self.satisfaction,
            ObjectiveKind::Stability => self.stability,
            ObjectiveKind::Compliance => self.compliance,
        }
    }
}

/// Hard constraint categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Weekly hours above 120% of the limit
    WeeklyHoursExceeded,
    /// Daily overtime above 150% of the limit
    DailyOvertimeExceeded,
    /// More than 7 shift slots in the planning window
    ExcessiveShiftAssignments,
}

/// One hard constraint violation; `magnitude` is the excess over the threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub employee_id: String,
    pub kind: ViolationKind,
    pub magnitude: f64,
}

/// Scores produced by the fitness evaluator for one set of genes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub fitness: f64,
    pub objective_scores: ObjectiveScores,
    pub violations: Vec<Violation>,
}

/// Hands out chromosome ids in creation order
#[derive(Debug, Default)]
pub struct IdSequence {
    next: u64,
}

impl IdSequence {
    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// A candidate schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chromosome {
    id: u64,
    generation: usize,
    genes: Genes,
    fitness: f64,
    objective_scores: ObjectiveScores,
    constraint_violations: Vec<Violation>,
    evaluated: bool,
    evaluation_failed: bool,
}

impl Chromosome {
    /// Create an unscored chromosome
    pub fn new(id: u64, genes: Genes, generation: usize) -> Self {
        Chromosome {
            id,
            generation,
            genes,
            fitness: 0.0,
            objective_scores: ObjectiveScores::default(),
            constraint_violations: Vec::new(),
            evaluated: false,
            evaluation_failed: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn genes(&self) -> &Genes {
        &self.genes
    }

    /// Mutable access to the genes; drops the current scores
    pub fn genes_mut(&mut self) -> &mut Genes {
        self.invalidate();
        &mut self.genes
    }

    pub fn into_genes(self) -> Genes {
        self.genes
    }

    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    pub fn objective_scores(&self) -> &ObjectiveScores {
        &self.objective_scores
    }

    pub fn constraint_violations(&self) -> &[Violation] {
        &self.constraint_violations
    }

    pub fn is_evaluated(&self) -> bool {
        self.evaluated
    }

    /// Scored as zero after its evaluation failed
    pub fn evaluation_failed(&self) -> bool {
        self.evaluation_failed
    }

    pub fn apply_evaluation(&mut self, evaluation: Evaluation) {
        self.fitness = evaluation.fitness;
        self.objective_scores = evaluation.objective_scores;
        self.constraint_violations = evaluation.violations;
        self.evaluated = true;
        self.evaluation_failed = false;
    }

    pub fn mark_evaluation_failed(&mut self) {
        self.fitness = 0.0;
        self.objective_scores = ObjectiveScores::default();
        self.constraint_violations.clear();
        self.evaluated = true;
        self.evaluation_failed = true;
    }

    fn invalidate(&mut self) {
        self.fitness = 0.0;
        self.objective_scores = ObjectiveScores::default();
        self.constraint_violations.clear();
        self.evaluated = false;
        self.evaluation_failed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genes_with(shift: &str, staff: &[&str]) -> Genes {
        let mut genes = Genes::default();
        genes.shift_assignments.insert(
            shift.to_string(),
            staff.iter().map(|s| s.to_string()).collect(),
        );
        genes
    }

    #[test]
    fn test_genes_mut_invalidates_scores() {
        let mut chromosome = Chromosome::new(7, genes_with("s1", &["e1", "e2"]), 0);
        chromosome.apply_evaluation(Evaluation {
            fitness: 0.6,
            objective_scores: ObjectiveScores { cost: 0.5, ..Default::default() },
            violations: vec![Violation {
                employee_id: "e1".to_string(),
                kind: ViolationKind::WeeklyHoursExceeded,
                magnitude: 2.0,
            }],
        });
        assert!(chromosome.is_evaluated());
        assert_eq!(chromosome.constraint_violations().len(), 1);

        chromosome.genes_mut().overtime_hours.insert("e1".to_string(), 1.0);
        assert!(!chromosome.is_evaluated());
        assert_eq!(chromosome.fitness(), 0.0);
        assert!(chromosome.constraint_violations().is_empty());
    }

    #[test]
    fn test_gene_queries() {
        let mut genes = genes_with("s1", &["e1", "e2"]);
        genes.shift_assignments.insert("s2".to_string(), ["e2".to_string()].into_iter().collect());
        assert_eq!(genes.filled_slots(), 3);
        assert_eq!(genes.employees_used().len(), 2);
        assert_eq!(genes.shifts_of("e2"), vec!["s1", "s2"]);
        assert_eq!(genes.overtime("e2"), 0.0);
    }

    #[test]
    fn test_distance() {
        let a = genes_with("s1", &["e1", "e2"]);
        let b = genes_with("s1", &["e1", "e3"]);
        assert_eq!(a.distance(&a), 0);
        assert_eq!(a.distance(&b), 2);
    }
}
