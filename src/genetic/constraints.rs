//! Hard constraint checking.
//!
//! Violations found here are reported on the chromosome and also feed the
//! flat fitness penalty applied by the evaluator.

use crate::chromosome::{Chromosome, Genes, Violation, ViolationKind};
use crate::context::OptimizationContext;
use crate::error::{OptimizerError, Result};
use std::collections::BTreeMap;

/// Weekly hours may exceed the limit by 20% before it is a hard violation
pub const WEEKLY_HOURS_HARD_FACTOR: f64 = 1.2;
/// Daily overtime may exceed the limit by 50% before it is a hard violation
pub const DAILY_OVERTIME_HARD_FACTOR: f64 = 1.5;
/// Most shift slots one employee may hold in the planning window
pub const MAX_SHIFT_SLOTS: usize = 7;

/// Hours and slots one employee carries under a schedule
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Workload {
    pub regular_hours: f64,
    pub overtime_hours: f64,
    pub slots: usize,
}

impl Workload {
    pub fn total_hours(&self) -> f64 {
        self.regular_hours + self.overtime_hours
    }
}

/// Workload of every rostered employee, keyed by employee id
///
/// Fails when the genes reference a shift or employee the context does not know.
pub fn compute_workloads(genes: &Genes, context: &OptimizationContext) -> Result<BTreeMap<String, Workload>> {
    let mut workloads: BTreeMap<String, Workload> = context
        .employees
        .iter()
        .map(|e| (e.id.clone(), Workload::default()))
        .collect();

    for (shift_id, staff) in &genes.shift_assignments {
        let shift = context
            .shift(shift_id)
            .ok_or_else(|| unknown("shift", shift_id))?;
        let hours = shift.duration_hours();
        for employee_id in staff {
            let load = workloads
                .get_mut(employee_id)
                .ok_or_else(|| unknown("employee", employee_id))?;
            load.regular_hours += hours;
            load.slots += 1;
        }
    }

    for (employee_id, &hours) in &genes.overtime_hours {
        if !hours.is_finite() || hours < 0.0 {
            return Err(OptimizerError::EvaluationFailure {
                chromosome: 0,
                reason: format!("invalid overtime {} for employee {}", hours, employee_id),
            });
        }
        let load = workloads
            .get_mut(employee_id)
            .ok_or_else(|| unknown("employee", employee_id))?;
        load.overtime_hours += hours;
    }

    Ok(workloads)
}

fn unknown(what: &str, id: &str) -> OptimizerError {
    OptimizerError::EvaluationFailure {
        chromosome: 0,
        reason: format!("unknown {} {}", what, id),
    }
}

/// Enumerate hard violations for a set of genes
pub fn check_genes(genes: &Genes, context: &OptimizationContext) -> Result<Vec<Violation>> {
    let workloads = compute_workloads(genes, context)?;
    Ok(violations_from_workloads(&workloads, context))
}

/// Enumerate hard violations for a chromosome
pub fn check(chromosome: &Chromosome, context: &OptimizationContext) -> Result<Vec<Violation>> {
    check_genes(chromosome.genes(), context).map_err(|e| match e {
        OptimizerError::EvaluationFailure { reason, .. } => OptimizerError::EvaluationFailure {
            chromosome: chromosome.id(),
            reason,
        },
        other => other,
    })
}

pub(crate) fn violations_from_workloads(
    workloads: &BTreeMap<String, Workload>,
    context: &OptimizationContext,
) -> Vec<Violation> {
    let limits = &context.limits;
    let mut violations = Vec::new();

    for employee in &context.employees {
        let Some(load) = workloads.get(&employee.id) else {
            continue;
        };

        let hours_cap = limits.weekly_hours_limit(employee) * WEEKLY_HOURS_HARD_FACTOR;
        if load.total_hours() > hours_cap {
            violations.push(Violation {
                employee_id: employee.id.clone(),
                kind: ViolationKind::WeeklyHoursExceeded,
                magnitude: load.total_hours() - hours_cap,
            });
        }

        let overtime_cap = limits.max_daily_overtime * DAILY_OVERTIME_HARD_FACTOR;
        if load.overtime_hours > overtime_cap {
            violations.push(Violation {
                employee_id: employee.id.clone(),
                kind: ViolationKind::DailyOvertimeExceeded,
                magnitude: load.overtime_hours - overtime_cap,
            });
        }

        if load.slots > MAX_SHIFT_SLOTS {
            violations.push(Violation {
                employee_id: employee.id.clone(),
                kind: ViolationKind::ExcessiveShiftAssignments,
                magnitude: (load.slots - MAX_SHIFT_SLOTS) as f64,
            });
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::fixtures::*;
    use crate::context::Role;
    use crate::context::ShiftPreference;

    fn assign(genes: &mut Genes, shift: &str, staff: &[&str]) {
        genes.shift_assignments.insert(
            shift.to_string(),
            staff.iter().map(|s| s.to_string()).collect(),
        );
    }

    #[test]
    fn test_clean_schedule_has_no_violations() {
        let ctx = sample_context();
        let mut genes = Genes::default();
        assign(&mut genes, "s1", &["e1", "e4"]);
        assign(&mut genes, "s2", &["e2", "e3", "e5"]);
        assign(&mut genes, "s3", &["e5"]);

        let workloads = compute_workloads(&genes, &ctx).unwrap();
        assert_eq!(workloads["e5"].regular_hours, 12.0);
        assert_eq!(workloads["e5"].slots, 2);
        assert!(check_genes(&genes, &ctx).unwrap().is_empty());
    }

    #[test]
    fn test_overtime_violation_magnitude() {
        let ctx = sample_context();
        let mut genes = Genes::default();
        assign(&mut genes, "s1", &["e1"]);
        genes.overtime_hours.insert("e1".to_string(), 4.0);

        let violations = check_genes(&genes, &ctx).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::DailyOvertimeExceeded);
        assert!((violations[0].magnitude - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_slot_and_hours_violations() {
        let mut ctx = sample_context();
        ctx.employees.push(employee("e6", Role::Agent, &["voice"], 20.0, ShiftPreference::Night));
        let mut shifts = Vec::new();
        for day in 1..=9 {
            shifts.push(shift(&format!("d{}", day), day, 8, 16, 1, &[]));
        }
        ctx.shifts = shifts;

        let mut genes = Genes::default();
        for day in 1..=9 {
            assign(&mut genes, &format!("d{}", day), &["e6"]);
        }

        let violations = check_genes(&genes, &ctx).unwrap();
        let kinds: Vec<ViolationKind> = violations.iter().map(|v| v.kind).collect();
        assert!(kinds.contains(&ViolationKind::ExcessiveShiftAssignments));
        // 72h against a 48h hard cap
        assert!(kinds.contains(&ViolationKind::WeeklyHoursExceeded));
        let slots = violations
            .iter()
            .find(|v| v.kind == ViolationKind::ExcessiveShiftAssignments)
            .unwrap();
        assert_eq!(slots.magnitude, 2.0);
    }

    #[test]
    fn test_unknown_ids_fail() {
        let ctx = sample_context();
        let mut genes = Genes::default();
        assign(&mut genes, "missing", &["e1"]);
        assert!(check_genes(&genes, &ctx).is_err());

        let mut genes = Genes::default();
        assign(&mut genes, "s1", &["ghost"]);
        let chromosome = Chromosome::new(9, genes, 0);
        match check(&chromosome, &ctx) {
            Err(OptimizerError::EvaluationFailure { chromosome, .. }) => assert_eq!(chromosome, 9),
            other => panic!("unexpected {:?}", other),
        }
    }
}
