//! Crossover and mutation.
//!
//! Both operators are pure functions of their input genes and the RNG passed
//! in, so a seeded run replays exactly.

use crate::chromosome::{Chromosome, Genes, SkillAllocation};
use crate::context::{OptimizationContext, Role};
use rand::prelude::*;
use std::collections::BTreeSet;

/// Chance of swapping one agent on one shift
pub const REASSIGN_PROB: f64 = 0.3;
/// Chance of re-allocating one employee's primary skill
pub const SKILL_SWAP_PROB: f64 = 0.2;
/// Chance of raising one employee's overtime
pub const OVERTIME_PROB: f64 = 0.1;

/// Overtime step and ceiling for a role
pub fn overtime_step(role: Role) -> (f64, f64) {
    match role {
        Role::TeamLead => (0.5, 4.0),
        Role::Senior => (0.3, 3.0),
        Role::Agent => (0.2, 2.0),
    }
}

/// Single-point crossover of two parents
pub fn crossover<R: Rng>(
    parent_a: &Chromosome,
    parent_b: &Chromosome,
    context: &OptimizationContext,
    rng: &mut R,
) -> (Genes, Genes) {
    crossover_genes(parent_a.genes(), parent_b.genes(), context, rng)
}

/// Exchange shift assignments from a cut point onward, mix skill allocations uniformly
///
/// The cut runs along the context's shift order; ids the context does not list
/// follow it in id order. Overtime and breaks stay with the parent that
/// supplies the child's leading shifts.
pub fn crossover_genes<R: Rng>(
    parent_a: &Genes,
    parent_b: &Genes,
    context: &OptimizationContext,
    rng: &mut R,
) -> (Genes, Genes) {
    let mut child_a = parent_a.clone();
    let mut child_b = parent_b.clone();

    let shift_ids = cut_sequence(parent_a, parent_b, context);
    if shift_ids.len() >= 2 {
        let cut = rng.gen_range(1..shift_ids.len());
        for shift_id in &shift_ids[cut..] {
            exchange(&mut child_a, parent_b, shift_id);
            exchange(&mut child_b, parent_a, shift_id);
        }
    }

    let employees: BTreeSet<&String> = parent_a
        .skill_allocations
        .keys()
        .chain(parent_b.skill_allocations.keys())
        .collect();
    for employee_id in employees {
        if !rng.gen_bool(0.5) {
            continue;
        }
        match (
            parent_a.skill_allocations.get(employee_id),
            parent_b.skill_allocations.get(employee_id),
        ) {
            (Some(a), Some(b)) => {
                child_a.skill_allocations.insert(employee_id.clone(), b.clone());
                child_b.skill_allocations.insert(employee_id.clone(), a.clone());
            }
            (None, Some(b)) => {
                child_a.skill_allocations.insert(employee_id.clone(), b.clone());
            }
            (Some(a), None) => {
                child_b.skill_allocations.insert(employee_id.clone(), a.clone());
            }
            (None, None) => {}
        }
    }

    (child_a, child_b)
}

/// Context shift order, then any other assigned shift ids
fn cut_sequence(parent_a: &Genes, parent_b: &Genes, context: &OptimizationContext) -> Vec<String> {
    let mut sequence = context.shift_order();
    let known: BTreeSet<String> = sequence.iter().cloned().collect();
    let extra: BTreeSet<&String> = parent_a
        .shift_assignments
        .keys()
        .chain(parent_b.shift_assignments.keys())
        .filter(|id| !known.contains(*id))
        .collect();
    sequence.extend(extra.into_iter().cloned());
    sequence
}

fn exchange(child: &mut Genes, donor: &Genes, shift_id: &str) {
    match donor.shift_assignments.get(shift_id) {
        Some(staff) => {
            child.shift_assignments.insert(shift_id.to_string(), staff.clone());
        }
        None => {
            child.shift_assignments.remove(shift_id);
        }
    }
}

/// Mutate a chromosome; its scores are dropped and must be recomputed
pub fn mutate<R: Rng>(mut chromosome: Chromosome, context: &OptimizationContext, rng: &mut R) -> Chromosome {
    mutate_genes(chromosome.genes_mut(), context, rng);
    chromosome
}

/// Apply the three independent perturbations; true when any gene changed
pub fn mutate_genes<R: Rng>(genes: &mut Genes, context: &OptimizationContext, rng: &mut R) -> bool {
    let mut changed = false;

    if rng.gen_bool(REASSIGN_PROB) {
        changed |= reassign_agent(genes, context, rng);
    }
    if rng.gen_bool(SKILL_SWAP_PROB) {
        changed |= swap_primary_skill(genes, context, rng);
    }
    if rng.gen_bool(OVERTIME_PROB) {
        changed |= raise_overtime(genes, context, rng);
    }

    changed
}

/// Replace one agent on one shift with an eligible employee free that day
fn reassign_agent<R: Rng>(genes: &mut Genes, context: &OptimizationContext, rng: &mut R) -> bool {
    let staffed: Vec<_> = context
        .shifts
        .iter()
        .filter(|s| genes.shift_assignments.get(&s.id).map_or(false, |staff| !staff.is_empty()))
        .collect();
    let Some(&shift) = staffed.choose(rng) else {
        return false;
    };

    let Some(staff) = genes.shift_assignments.get(&shift.id) else {
        return false;
    };
    let current: Vec<&String> = staff.iter().collect();
    let Some(&outgoing) = current.choose(rng) else {
        return false;
    };
    let outgoing = outgoing.clone();

    let busy: BTreeSet<&str> = context
        .shifts
        .iter()
        .filter(|s| s.day() == shift.day())
        .filter_map(|s| genes.shift_assignments.get(&s.id))
        .flat_map(|staff| staff.iter().map(|e| e.as_str()))
        .collect();
    let candidates: Vec<&str> = context
        .employees
        .iter()
        .filter(|e| e.is_eligible_for(shift) && !busy.contains(e.id.as_str()))
        .map(|e| e.id.as_str())
        .collect();
    let Some(&incoming) = candidates.choose(rng) else {
        return false;
    };
    let incoming = incoming.to_string();

    if let Some(staff) = genes.shift_assignments.get_mut(&shift.id) {
        staff.remove(&outgoing);
        staff.insert(incoming.clone());
    }

    let mut moved = Vec::new();
    if let Some(breaks) = genes.break_schedule.get_mut(&outgoing) {
        breaks.retain(|b| {
            if b.shift_id == shift.id {
                moved.push(b.clone());
                false
            } else {
                true
            }
        });
        if breaks.is_empty() {
            genes.break_schedule.remove(&outgoing);
        }
    }
    if !moved.is_empty() {
        genes.break_schedule.entry(incoming).or_default().extend(moved);
    }

    true
}

/// Switch one employee's primary skill to another skill they hold
fn swap_primary_skill<R: Rng>(genes: &mut Genes, context: &OptimizationContext, rng: &mut R) -> bool {
    let Some(employee) = context.employees.choose(rng) else {
        return false;
    };
    let current = genes
        .skill_allocations
        .get(&employee.id)
        .map(|a| a.primary.clone())
        .unwrap_or_else(|| employee.primary_skill.clone());

    let alternatives: Vec<&String> = employee.skills.iter().filter(|s| **s != current).collect();
    let Some(&next) = alternatives.choose(rng) else {
        return false;
    };

    let allocation = genes
        .skill_allocations
        .entry(employee.id.clone())
        .or_insert_with(|| SkillAllocation {
            primary: current.clone(),
            secondary: None,
        });
    allocation.primary = next.clone();
    allocation.secondary = Some(current).filter(|s| employee.has_skill(s));

    true
}

/// Add a role-dependent overtime step to one employee, up to the role ceiling
fn raise_overtime<R: Rng>(genes: &mut Genes, context: &OptimizationContext, rng: &mut R) -> bool {
    let Some(employee) = context.employees.choose(rng) else {
        return false;
    };
    let (step, ceiling) = overtime_step(employee.role);
    let current = genes.overtime(&employee.id);
    if current >= ceiling {
        return false;
    }

    genes
        .overtime_hours
        .insert(employee.id.clone(), (current + step).min(ceiling));
    true
}
