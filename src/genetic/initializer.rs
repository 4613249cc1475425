//! Random initial population.
//!
//! Every shift receives its required number of agents, sampled without
//! replacement from eligible employees first. Feasibility is left to the
//! fitness evaluator.

use crate::chromosome::{BreakInterval, Chromosome, Genes, IdSequence, SkillAllocation};
use crate::context::{Employee, OptimizationContext, ShiftRequirement};
use chrono::Duration;
use rand::prelude::*;

/// Shifts at least this long get a break
pub const BREAK_MIN_SHIFT_HOURS: f64 = 6.0;
pub const BREAK_MINUTES: i64 = 30;

/// Build the generation-0 population
///
/// An empty roster or requirement list yields a single chromosome with empty genes.
pub fn initialize_population<R: Rng>(
    context: &OptimizationContext,
    population_size: usize,
    ids: &mut IdSequence,
    rng: &mut R,
) -> Vec<Chromosome> {
    if context.employees.is_empty() || context.shifts.is_empty() {
        return vec![Chromosome::new(ids.next_id(), Genes::default(), 0)];
    }

    (0..population_size)
        .map(|_| Chromosome::new(ids.next_id(), random_genes(context, rng), 0))
        .collect()
}

/// One random, context-consistent schedule
pub fn random_genes<R: Rng>(context: &OptimizationContext, rng: &mut R) -> Genes {
    let mut genes = Genes::default();

    for employee in &context.employees {
        genes.skill_allocations.insert(
            employee.id.clone(),
            SkillAllocation {
                primary: employee.primary_skill.clone(),
                secondary: employee.default_secondary_skill(),
            },
        );
        genes.overtime_hours.insert(employee.id.clone(), 0.0);
    }

    for shift in &context.shifts {
        let staff = sample_staff(context, shift, rng);
        if let Some(interval) = plan_break(shift) {
            for employee_id in &staff {
                genes
                    .break_schedule
                    .entry(employee_id.clone())
                    .or_default()
                    .push(interval.clone());
            }
        }
        genes
            .shift_assignments
            .insert(shift.id.clone(), staff.into_iter().collect());
    }

    genes
}

/// Required agents for one shift: eligible employees first, topped up from the rest
fn sample_staff<R: Rng>(context: &OptimizationContext, shift: &ShiftRequirement, rng: &mut R) -> Vec<String> {
    let (eligible, others): (Vec<&Employee>, Vec<&Employee>) = context
        .employees
        .iter()
        .partition(|e| e.is_eligible_for(shift));

    let from_eligible = shift.required_agents.min(eligible.len());
    let mut staff: Vec<String> = eligible
        .choose_multiple(rng, from_eligible)
        .map(|e| e.id.clone())
        .collect();

    let missing = shift.required_agents - from_eligible;
    if missing > 0 {
        staff.extend(
            others
                .choose_multiple(rng, missing.min(others.len()))
                .map(|e| e.id.clone()),
        );
    }

    staff
}

/// A mid-shift break for long enough shifts
pub fn plan_break(shift: &ShiftRequirement) -> Option<BreakInterval> {
    if shift.duration_hours() < BREAK_MIN_SHIFT_HOURS {
        return None;
    }
    let midpoint = shift.start + (shift.end - shift.start) / 2;
    Some(BreakInterval {
        shift_id: shift.id.clone(),
        start: midpoint,
        end: midpoint + Duration::minutes(BREAK_MINUTES),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::fixtures::*;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_population_respects_required_agents() {
        let ctx = sample_context();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut ids = IdSequence::default();
        let population = initialize_population(&ctx, 15, &mut ids, &mut rng);

        assert_eq!(population.len(), 15);
        for chromosome in &population {
            for shift in &ctx.shifts {
                assert_eq!(chromosome.genes().shift_assignments[&shift.id].len(), shift.required_agents);
            }
            assert_eq!(chromosome.genes().skill_allocations["e2"].primary, "voice");
            assert!(!chromosome.is_evaluated());
        }
        let ids: Vec<u64> = population.iter().map(|c| c.id()).collect();
        assert_eq!(ids, (0..15).collect::<Vec<u64>>());
    }

    #[test]
    fn test_eligible_employees_first() {
        let ctx = sample_context();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..20 {
            let genes = random_genes(&ctx, &mut rng);
            // e2 and e5 are the only email speakers
            for id in &genes.shift_assignments["s3"] {
                assert!(id == "e2" || id == "e5");
            }
        }
    }

    #[test]
    fn test_top_up_when_too_few_eligible() {
        let mut ctx = sample_context();
        ctx.shifts[2].required_agents = 4;
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let genes = random_genes(&ctx, &mut rng);
        assert_eq!(genes.shift_assignments["s3"].len(), 4);

        ctx.shifts[2].required_agents = 9;
        let genes = random_genes(&ctx, &mut rng);
        assert_eq!(genes.shift_assignments["s3"].len(), 5);
    }

    #[test]
    fn test_breaks_for_long_shifts_only() {
        let ctx = sample_context();
        let brk = plan_break(&ctx.shifts[0]).unwrap();
        assert_eq!(brk.start, at(4, 12));
        assert_eq!((brk.end - brk.start).num_minutes(), 30);
        assert!(plan_break(&ctx.shifts[2]).is_none());
    }

    #[test]
    fn test_degenerate_context() {
        let mut ctx = sample_context();
        ctx.employees.clear();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let population = initialize_population(&ctx, 10, &mut IdSequence::default(), &mut rng);
        assert_eq!(population.len(), 1);
        assert!(population[0].genes().is_empty());
    }
}
