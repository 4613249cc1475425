//! Optimization context: the read-only inputs of a run.
//!
//! The roster, shift requirements, demand forecast and regulatory limits are
//! supplied by an external provider and shared by every worker during a run.

use crate::error::{OptimizerError, Result};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Seniority class of an employee, drives overtime mutation steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    TeamLead,
    Senior,
    Agent,
}

/// Preferred time of day for an employee's shifts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftPreference {
    Morning,
    Afternoon,
    Evening,
    Night,
    Flexible,
}

impl ShiftPreference {
    /// Band a shift falls into, from its start hour
    pub fn from_start_hour(hour: u32) -> Self {
        match hour {
            5..=11 => ShiftPreference::Morning,
            12..=16 => ShiftPreference::Afternoon,
            17..=21 => ShiftPreference::Evening,
            _ => ShiftPreference::Night,
        }
    }

    /// How well a shift starting at `start` suits this preference, in [0,1]
    pub fn match_score(&self, start: &NaiveDateTime) -> f64 {
        match self {
            ShiftPreference::Flexible => 0.8,
            pref if *pref == Self::from_start_hour(start.hour()) => 1.0,
            _ => 0.3,
        }
    }
}

/// An employee snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub department: String,
    pub role: Role,
    /// Every skill the employee can work
    pub skills: Vec<String>,
    /// Declared primary skill (normally also listed in `skills`)
    pub primary_skill: String,
    pub hourly_rate: f64,
    pub overtime_rate: f64,
    pub max_hours_per_week: f64,
    pub shift_preference: ShiftPreference,
}

impl Employee {
    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills.iter().any(|s| s == skill)
    }

    /// Eligible when the employee holds any required skill, or the shift lists none
    pub fn is_eligible_for(&self, shift: &ShiftRequirement) -> bool {
        shift.required_skills.is_empty()
            || shift.required_skills.iter().any(|s| self.has_skill(s))
    }

    /// First declared skill other than the primary one
    pub fn default_secondary_skill(&self) -> Option<String> {
        self.skills.iter().find(|s| **s != self.primary_skill).cloned()
    }
}

/// A shift pattern that needs staffing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftRequirement {
    pub id: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub required_agents: usize,
    pub required_skills: Vec<String>,
    pub target_service_level: f64,
    pub priority: u32,
}

impl ShiftRequirement {
    pub fn duration_hours(&self) -> f64 {
        (self.end - self.start).num_minutes() as f64 / 60.0
    }

    pub fn day(&self) -> NaiveDate {
        self.start.date()
    }

    /// Whether the shift spans the whole window `[start, end)`
    pub fn covers(&self, start: &NaiveDateTime, end: &NaiveDateTime) -> bool {
        self.start <= *start && self.end >= *end
    }
}

/// Forecast demand for one time window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub contact_volume: f64,
    pub required_service_level: f64,
    /// Skill name -> relative weight of that skill in the workload
    pub skill_requirements: BTreeMap<String, f64>,
    pub business_priority: u32,
}

impl DemandInterval {
    /// Agents needed to absorb the volume, `ceil(volume / contacts_per_agent)`
    pub fn required_agents(&self, contacts_per_agent: f64) -> usize {
        if contacts_per_agent <= 0.0 || self.contact_volume <= 0.0 {
            return 0;
        }
        (self.contact_volume / contacts_per_agent).ceil() as usize
    }

    pub fn requires_skill(&self, skill: &str) -> bool {
        self.skill_requirements.is_empty() || self.skill_requirements.contains_key(skill)
    }
}

/// Labor law / policy limits for one jurisdiction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegulatoryLimits {
    pub max_hours_per_week: f64,
    pub min_rest_hours: f64,
    pub max_daily_overtime: f64,
    pub max_consecutive_days: u32,
    pub min_vacation_days: u32,
}

impl Default for RegulatoryLimits {
    fn default() -> Self {
        RegulatoryLimits {
            max_hours_per_week: 40.0,
            min_rest_hours: 11.0,
            max_daily_overtime: 2.0,
            max_consecutive_days: 6,
            min_vacation_days: 20,
        }
    }
}

impl RegulatoryLimits {
    /// Weekly hours ceiling applying to `employee`
    pub fn weekly_hours_limit(&self, employee: &Employee) -> f64 {
        if employee.max_hours_per_week > 0.0 {
            employee.max_hours_per_week.min(self.max_hours_per_week)
        } else {
            self.max_hours_per_week
        }
    }
}

/// Everything a run reads
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptimizationContext {
    pub employees: Vec<Employee>,
    pub shifts: Vec<ShiftRequirement>,
    #[serde(default)]
    pub demand: Vec<DemandInterval>,
    #[serde(default)]
    pub limits: RegulatoryLimits,
}

impl OptimizationContext {
    pub fn new(
        employees: Vec<Employee>,
        shifts: Vec<ShiftRequirement>,
        demand: Vec<DemandInterval>,
        limits: RegulatoryLimits,
    ) -> Self {
        OptimizationContext { employees, shifts, demand, limits }
    }

    /// Parse a context document
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| OptimizerError::ContextUnavailable(format!("cannot parse context: {}", e)))
    }

    pub fn employee(&self, id: &str) -> Option<&Employee> {
        self.employees.iter().find(|e| e.id == id)
    }

    pub fn shift(&self, id: &str) -> Option<&ShiftRequirement> {
        self.shifts.iter().find(|s| s.id == id)
    }

    /// Shift ids in context order; crossover cuts along this sequence
    pub fn shift_order(&self) -> Vec<String> {
        self.shifts.iter().map(|s| s.id.clone()).collect()
    }

    /// Check that the context can support a run
    pub fn validate(&self) -> Result<()> {
        if self.employees.is_empty() {
            return Err(OptimizerError::ContextUnavailable("roster is empty".to_string()));
        }
        if self.shifts.is_empty() {
            return Err(OptimizerError::ContextUnavailable(
                "no shift requirements".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for employee in &self.employees {
            if !seen.insert(employee.id.as_str()) {
                return Err(OptimizerError::ContextUnavailable(format!(
                    "duplicate employee id {}",
                    employee.id
                )));
            }
            if !employee.hourly_rate.is_finite() || !employee.overtime_rate.is_finite() {
                return Err(OptimizerError::ContextUnavailable(format!(
                    "employee {} has a non-finite pay rate",
                    employee.id
                )));
            }
        }

        let mut seen = HashSet::new();
        for shift in &self.shifts {
            if !seen.insert(shift.id.as_str()) {
                return Err(OptimizerError::ContextUnavailable(format!(
                    "duplicate shift id {}",
                    shift.id
                )));
            }
            if shift.end <= shift.start {
                return Err(OptimizerError::ContextUnavailable(format!(
                    "shift {} ends before it starts",
                    shift.id
                )));
            }
        }

        Ok(())
    }

    /// Get statistics about the context
    pub fn statistics(&self) -> ContextStatistics {
        let skills: BTreeSet<&str> = self
            .employees
            .iter()
            .flat_map(|e| e.skills.iter().map(|s| s.as_str()))
            .collect();
        let avg_hourly_rate = if self.employees.is_empty() {
            0.0
        } else {
            self.employees.iter().map(|e| e.hourly_rate).sum::<f64>() / self.employees.len() as f64
        };

        ContextStatistics {
            num_employees: self.employees.len(),
            num_shifts: self.shifts.len(),
            num_demand_intervals: self.demand.len(),
            required_slots: self.shifts.iter().map(|s| s.required_agents).sum(),
            total_contact_volume: self.demand.iter().map(|d| d.contact_volume).sum(),
            distinct_skills: skills.len(),
            avg_hourly_rate,
            max_hours_per_week: self.limits.max_hours_per_week,
        }
    }
}

/// Statistics about an optimization context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextStatistics {
    pub num_employees: usize,
    pub num_shifts: usize,
    pub num_demand_intervals: usize,
    pub required_slots: usize,
    pub total_contact_volume: f64,
    pub distinct_skills: usize,
    pub avg_hourly_rate: f64,
    pub max_hours_per_week: f64,
}

impl std::fmt::Display for ContextStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Context")?;
        writeln!(f, "  Employees: {}", self.num_employees)?;
        writeln!(f, "  Shifts: {} ({} slots required)", self.num_shifts, self.required_slots)?;
        writeln!(f, "  Demand intervals: {}", self.num_demand_intervals)?;
        writeln!(f, "  Total contact volume: {:.1}", self.total_contact_volume)?;
        writeln!(f, "  Distinct skills: {}", self.distinct_skills)?;
        writeln!(f, "  Avg hourly rate: {:.2}", self.avg_hourly_rate)?;
        writeln!(f, "  Max hours/week: {:.1}", self.max_hours_per_week)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::NaiveDate;

    pub fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .expect("valid fixture timestamp")
    }

    pub fn employee(id: &str, role: Role, skills: &[&str], rate: f64, pref: ShiftPreference) -> Employee {
        Employee {
            id: id.to_string(),
            department: "support".to_string(),
            role,
            skills: skills.iter().map(|s| s.to_string()).collect(),
            primary_skill: skills[0].to_string(),
            hourly_rate: rate,
            overtime_rate: rate * 1.5,
            max_hours_per_week: 40.0,
            shift_preference: pref,
        }
    }

    pub fn shift(id: &str, day: u32, start: u32, end: u32, agents: usize, skills: &[&str]) -> ShiftRequirement {
        ShiftRequirement {
            id: id.to_string(),
            start: at(day, start),
            end: at(day, end),
            required_agents: agents,
            required_skills: skills.iter().map(|s| s.to_string()).collect(),
            target_service_level: 0.8,
            priority: 1,
        }
    }

    /// Five employees, three shifts needing 2/3/1 agents
    pub fn sample_context() -> OptimizationContext {
        let employees = vec![
            employee("e1", Role::TeamLead, &["voice", "chat"], 30.0, ShiftPreference::Morning),
            employee("e2", Role::Senior, &["voice", "email"], 24.0, ShiftPreference::Afternoon),
            employee("e3", Role::Agent, &["chat"], 18.0, ShiftPreference::Flexible),
            employee("e4", Role::Agent, &["voice"], 17.0, ShiftPreference::Evening),
            employee("e5", Role::Agent, &["email", "chat"], 19.0, ShiftPreference::Morning),
        ];
        let shifts = vec![
            shift("s1", 4, 8, 16, 2, &["voice"]),
            shift("s2", 4, 12, 20, 3, &["chat", "voice"]),
            shift("s3", 5, 9, 13, 1, &["email"]),
        ];
        let demand = vec![
            DemandInterval {
                start: at(4, 9),
                end: at(4, 10),
                contact_volume: 15.0,
                required_service_level: 0.8,
                skill_requirements: [("voice".to_string(), 1.0)].into_iter().collect(),
                business_priority: 2,
            },
            DemandInterval {
                start: at(4, 14),
                end: at(4, 15),
                contact_volume: 25.0,
                required_service_level: 0.8,
                skill_requirements: [("chat".to_string(), 0.6), ("voice".to_string(), 0.4)]
                    .into_iter()
                    .collect(),
                business_priority: 1,
            },
        ];
        OptimizationContext::new(employees, shifts, demand, RegulatoryLimits::default())
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_preference_bands() {
        assert_eq!(ShiftPreference::from_start_hour(8), ShiftPreference::Morning);
        assert_eq!(ShiftPreference::from_start_hour(13), ShiftPreference::Afternoon);
        assert_eq!(ShiftPreference::from_start_hour(23), ShiftPreference::Night);
        assert_eq!(ShiftPreference::Morning.match_score(&at(4, 8)), 1.0);
        assert_eq!(ShiftPreference::Night.match_score(&at(4, 8)), 0.3);
    }

    #[test]
    fn test_required_agents_rounds_up() {
        let ctx = sample_context();
        assert_eq!(ctx.demand[0].required_agents(10.0), 2);
        assert_eq!(ctx.demand[1].required_agents(10.0), 3);
        assert_eq!(ctx.demand[1].required_agents(0.0), 0);
    }

    #[test]
    fn test_validate_rejects_empty_and_inverted() {
        let ctx = sample_context();
        assert!(ctx.validate().is_ok());

        let mut empty = ctx.clone();
        empty.employees.clear();
        assert!(matches!(empty.validate(), Err(OptimizerError::ContextUnavailable(_))));

        let mut inverted = ctx.clone();
        inverted.shifts[0].end = inverted.shifts[0].start;
        assert!(inverted.validate().is_err());

        let mut duplicate = ctx;
        duplicate.employees[1].id = "e1".to_string();
        assert!(duplicate.validate().is_err());
    }

    #[test]
    fn test_statistics_and_json() {
        let ctx = sample_context();
        let stats = ctx.statistics();
        assert_eq!(stats.num_employees, 5);
        assert_eq!(stats.required_slots, 6);
        assert_eq!(stats.distinct_skills, 3);

        let json = serde_json::to_string(&ctx).unwrap();
        let parsed = OptimizationContext::from_json_str(&json).unwrap();
        assert_eq!(parsed.shift_order(), vec!["s1", "s2", "s3"]);
        assert_eq!(parsed.shifts[0].duration_hours(), 8.0);
    }
}
