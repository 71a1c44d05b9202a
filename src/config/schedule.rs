use derive_more::Display;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::core::Context;
use crate::errors::{EpiError, Result};

/// Half of a simulation step.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[display("day")]
    Day,
    #[display("night")]
    Night,
}

impl Phase {
    /// Phases in the order they run within a step.
    pub const ALL: [Phase; 2] = [Phase::Day, Phase::Night];
}

/// Which contexts run in which phase, and when schools are closed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Schedule {
    /// Contexts run while agents are at their work position.
    pub day: Vec<Context>,
    /// Contexts run while agents are at home.
    pub night: Vec<Context>,
    /// Steps during which schools are closed.
    pub school_closures: Vec<Range<usize>>,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            day: vec![
                Context::Work,
                Context::School,
                Context::Transit,
                Context::Community,
                Context::Bar,
            ],
            night: vec![
                Context::Home,
                Context::NeighborhoodCluster,
                Context::Neighborhood,
            ],
            school_closures: Vec::new(),
        }
    }
}

impl Schedule {
    pub fn contexts(&self, phase: Phase) -> &[Context] {
        match phase {
            Phase::Day => &self.day,
            Phase::Night => &self.night,
        }
    }

    pub fn is_school_open(&self, step: usize) -> bool {
        !self
            .school_closures
            .iter()
            .any(|closure| closure.contains(&step))
    }

    pub fn validate(&self) -> Result<()> {
        for phase in Phase::ALL {
            if let Some(context) = self.contexts(phase).iter().duplicates().next() {
                return Err(EpiError::ConfigurationError(format!(
                    "context {context} is scheduled twice during the {phase}"
                )));
            }
        }
        for closure in self.school_closures.iter() {
            if closure.start > closure.end {
                return Err(EpiError::ConfigurationError(format!(
                    "school closure {closure:?} ends before it starts"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn school_closures() {
        let schedule = Schedule {
            school_closures: vec![3..5, 10..11],
            ..Default::default()
        };
        let open: Vec<bool> = (0..12).map(|step| schedule.is_school_open(step)).collect();
        assert_eq!(
            open,
            vec![true, true, true, false, false, true, true, true, true, true, false, true]
        );
    }

    #[test]
    fn read_schedule() {
        let yaml = r#"
day: [work, school]
night: [home]
school_closures:
  - start: 2
    end: 4
"#;
        let schedule: Schedule = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(schedule.contexts(Phase::Day), &[Context::Work, Context::School]);
        assert_eq!(schedule.contexts(Phase::Night), &[Context::Home]);
        assert!(!schedule.is_school_open(3));
        schedule.validate().unwrap();
    }

    #[test]
    fn duplicate_context() {
        let schedule = Schedule {
            night: vec![Context::Home, Context::Neighborhood, Context::Home],
            ..Default::default()
        };
        assert!(matches!(
            schedule.validate(),
            Err(EpiError::ConfigurationError(_))
        ));
    }
}
