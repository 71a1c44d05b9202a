use itertools::Itertools;
use std::fmt;

use crate::core::{Agent, DiseaseStatus, Domain, Tile};

/// Disease status counts and the infection probabilities accumulated in one step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExposureSummary {
    pub susceptible: usize,
    pub exposed: usize,
    pub infectious: usize,
    pub recovered: usize,
    /// Susceptible agents with a non-zero infection probability.
    pub at_risk: usize,
    /// Expected number of new infections, the sum of all infection probabilities.
    pub expected_infections: f64,
    pub max_infection_probability: f64,
}

impl ExposureSummary {
    fn from_agents<'a>(agents: impl Iterator<Item = &'a Agent>) -> Self {
        let mut summary = Self::default();
        let mut statuses = Vec::new();
        for agent in agents {
            statuses.push(agent.status);
            if agent.is_susceptible() {
                let probability = agent.infection_probability();
                if probability > 0. {
                    summary.at_risk += 1;
                }
                summary.expected_infections += probability;
                summary.max_infection_probability =
                    summary.max_infection_probability.max(probability);
            }
        }
        for (status, count) in statuses.into_iter().counts() {
            match status {
                DiseaseStatus::Susceptible => summary.susceptible = count,
                DiseaseStatus::Exposed => summary.exposed = count,
                DiseaseStatus::Infectious => summary.infectious = count,
                DiseaseStatus::Recovered => summary.recovered = count,
            }
        }
        summary
    }

    pub fn n_agents(&self) -> usize {
        self.susceptible + self.exposed + self.infectious + self.recovered
    }

    /// Mean infection probability of the susceptible agents.
    pub fn mean_infection_probability(&self) -> f64 {
        if self.susceptible == 0 {
            return 0.;
        }
        self.expected_infections / self.susceptible as f64
    }
}

impl fmt::Display for ExposureSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "S={} E={} I={} R={} at_risk={} expected_infections={:.4} mean_p={:.6} max_p={:.6}",
            self.susceptible,
            self.exposed,
            self.infectious,
            self.recovered,
            self.at_risk,
            self.expected_infections,
            self.mean_infection_probability(),
            self.max_infection_probability
        )
    }
}

/// Trait extension to summarize the exposure of a collection of agents
pub trait ExposureStatistics {
    fn exposure_summary(&self) -> ExposureSummary;
}

impl ExposureStatistics for Tile {
    fn exposure_summary(&self) -> ExposureSummary {
        ExposureSummary::from_agents(self.agents().iter())
    }
}

impl ExposureStatistics for Domain {
    fn exposure_summary(&self) -> ExposureSummary {
        ExposureSummary::from_agents(self.agents())
    }
}
