//! Interaction contexts.

use phf::phf_map;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::agent::Agent;
use crate::errors::EpiError;

pub const N_CONTEXTS: usize = 9;

/// A setting in which agents meet with a context specific transmission probability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Context {
    Generic,
    Home,
    Work,
    School,
    Neighborhood,
    NeighborhoodCluster,
    Community,
    Transit,
    Bar,
}

static CONTEXT_NAMES: phf::Map<&'static str, Context> = phf_map! {
    "generic" => Context::Generic,
    "home" => Context::Home,
    "work" => Context::Work,
    "school" => Context::School,
    "neighborhood" => Context::Neighborhood,
    "neighborhood_cluster" => Context::NeighborhoodCluster,
    "community" => Context::Community,
    "transit" => Context::Transit,
    "bar" => Context::Bar,
};

impl Context {
    pub const ALL: [Context; N_CONTEXTS] = [
        Context::Generic,
        Context::Home,
        Context::Work,
        Context::School,
        Context::Neighborhood,
        Context::NeighborhoodCluster,
        Context::Community,
        Context::Transit,
        Context::Bar,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Context::Generic => "generic",
            Context::Home => "home",
            Context::Work => "work",
            Context::School => "school",
            Context::Neighborhood => "neighborhood",
            Context::NeighborhoodCluster => "neighborhood_cluster",
            Context::Community => "community",
            Context::Transit => "transit",
            Context::Bar => "bar",
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Cell size used when the configuration does not name one.
    ///
    /// Households sit one per unit cell, so the home context collapses each household into a
    /// single bin while the coarser contexts pool several households.
    pub fn default_cell_size(self) -> f64 {
        match self {
            Context::Generic => 1.,
            Context::Home => 1.,
            Context::Work => 1.,
            Context::School => 1.,
            Context::NeighborhoodCluster => 2.,
            Context::Neighborhood => 4.,
            Context::Transit => 8.,
            Context::Community => 16.,
            Context::Bar => 2.,
        }
    }

    /// Group an agent belongs to within a bin.
    ///
    /// Only agents of the same group meet. Contexts that pool every agent of a bin return the
    /// same group for everyone; `None` means the agent takes no part in the context.
    #[inline]
    pub fn group_of(self, agent: &Agent) -> Option<u32> {
        match self {
            Context::Home => Some(agent.household),
            Context::NeighborhoodCluster => Some(agent.neighborhood),
            Context::Work => agent.workgroup,
            Context::School => agent.school,
            Context::Generic
            | Context::Neighborhood
            | Context::Community
            | Context::Transit
            | Context::Bar => Some(0),
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Context {
    type Err = EpiError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        CONTEXT_NAMES
            .get(name)
            .copied()
            .ok_or_else(|| EpiError::ConfigurationError(format!("unknown context: {name}")))
    }
}

impl TryFrom<String> for Context {
    type Error = EpiError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

impl From<Context> for &'static str {
    fn from(context: Context) -> Self {
        context.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::age::AgeGroup;

    #[test]
    fn names_round_trip() {
        for context in Context::ALL {
            assert_eq!(context.name().parse::<Context>().unwrap(), context);
            assert_eq!(format!("{context}"), context.name());
        }
        assert_eq!(CONTEXT_NAMES.len(), N_CONTEXTS);
        assert!("pub".parse::<Context>().is_err());
    }

    #[test]
    fn serde_uses_names() {
        let yaml = serde_yaml::to_string(&vec![Context::Home, Context::NeighborhoodCluster])
            .unwrap();
        assert_eq!(yaml, "- home\n- neighborhood_cluster\n");
        let contexts: Vec<Context> = serde_yaml::from_str("[work, bar]").unwrap();
        assert_eq!(contexts, vec![Context::Work, Context::Bar]);
        assert!(serde_yaml::from_str::<Context>("office").is_err());
    }

    #[test]
    fn keyed_groups() {
        let mut agent = Agent::new([0.5, 0.5], AgeGroup::Adult, 7);
        agent.neighborhood = 3;
        assert_eq!(Context::Home.group_of(&agent), Some(7));
        assert_eq!(Context::NeighborhoodCluster.group_of(&agent), Some(3));
        assert_eq!(Context::Work.group_of(&agent), None);
        assert_eq!(Context::School.group_of(&agent), None);
        assert_eq!(Context::Community.group_of(&agent), Some(0));

        agent.workgroup = Some(11);
        assert_eq!(Context::Work.group_of(&agent), Some(11));
    }
}
