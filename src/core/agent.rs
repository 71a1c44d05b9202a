//! Agent storage contract.
//!
//! Agents are owned by the storage layer and grouped into spatial tiles. The interaction core
//! reads positions, ages, group identifiers and disease attributes, and writes nothing but the
//! per-step escape accumulator of susceptible agents.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::age::AgeGroup;

/// Index of a pathogen strain, `0..nstrain`.
pub type Strain = usize;

pub type Position = [f64; 2];

pub type TileId = usize;

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiseaseStatus {
    Susceptible,
    Exposed,
    Infectious,
    Recovered,
}

/// Kind of school an agent attends or works at. Indexes the school transmission table.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchoolKind {
    None,
    High,
    Middle,
    ElementaryUpper,
    ElementaryLower,
    DayCare,
    PlayGroup,
}

pub const N_SCHOOL_KINDS: usize = 7;

impl SchoolKind {
    pub const ALL: [SchoolKind; N_SCHOOL_KINDS] = [
        SchoolKind::None,
        SchoolKind::High,
        SchoolKind::Middle,
        SchoolKind::ElementaryUpper,
        SchoolKind::ElementaryLower,
        SchoolKind::DayCare,
        SchoolKind::PlayGroup,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Agent {
    /// Current location, used for binning.
    pub position: Position,
    /// Night-time location.
    pub home: Position,
    /// Day-time location, if the agent works or attends school.
    pub work: Option<Position>,
    pub age_group: AgeGroup,
    pub household: u32,
    pub neighborhood: u32,
    pub workgroup: Option<u32>,
    pub school: Option<u32>,
    pub school_kind: SchoolKind,
    pub status: DiseaseStatus,
    /// Strain of the current infection.
    pub strain: Option<Strain>,
    pub symptomatic: bool,
    pub vaccinated: bool,
    /// Strain of an earlier, cleared infection.
    pub prior_strain: Option<Strain>,
    escape: f64,
}

impl Agent {
    /// Create a susceptible agent at its home location.
    pub fn new(home: Position, age_group: AgeGroup, household: u32) -> Self {
        Self {
            position: home,
            home,
            work: None,
            age_group,
            household,
            neighborhood: 0,
            workgroup: None,
            school: None,
            school_kind: SchoolKind::None,
            status: DiseaseStatus::Susceptible,
            strain: None,
            symptomatic: false,
            vaccinated: false,
            prior_strain: None,
            escape: 1.,
        }
    }

    /// Mark the agent as infectious with `strain`.
    pub fn infect(&mut self, strain: Strain, symptomatic: bool) {
        self.status = DiseaseStatus::Infectious;
        self.strain = Some(strain);
        self.symptomatic = symptomatic;
    }

    /// Strain the agent currently transmits, if any.
    #[inline]
    pub fn infecting_strain(&self) -> Option<Strain> {
        match self.status {
            DiseaseStatus::Infectious => self.strain,
            _ => None,
        }
    }

    #[inline]
    pub fn is_susceptible(&self) -> bool {
        self.status == DiseaseStatus::Susceptible
    }

    /// Probability of having escaped every contact so far this step.
    #[inline]
    pub fn escape_probability(&self) -> f64 {
        self.escape
    }

    /// Probability of acquiring infection this step.
    #[inline]
    pub fn infection_probability(&self) -> f64 {
        1. - self.escape
    }

    #[inline]
    pub fn reset_escape(&mut self) {
        self.escape = 1.;
    }

    /// Multiply an escape factor in `[0, 1]` into the accumulator.
    #[inline]
    pub(crate) fn absorb(&mut self, factor: f64) {
        debug_assert!((0. ..=1.).contains(&factor));
        self.escape *= factor;
    }
}

/// Axis-aligned, closed spatial bounds of a tile.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lo: Position,
    pub hi: Position,
}

impl Bounds {
    pub fn new(lo: Position, hi: Position) -> Self {
        Self { lo, hi }
    }

    #[inline]
    pub fn contains(&self, position: &Position) -> bool {
        (0..2).all(|d| self.lo[d] <= position[d] && position[d] <= self.hi[d])
    }
}

/// The agents stored for one spatial tile.
#[derive(Clone, Debug)]
pub struct Tile {
    id: TileId,
    bounds: Bounds,
    agents: Vec<Agent>,
}

impl Tile {
    pub fn new(id: TileId, bounds: Bounds, agents: Vec<Agent>) -> Self {
        Self { id, bounds, agents }
    }

    #[inline]
    pub fn id(&self) -> TileId {
        self.id
    }

    #[inline]
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    #[inline]
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Mutable access for the storage layer.
    ///
    /// Moving agents invalidates every partition built for this tile; callers must notify the
    /// binner through `SpatialBinner::invalidate_tile`.
    #[inline]
    pub fn agents_mut(&mut self) -> &mut [Agent] {
        &mut self.agents
    }

    /// Move every agent to the position chosen by `position_of`.
    ///
    /// Same contract as `agents_mut`: partitions of this tile are stale afterwards.
    pub fn set_positions<F>(&mut self, position_of: F)
    where
        F: Fn(&Agent) -> Position,
    {
        for agent in self.agents.iter_mut() {
            agent.position = position_of(agent);
        }
    }

    pub fn reset_escape(&mut self) {
        self.agents.iter_mut().for_each(Agent::reset_escape);
    }

    /// Infection probability of every susceptible agent, keyed by agent index.
    pub fn exposure_probabilities(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.agents
            .iter()
            .enumerate()
            .filter(|(_, agent)| agent.is_susceptible())
            .map(|(idx, agent)| (idx, agent.infection_probability()))
    }
}

/// The spatial domain: its geometry and the tiles that cover it.
#[derive(Clone, Debug)]
pub struct Domain {
    origin: Position,
    extent: Position,
    tiles: Vec<Tile>,
}

impl Domain {
    pub fn new(origin: Position, extent: Position, tiles: Vec<Tile>) -> Self {
        Self {
            origin,
            extent,
            tiles,
        }
    }

    #[inline]
    pub fn origin(&self) -> Position {
        self.origin
    }

    #[inline]
    pub fn extent(&self) -> Position {
        self.extent
    }

    #[inline]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    #[inline]
    pub fn tiles_mut(&mut self) -> &mut [Tile] {
        &mut self.tiles
    }

    pub fn n_agents(&self) -> usize {
        self.tiles.iter().map(Tile::len).sum()
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.tiles.iter().flat_map(|tile| tile.agents().iter())
    }
}
