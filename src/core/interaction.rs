//! Pairwise interaction of co-located agents.
//!
//! An interaction pass takes the partition of a tile for one context and, within every cell,
//! pairs each infectious agent with each susceptible agent of the same group. Every pair
//! contributes an independent escape factor `1 - p` to the susceptible agent's accumulator.
//!
//! Each agent sits in exactly one cell, so a cell owns the accumulators of its susceptible
//! agents for the duration of a pass. Cells are evaluated independently (in parallel with the
//! `parallel` feature) and their factors are written back afterwards.

use smallvec::SmallVec;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::age::Role;
use super::agent::{Agent, Strain, Tile};
use super::binning::BinPartition;
use super::cache::SpatialBinner;
use super::context::Context;
use super::disease::Disease;
use super::transmission::Contact;
use crate::errors::Result;

/// An infectious agent as seen from the susceptible agents of its cell.
#[derive(Clone, Copy, Debug)]
struct Source {
    group: u32,
    strain: Strain,
    role: Role,
    infectiousness: f64,
}

/// Interaction model of one context with the cell size its agents are binned with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InteractionModel {
    context: Context,
    cell_size: f64,
}

impl InteractionModel {
    pub fn new(context: Context, cell_size: f64) -> Self {
        Self { context, cell_size }
    }

    #[inline]
    pub fn context(&self) -> Context {
        self.context
    }

    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Accumulate the escape probabilities of the susceptible agents of `tile`.
    ///
    /// Disabled contexts, and schools while closed, leave every accumulator untouched without
    /// binning the tile.
    pub fn interact(
        &self,
        tile: &mut Tile,
        binner: &SpatialBinner,
        disease: &Disease,
        school_open: bool,
    ) -> Result<()> {
        if !disease.table().is_enabled(self.context)
            || (self.context == Context::School && !school_open)
        {
            log::trace!("Skipping {} on tile {}", self.context, tile.id());
            return Ok(());
        }

        let partition = binner.build(tile, self.context, self.cell_size)?;
        let factors = self.escape_factors(tile.agents(), &partition, disease, school_open)?;

        let agents = tile.agents_mut();
        for (idx, factor) in factors {
            agents[idx].absorb(factor);
        }
        Ok(())
    }

    #[cfg(feature = "parallel")]
    fn escape_factors(
        &self,
        agents: &[Agent],
        partition: &BinPartition,
        disease: &Disease,
        school_open: bool,
    ) -> Result<Vec<(usize, f64)>> {
        let cells: Vec<&[usize]> = partition.occupied().map(|(_, members)| members).collect();
        let factors = cells
            .par_iter()
            .map(|members| self.cell_escape_factors(agents, members, disease, school_open))
            .collect::<Result<Vec<Vec<(usize, f64)>>>>()?;
        Ok(factors.into_iter().flatten().collect())
    }

    #[cfg(not(feature = "parallel"))]
    fn escape_factors(
        &self,
        agents: &[Agent],
        partition: &BinPartition,
        disease: &Disease,
        school_open: bool,
    ) -> Result<Vec<(usize, f64)>> {
        let factors = partition
            .occupied()
            .map(|(_, members)| self.cell_escape_factors(agents, members, disease, school_open))
            .collect::<Result<Vec<Vec<(usize, f64)>>>>()?;
        Ok(factors.into_iter().flatten().collect())
    }

    /// Escape factor of every susceptible agent in a cell that meets at least one infectious
    /// agent.
    fn cell_escape_factors(
        &self,
        agents: &[Agent],
        members: &[usize],
        disease: &Disease,
        school_open: bool,
    ) -> Result<Vec<(usize, f64)>> {
        let mut sources: SmallVec<[Source; 8]> = SmallVec::new();
        for &idx in members {
            let agent = &agents[idx];
            let Some(strain) = agent.infecting_strain() else {
                continue;
            };
            disease.check_strain(strain)?;
            let Some(group) = self.context.group_of(agent) else {
                continue;
            };
            sources.push(Source {
                group,
                strain,
                role: agent.age_group.role(),
                infectiousness: disease.infectiousness(agent, strain),
            });
        }

        if sources.is_empty() {
            return Ok(Vec::new());
        }

        let table = disease.table();
        let mut factors = Vec::new();
        for &idx in members {
            let agent = &agents[idx];
            if !agent.is_susceptible() {
                continue;
            }
            let Some(group) = self.context.group_of(agent) else {
                continue;
            };

            let mut escapes: SmallVec<[f64; 8]> = sources
                .iter()
                .filter(|source| source.group == group)
                .map(|source| {
                    let contact = Contact {
                        infector: source.role,
                        strain: source.strain,
                        age_group: agent.age_group,
                        school_kind: agent.school_kind,
                    };
                    let p = table.probability(self.context, &contact, school_open)
                        * source.infectiousness
                        * disease.susceptibility(agent, source.strain);
                    1. - p.clamp(0., 1.)
                })
                .collect();

            if escapes.is_empty() {
                continue;
            }

            // fixed multiplication order, independent of the order agents are stored in
            escapes.sort_by(f64::total_cmp);
            factors.push((idx, escapes.iter().product::<f64>()));
        }
        Ok(factors)
    }
}

/// Run `model` over every tile.
///
/// Tiles own disjoint agents and are processed in parallel with the `parallel` feature. All
/// tiles are done when this returns.
#[cfg(feature = "parallel")]
pub fn interact_tiles(
    model: &InteractionModel,
    tiles: &mut [Tile],
    binner: &SpatialBinner,
    disease: &Disease,
    school_open: bool,
) -> Result<()> {
    tiles
        .par_iter_mut()
        .try_for_each(|tile| model.interact(tile, binner, disease, school_open))
}

#[cfg(not(feature = "parallel"))]
pub fn interact_tiles(
    model: &InteractionModel,
    tiles: &mut [Tile],
    binner: &SpatialBinner,
    disease: &Disease,
    school_open: bool,
) -> Result<()> {
    tiles
        .iter_mut()
        .try_for_each(|tile| model.interact(tile, binner, disease, school_open))
}
