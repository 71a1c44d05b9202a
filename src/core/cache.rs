//! Caching of bin partitions per tile and context.

use derive_more::{Deref, From};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::agent::{Position, Tile, TileId};
use super::binning::BinPartition;
use super::context::Context;
use crate::errors::{EpiError, Result};

/// Shared handle to a built partition.
#[derive(Debug, Deref, From)]
pub struct CachedPartition(pub Arc<BinPartition>);

impl Clone for CachedPartition {
    fn clone(&self) -> Self {
        CachedPartition(self.0.clone())
    }
}

/// Build state of the partition of one (tile, context) pair.
#[derive(Clone, Debug)]
pub enum BinState {
    Unbuilt,
    Built(CachedPartition),
}

impl BinState {
    pub fn is_built(&self) -> bool {
        matches!(self, BinState::Built(_))
    }
}

/// Builds bin partitions and caches them until they are invalidated.
///
/// A partition is only valid for the agent positions it was built from. The owner of the agent
/// storage must call `invalidate` or `invalidate_tile` whenever agents move; the binner keeps
/// returning the cached partition until then.
pub struct SpatialBinner {
    origin: Position,
    bins: RwLock<HashMap<(TileId, Context), BinState>>,
}

impl SpatialBinner {
    /// Create a binner whose cells align to the domain `origin`.
    pub fn new(origin: Position) -> Self {
        Self {
            origin,
            bins: RwLock::new(HashMap::new()),
        }
    }

    /// Get the partition of `tile` for `context`, building it if necessary.
    ///
    /// A cached partition is reused only if it was built with the same `cell_size`; otherwise
    /// it is rebuilt and replaced. A reused partition must still cover exactly the agents of
    /// `tile`: if the tile gained or lost agents without an invalidation, this fails with
    /// `InvariantViolation`.
    pub fn build(&self, tile: &Tile, context: Context, cell_size: f64) -> Result<CachedPartition> {
        let key = (tile.id(), context);

        // First, try to read a built partition
        let cached = match self.bins.read().get(&key) {
            Some(BinState::Built(partition)) if partition.cell_size() == cell_size => {
                Some(partition.clone())
            }
            _ => None,
        };
        if let Some(partition) = cached {
            return Self::check_population(partition, tile, context);
        }

        let partition = CachedPartition::from(Arc::new(BinPartition::build(
            tile,
            self.origin,
            cell_size,
        )?));
        log::trace!(
            "Built {} partition of tile {} ({} agents in {} cells)",
            context,
            tile.id(),
            partition.n_items(),
            partition.n_cells()
        );

        let mut bins = self.bins.write();
        let state = bins.entry(key).or_insert(BinState::Unbuilt);
        // another worker may have built it in the meantime
        if let BinState::Built(existing) = state {
            if existing.cell_size() == cell_size {
                return Self::check_population(existing.clone(), tile, context);
            }
        }
        *state = BinState::Built(partition.clone());
        Ok(partition)
    }

    fn check_population(
        partition: CachedPartition,
        tile: &Tile,
        context: Context,
    ) -> Result<CachedPartition> {
        if partition.n_items() != tile.len() {
            return Err(EpiError::InvariantViolation(format!(
                "{context} partition of tile {} holds {} agents, but the tile has {}",
                tile.id(),
                partition.n_items(),
                tile.len()
            )));
        }
        Ok(partition)
    }

    /// Force the next `build` for (tile, context) to recompute.
    pub fn invalidate(&self, tile: TileId, context: Context) {
        if let Some(state) = self.bins.write().get_mut(&(tile, context)) {
            *state = BinState::Unbuilt;
        }
    }

    /// Invalidate the partitions of every context of `tile`.
    pub fn invalidate_tile(&self, tile: TileId) {
        for ((id, _), state) in self.bins.write().iter_mut() {
            if *id == tile {
                *state = BinState::Unbuilt;
            }
        }
    }

    pub fn invalidate_all(&self) {
        for state in self.bins.write().values_mut() {
            *state = BinState::Unbuilt;
        }
    }

    /// Current build state of (tile, context).
    pub fn state(&self, tile: TileId, context: Context) -> BinState {
        self.bins
            .read()
            .get(&(tile, context))
            .cloned()
            .unwrap_or(BinState::Unbuilt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::age::AgeGroup;
    use crate::core::agent::{Agent, Bounds};

    fn tile() -> Tile {
        let agents = vec![
            Agent::new([0.5, 0.5], AgeGroup::Adult, 0),
            Agent::new([0.5, 0.5], AgeGroup::Adult, 0),
            Agent::new([2.5, 0.5], AgeGroup::Adult, 1),
        ];
        Tile::new(3, Bounds::new([0., 0.], [4., 4.]), agents)
    }

    #[test]
    fn unbuilt_until_built() {
        let binner = SpatialBinner::new([0., 0.]);
        let tile = Tile::new(3, Bounds::new([0., 0.], [4., 4.]), Vec::new());
        assert!(!binner.state(3, Context::Home).is_built());

        // built but empty is not unbuilt
        binner.build(&tile, Context::Home, 1.).unwrap();
        match binner.state(3, Context::Home) {
            BinState::Built(partition) => assert_eq!(partition.n_items(), 0),
            BinState::Unbuilt => panic!("partition should be built"),
        }
        assert!(!binner.state(3, Context::Work).is_built());
    }

    #[test]
    fn cached_partition_is_reused() {
        let binner = SpatialBinner::new([0., 0.]);
        let tile = tile();
        let first = binner.build(&tile, Context::Home, 1.).unwrap();
        let second = binner.build(&tile, Context::Home, 1.).unwrap();
        assert!(Arc::ptr_eq(&first.0, &second.0));
    }

    #[test]
    fn stale_partition_without_invalidation() {
        let binner = SpatialBinner::new([0., 0.]);
        let mut tile = tile();
        let before = binner.build(&tile, Context::Home, 1.).unwrap();
        assert_eq!(before.cell(0), &[0, 1]);

        // move the second agent next to the third one
        tile.agents_mut()[1].position = [2.5, 0.5];
        let stale = binner.build(&tile, Context::Home, 1.).unwrap();
        assert_eq!(stale.cell(0), &[0, 1]);
        assert_eq!(stale.cell(2), &[2]);

        binner.invalidate(tile.id(), Context::Home);
        assert!(!binner.state(tile.id(), Context::Home).is_built());
        let fresh = binner.build(&tile, Context::Home, 1.).unwrap();
        assert_eq!(fresh.cell(0), &[0]);
        assert_eq!(fresh.cell(2), &[1, 2]);
    }

    #[test]
    fn invalidate_tile_keeps_other_tiles() {
        let binner = SpatialBinner::new([0., 0.]);
        let tile = tile();
        let other = Tile::new(4, Bounds::new([4., 0.], [8., 4.]), Vec::new());
        binner.build(&tile, Context::Home, 1.).unwrap();
        binner.build(&tile, Context::Community, 16.).unwrap();
        binner.build(&other, Context::Home, 1.).unwrap();

        binner.invalidate_tile(tile.id());
        assert!(!binner.state(tile.id(), Context::Home).is_built());
        assert!(!binner.state(tile.id(), Context::Community).is_built());
        assert!(binner.state(other.id(), Context::Home).is_built());

        binner.invalidate_all();
        assert!(!binner.state(other.id(), Context::Home).is_built());
    }

    #[test]
    fn grown_tile_without_invalidation() {
        let binner = SpatialBinner::new([0., 0.]);
        let mut tile = tile();
        binner.build(&tile, Context::Home, 1.).unwrap();

        let mut agents = tile.agents().to_vec();
        agents.push(Agent::new([0.5, 0.5], AgeGroup::Senior, 0));
        tile = Tile::new(tile.id(), *tile.bounds(), agents);
        assert!(matches!(
            binner.build(&tile, Context::Home, 1.),
            Err(EpiError::InvariantViolation(_))
        ));

        binner.invalidate_tile(tile.id());
        assert_eq!(binner.build(&tile, Context::Home, 1.).unwrap().n_items(), 4);
    }

    #[test]
    fn shrunk_tile_without_invalidation() {
        let binner = SpatialBinner::new([0., 0.]);
        let tile = tile();
        binner.build(&tile, Context::Home, 1.).unwrap();

        let shrunk = Tile::new(tile.id(), *tile.bounds(), tile.agents()[..1].to_vec());
        assert!(matches!(
            binner.build(&shrunk, Context::Home, 1.),
            Err(EpiError::InvariantViolation(_))
        ));
    }

    #[test]
    fn other_cell_size_rebuilds() {
        let binner = SpatialBinner::new([0., 0.]);
        let tile = tile();
        let fine = binner.build(&tile, Context::Neighborhood, 1.).unwrap();
        let coarse = binner.build(&tile, Context::Neighborhood, 4.).unwrap();
        assert_eq!(fine.cell_size(), 1.);
        assert_eq!(coarse.cell_size(), 4.);
        assert_eq!(coarse.cell(0), &[0, 1, 2]);

        // the latest cell size replaces the cached partition
        let again = binner.build(&tile, Context::Neighborhood, 4.).unwrap();
        assert!(Arc::ptr_eq(&coarse.0, &again.0));
    }

    #[test]
    fn failed_build_stays_unbuilt() {
        let binner = SpatialBinner::new([0., 0.]);
        let mut tile = tile();
        tile.agents_mut()[0].position = [10., 10.];
        assert!(binner.build(&tile, Context::Home, 1.).is_err());
        assert!(!binner.state(tile.id(), Context::Home).is_built());
    }
}
