//! This module contains the core datatypes of the library.

pub mod age;
pub mod agent;
pub mod binning;
pub mod cache;
pub mod context;
pub mod disease;
pub mod interaction;
pub mod transmission;

pub use age::{AgeGroup, Role};
pub use agent::{Agent, Bounds, DiseaseStatus, Domain, Position, SchoolKind, Strain, Tile, TileId};
pub use binning::BinPartition;
pub use cache::{BinState, CachedPartition, SpatialBinner};
pub use context::Context;
pub use disease::Disease;
pub use interaction::{InteractionModel, interact_tiles};
pub use transmission::{Contact, TransmissionTable};
