//! This module contains any logic needed to initialize the simulation.

pub mod population;

pub use population::generate;
