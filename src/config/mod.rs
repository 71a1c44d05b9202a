//! Configuration data structures for simulation setups.

mod contexts;
mod parameters;
mod population;
mod schedule;
mod settings;

pub use contexts::ContextSettings;
pub use parameters::DiseaseParameters;
pub use population::PopulationSettings;
pub use schedule::{Phase, Schedule};
pub use settings::Settings;
