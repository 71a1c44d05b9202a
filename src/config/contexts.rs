use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::parameters::check_positive;
use crate::core::{Context, InteractionModel};
use crate::errors::Result;

/// Bin cell sizes per context.
///
/// Contexts missing from `cell_sizes` use `Context::default_cell_size`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ContextSettings {
    pub cell_sizes: BTreeMap<Context, f64>,
}

impl ContextSettings {
    pub fn cell_size(&self, context: Context) -> f64 {
        self.cell_sizes
            .get(&context)
            .copied()
            .unwrap_or_else(|| context.default_cell_size())
    }

    pub fn model(&self, context: Context) -> InteractionModel {
        InteractionModel::new(context, self.cell_size(context))
    }

    pub fn validate(&self) -> Result<()> {
        for (context, &cell_size) in self.cell_sizes.iter() {
            check_positive(&format!("cell size of {context}"), cell_size)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_defaults() {
        let settings = ContextSettings {
            cell_sizes: BTreeMap::from([(Context::Community, 32.)]),
        };
        assert_eq!(settings.cell_size(Context::Community), 32.);
        assert_eq!(settings.cell_size(Context::Neighborhood), 4.);
        assert_eq!(settings.model(Context::Transit).cell_size(), 8.);
        assert_eq!(settings.model(Context::Home).context(), Context::Home);
    }

    #[test]
    fn read_by_name() {
        let yaml = "cell_sizes:\n  neighborhood_cluster: 3.0\n  bar: 1.5\n";
        let settings: ContextSettings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.cell_size(Context::NeighborhoodCluster), 3.);
        assert_eq!(settings.cell_size(Context::Bar), 1.5);
        settings.validate().unwrap();

        assert!(serde_yaml::from_str::<ContextSettings>("cell_sizes:\n  pub: 1.0\n").is_err());
    }

    #[test]
    fn non_positive_cell_size() {
        let settings = ContextSettings {
            cell_sizes: BTreeMap::from([(Context::Home, 0.)]),
        };
        assert!(settings.validate().is_err());
    }
}
