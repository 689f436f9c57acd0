//! View options loaded from a JSON config file.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use viewsync::view::SortOrder;

use crate::cli::{TableArgs, TreeArgs};

/// Options shared by both commands.
///
/// Every field is optional; flags given on the command line replace the
/// values from the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewConfig {
    pub sort_field: Option<String>,
    pub order: Option<SortOrder>,
    pub filter: Option<String>,
    pub sum_field: Option<String>,
}

impl ViewConfig {
    /// Reads a config file; a missing path yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {e}", path.display()))?;
        let config: ViewConfig = serde_json::from_str(&text)
            .map_err(|e| format!("invalid config {}: {e}", path.display()))?;
        tracing::debug!(path = %path.display(), ?config, "Loaded view config");
        Ok(config)
    }

    /// Applies `overrides` on top of `self`.
    pub fn merge(self, overrides: ViewConfig) -> Self {
        Self {
            sort_field: overrides.sort_field.or(self.sort_field),
            order: overrides.order.or(self.order),
            filter: overrides.filter.or(self.filter),
            sum_field: overrides.sum_field.or(self.sum_field),
        }
    }

    pub fn order(&self) -> SortOrder {
        self.order.unwrap_or_default()
    }
}

fn descending(flag: bool) -> Option<SortOrder> {
    flag.then_some(SortOrder::Descending)
}

impl From<&TableArgs> for ViewConfig {
    fn from(args: &TableArgs) -> Self {
        Self {
            sort_field: args.sort_field.clone(),
            order: descending(args.descending),
            filter: args.filter.clone(),
            sum_field: None,
        }
    }
}

impl From<&TreeArgs> for ViewConfig {
    fn from(args: &TreeArgs) -> Self {
        Self {
            sort_field: args.sort_field.clone(),
            order: descending(args.descending),
            filter: args.filter.clone(),
            sum_field: args.sum_field.clone(),
        }
    }
}
