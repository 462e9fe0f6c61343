//! Run parameters for both engines. All are serde-loadable and fall back to
//! the defaults below when a field is omitted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// How region polygon coordinates are interpreted for area estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaMode {
    /// Projected coordinates in metres; area is computed directly.
    Metric,
    /// WGS84 degrees; polygons go through their dominant UTM zone first.
    Degrees,
}

impl FromStr for AreaMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "metric" => Ok(AreaMode::Metric),
            "degrees" => Ok(AreaMode::Degrees),
            other => Err(Error::invalid(format!("unknown area mode '{other}', expected metric or degrees"))),
        }
    }
}

impl fmt::Display for AreaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AreaMode::Metric => "metric",
            AreaMode::Degrees => "degrees",
        })
    }
}

/// Background selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Unoccupied cells as-is.
    Random,
    /// Unoccupied cells that every presence region finds unusual on some
    /// retained principal component.
    Pca,
}

impl FromStr for SelectionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "random" => Ok(SelectionMode::Random),
            "pca" => Ok(SelectionMode::Pca),
            other => Err(Error::invalid(format!("unknown selection mode '{other}', expected random or pca"))),
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SelectionMode::Random => "random",
            SelectionMode::Pca => "pca",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionStatsParams {
    pub area_mode: AreaMode,
}

impl Default for RegionStatsParams {
    fn default() -> Self {
        Self { area_mode: AreaMode::Metric }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundParams {
    pub mode: SelectionMode,
    /// Draw this many candidates with replacement. `None` keeps every
    /// unoccupied cell. Zero is rejected.
    pub n_samples: Option<usize>,
    /// Seed of the subsampling RNG.
    pub seed: u64,
}

impl Default for BackgroundParams {
    fn default() -> Self {
        Self { mode: SelectionMode::Random, n_samples: None, seed: 42 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_parse_from_lowercase_names() {
        assert_eq!("metric".parse::<AreaMode>().unwrap(), AreaMode::Metric);
        assert_eq!("degrees".parse::<AreaMode>().unwrap(), AreaMode::Degrees);
        assert!("acres".parse::<AreaMode>().unwrap_err().is_invalid_input());
        assert_eq!("pca".parse::<SelectionMode>().unwrap(), SelectionMode::Pca);
        assert!("Random".parse::<SelectionMode>().is_err());
    }

    #[test]
    fn params_fill_missing_fields_with_defaults() {
        let p: BackgroundParams = serde_json::from_str(r#"{"mode":"pca"}"#).unwrap();
        assert_eq!(p.mode, SelectionMode::Pca);
        assert_eq!(p.n_samples, None);
        assert_eq!(p.seed, 42);
        let r: RegionStatsParams = serde_json::from_str("{}").unwrap();
        assert_eq!(r.area_mode, AreaMode::Metric);
        assert!(serde_json::from_str::<BackgroundParams>(r#"{"mode":"kriging"}"#).is_err());
    }
}
