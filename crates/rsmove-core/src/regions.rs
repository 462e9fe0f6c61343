//! Region assignment as produced by the external clustering step: one label
//! per presence sample plus optional region boundaries.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::coords::RegionLabel;
use crate::error::{Error, Result};
use crate::geodesy::Polygon;

/// Label given to every sample by [`RegionAssignment::single_region`].
pub const SINGLE_REGION_LABEL: i64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionPolygon {
    pub region: RegionLabel,
    #[serde(flatten)]
    pub polygon: Polygon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionAssignment {
    /// Region label of each sample, in sample order.
    pub indices: Vec<RegionLabel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub polygons: Vec<RegionPolygon>,
}

impl RegionAssignment {
    pub fn new(indices: Vec<RegionLabel>) -> Self {
        Self { indices, polygons: Vec::new() }
    }

    /// Every one of `n` samples in one implicit region.
    pub fn single_region(n: usize) -> Self {
        Self::new(vec![RegionLabel::Id(SINGLE_REGION_LABEL); n])
    }

    pub fn with_polygon(mut self, region: impl Into<RegionLabel>, polygon: Polygon) -> Self {
        self.polygons.push(RegionPolygon { region: region.into(), polygon });
        self
    }

    /// Parse a clustering output document. A missing `indices` field or any
    /// other schema problem is an invalid input.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::invalid(format!("region assignment: {e}")))
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn has_polygons(&self) -> bool {
        !self.polygons.is_empty()
    }

    /// Sample positions per label, labels ascending.
    pub fn members(&self) -> BTreeMap<&RegionLabel, Vec<usize>> {
        let mut groups: BTreeMap<&RegionLabel, Vec<usize>> = BTreeMap::new();
        for (i, label) in self.indices.iter().enumerate() {
            groups.entry(label).or_default().push(i);
        }
        groups
    }

    /// Polygon per label. A label with two polygons is an invalid input.
    pub fn polygon_map(&self) -> Result<HashMap<&RegionLabel, &Polygon>> {
        let mut map = HashMap::with_capacity(self.polygons.len());
        for rp in &self.polygons {
            if map.insert(&rp.region, &rp.polygon).is_some() {
                return Err(Error::invalid(format!("region {} has more than one polygon", rp.region)));
            }
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Point;

    #[test]
    fn missing_indices_is_invalid_input() {
        let err = RegionAssignment::from_json(r#"{"polygons": []}"#).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn parses_labels_and_flattened_polygons() {
        let json = r#"{
            "indices": [1, 1, "b"],
            "polygons": [{"region": "b", "ring": [{"x":0,"y":0},{"x":1,"y":0},{"x":1,"y":1}]}]
        }"#;
        let a = RegionAssignment::from_json(json).unwrap();
        assert_eq!(a.len(), 3);
        assert_eq!(a.polygons[0].region, RegionLabel::from("b"));
        assert_eq!(a.polygons[0].polygon.ring[2], Point::new(1.0, 1.0));
        let members = a.members();
        assert_eq!(members[&RegionLabel::Id(1)], vec![0, 1]);
        assert_eq!(members[&RegionLabel::from("b")], vec![2]);
    }

    #[test]
    fn duplicate_polygons_are_rejected() {
        let sq = Polygon::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(1.0, 1.0)]);
        let a = RegionAssignment::single_region(2).with_polygon(1i64, sq.clone()).with_polygon(1i64, sq);
        assert!(a.polygon_map().is_err());
    }

    #[test]
    fn single_region_labels_everything_alike() {
        let a = RegionAssignment::single_region(4);
        assert_eq!(a.members().len(), 1);
        assert!(!a.has_polygons());
    }
}
