//! Coordinate, CRS and label types shared by every module.
//! Coordinate math uses f64 throughout.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A planar or geographic coordinate pair. For geographic data `x` is the
/// longitude and `y` the latitude, both in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A UTM zone: number in 1..=60 plus hemisphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UtmZone {
    pub number: u8,
    pub north: bool,
}

impl UtmZone {
    pub fn new(number: u8, north: bool) -> Self {
        Self { number: number.clamp(1, 60), north }
    }

    /// EPSG code of the WGS84 / UTM zone (326xx north, 327xx south).
    pub fn epsg(&self) -> u32 {
        let base = if self.north { 32600 } else { 32700 };
        base + self.number as u32
    }

    /// Central meridian in degrees.
    pub fn central_meridian(&self) -> f64 {
        (self.number as f64 - 1.0) * 6.0 - 180.0 + 3.0
    }
}

/// Coordinate reference system of a point set or raster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Crs {
    /// Geographic WGS84 longitude/latitude (EPSG:4326).
    #[default]
    Wgs84,
    Utm(UtmZone),
    /// Any other projected system, identified by EPSG code only.
    Projected { epsg: u32 },
}

impl Crs {
    pub fn from_epsg(code: u32) -> Self {
        match code {
            4326 => Crs::Wgs84,
            32601..=32660 => Crs::Utm(UtmZone::new((code - 32600) as u8, true)),
            32701..=32760 => Crs::Utm(UtmZone::new((code - 32700) as u8, false)),
            epsg => Crs::Projected { epsg },
        }
    }

    pub fn epsg(&self) -> u32 {
        match self {
            Crs::Wgs84 => 4326,
            Crs::Utm(zone) => zone.epsg(),
            Crs::Projected { epsg } => *epsg,
        }
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::Wgs84)
    }

    pub fn is_equivalent(&self, other: &Crs) -> bool {
        self.epsg() == other.epsg()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

/// Opaque region label produced by the external clustering step.
/// JSON integers become `Id`, strings become `Name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegionLabel {
    Id(i64),
    Name(String),
}

impl fmt::Display for RegionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionLabel::Id(id) => write!(f, "{id}"),
            RegionLabel::Name(name) => f.write_str(name),
        }
    }
}

impl From<i64> for RegionLabel {
    fn from(id: i64) -> Self {
        RegionLabel::Id(id)
    }
}

impl From<&str> for RegionLabel {
    fn from(name: &str) -> Self {
        RegionLabel::Name(name.to_string())
    }
}

/// One observed location with its optional attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub individual: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<RegionLabel>,
}

impl SamplePoint {
    pub fn at(x: f64, y: f64) -> Self {
        Self { x, y, timestamp: None, individual: None, region: None }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Per-sample timestamps, or `None` unless every sample carries one.
pub fn collect_timestamps(samples: &[SamplePoint]) -> Option<Vec<DateTime<Utc>>> {
    samples.iter().map(|s| s.timestamp).collect()
}

/// Per-sample individual ids, or `None` unless every sample carries one.
pub fn collect_individuals(samples: &[SamplePoint]) -> Option<Vec<String>> {
    samples.iter().map(|s| s.individual.clone()).collect()
}

/// Per-sample region labels, or `None` unless every sample carries one.
pub fn collect_regions(samples: &[SamplePoint]) -> Option<Vec<RegionLabel>> {
    samples.iter().map(|s| s.region.clone()).collect()
}
