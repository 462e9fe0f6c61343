//! Region statistics and background sample selection for animal-tracking
//! data analysed against remote-sensing imagery.
//!
//! [`region_stats`] summarizes externally clustered sample regions;
//! [`background`] picks pseudo-absence cells that are environmentally
//! distinct from every occupied region.

pub mod background;
pub mod coords;
pub mod error;
pub mod geodesy;
pub mod params;
pub mod pca;
pub mod raster;
pub mod region_stats;
pub mod regions;
pub mod robust;

pub use background::{select_background, BackgroundSelection};
pub use coords::{Crs, Point, RegionLabel, SamplePoint, UtmZone};
pub use error::{Error, Result};
pub use geodesy::Polygon;
pub use params::{AreaMode, BackgroundParams, RegionStatsParams, SelectionMode};
pub use raster::{RasterLayer, RasterSource, RasterStack};
pub use region_stats::{summarize_regions, RegionSummary};
pub use regions::RegionAssignment;
