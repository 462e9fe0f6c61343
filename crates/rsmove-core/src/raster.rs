//! Raster grid adapter: coordinate ↔ cell index mapping and band value
//! extraction over single layers and multi-band stacks.
//!
//! Cells are numbered row-major from the top-left corner; row 0 touches the
//! maximum-y edge of the extent. Missing values surface as NaN.

use serde::{Deserialize, Serialize};

use crate::coords::{Crs, Point};
use crate::error::{Error, Result};

/// Uniform read access to any raster-like source the selector can sample.
pub trait RasterSource {
    fn crs(&self) -> Crs;

    fn cell_count(&self) -> usize;

    fn band_count(&self) -> usize;

    /// Cell containing `p`, or `None` when `p` falls outside the extent.
    fn cell_index_of(&self, p: Point) -> Option<usize>;

    /// Centre of cell `index`.
    fn coordinate_of_cell(&self, index: usize) -> Point;

    /// Check the grid is usable before any cell is addressed.
    fn validate(&self) -> Result<()>;

    /// One value per band at cell `index`; NaN where a band has no data.
    fn cell_values(&self, index: usize) -> Vec<f64>;

    /// One row per point, one column per band. Points outside the extent
    /// yield a row of NaN.
    fn extract_values(&self, points: &[Point]) -> Vec<Vec<f64>> {
        points
            .iter()
            .map(|&p| match self.cell_index_of(p) {
                Some(idx) => self.cell_values(idx),
                None => vec![f64::NAN; self.band_count()],
            })
            .collect()
    }
}

/// A single raster band stored row-major as f32.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "LayerDoc")]
pub struct RasterLayer {
    pub data: Vec<f32>,
    pub width: usize,
    pub height: usize,
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub crs: Crs,
    /// Sentinel treated as missing in addition to non-finite values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodata: Option<f32>,
}

/// Wire form of [`RasterLayer`], checked before it becomes one.
#[derive(Deserialize)]
struct LayerDoc {
    data: Vec<f32>,
    width: usize,
    height: usize,
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
    crs: Crs,
    #[serde(default)]
    nodata: Option<f32>,
}

impl TryFrom<LayerDoc> for RasterLayer {
    type Error = Error;

    fn try_from(doc: LayerDoc) -> Result<Self> {
        let layer = RasterLayer {
            data: doc.data,
            width: doc.width,
            height: doc.height,
            min_x: doc.min_x,
            max_x: doc.max_x,
            min_y: doc.min_y,
            max_y: doc.max_y,
            crs: doc.crs,
            nodata: doc.nodata,
        };
        RasterSource::validate(&layer)?;
        Ok(layer)
    }
}

impl RasterLayer {
    /// Create a layer filled with `fill`.
    pub fn new(width: usize, height: usize, min_x: f64, max_x: f64, min_y: f64, max_y: f64, crs: Crs, fill: f32) -> Self {
        Self {
            data: vec![fill; width * height],
            width,
            height,
            min_x,
            max_x,
            min_y,
            max_y,
            crs,
            nodata: None,
        }
    }

    /// Unit-cell layer whose extent starts at the origin, so cell (row, col)
    /// covers x ∈ [col, col+1), y ∈ (height-row-1, height-row].
    pub fn unit(width: usize, height: usize, crs: Crs) -> Self {
        Self::new(width, height, 0.0, width as f64, 0.0, height as f64, crs, 0.0)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: f32) {
        self.data[row * self.width + col] = val;
    }

    pub fn cell_width(&self) -> f64 {
        (self.max_x - self.min_x) / self.width as f64
    }

    pub fn cell_height(&self) -> f64 {
        (self.max_y - self.min_y) / self.height as f64
    }

    /// Value at `index` as f64, or NaN for missing data.
    pub fn value_at(&self, index: usize) -> f64 {
        let v = self.data[index];
        if !v.is_finite() || self.nodata == Some(v) {
            f64::NAN
        } else {
            v as f64
        }
    }

    pub fn same_geometry(&self, other: &RasterLayer) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.min_x == other.min_x
            && self.max_x == other.max_x
            && self.min_y == other.min_y
            && self.max_y == other.max_y
            && self.crs.is_equivalent(&other.crs)
    }

    fn check_grid(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::invalid(format!("raster has empty dimensions {}x{}", self.width, self.height)));
        }
        if self.data.len() != self.width * self.height {
            return Err(Error::invalid(format!(
                "raster data holds {} values, expected {}x{}",
                self.data.len(),
                self.width,
                self.height
            )));
        }
        if !(self.max_x > self.min_x && self.max_y > self.min_y) {
            return Err(Error::invalid("raster extent is degenerate"));
        }
        Ok(())
    }
}

impl RasterSource for RasterLayer {
    fn crs(&self) -> Crs {
        self.crs
    }

    fn cell_count(&self) -> usize {
        self.width * self.height
    }

    fn band_count(&self) -> usize {
        1
    }

    fn cell_index_of(&self, p: Point) -> Option<usize> {
        if !(p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y) {
            return None;
        }
        // Points on the max-x / min-y edge belong to the last column / row.
        let col = (((p.x - self.min_x) / self.cell_width()).floor() as usize).min(self.width - 1);
        let row = (((self.max_y - p.y) / self.cell_height()).floor() as usize).min(self.height - 1);
        Some(row * self.width + col)
    }

    fn coordinate_of_cell(&self, index: usize) -> Point {
        let row = index / self.width;
        let col = index % self.width;
        Point::new(
            self.min_x + (col as f64 + 0.5) * self.cell_width(),
            self.max_y - (row as f64 + 0.5) * self.cell_height(),
        )
    }

    fn cell_values(&self, index: usize) -> Vec<f64> {
        vec![self.value_at(index)]
    }

    fn validate(&self) -> Result<()> {
        self.check_grid()
    }
}

/// Several bands sharing one grid geometry (an image stack).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<RasterLayer>", into = "Vec<RasterLayer>")]
pub struct RasterStack {
    layers: Vec<RasterLayer>,
}

impl RasterStack {
    pub fn new(layers: Vec<RasterLayer>) -> Result<Self> {
        if layers.is_empty() {
            return Err(Error::invalid("raster stack has no layers"));
        }
        let stack = Self { layers };
        RasterSource::validate(&stack)?;
        Ok(stack)
    }

    pub fn layers(&self) -> &[RasterLayer] {
        &self.layers
    }

    fn grid(&self) -> &RasterLayer {
        &self.layers[0]
    }
}

impl TryFrom<Vec<RasterLayer>> for RasterStack {
    type Error = Error;

    fn try_from(layers: Vec<RasterLayer>) -> Result<Self> {
        Self::new(layers)
    }
}

impl From<RasterStack> for Vec<RasterLayer> {
    fn from(stack: RasterStack) -> Self {
        stack.layers
    }
}

impl RasterSource for RasterStack {
    fn crs(&self) -> Crs {
        self.grid().crs
    }

    fn cell_count(&self) -> usize {
        self.grid().cell_count()
    }

    fn band_count(&self) -> usize {
        self.layers.len()
    }

    fn cell_index_of(&self, p: Point) -> Option<usize> {
        self.grid().cell_index_of(p)
    }

    fn coordinate_of_cell(&self, index: usize) -> Point {
        self.grid().coordinate_of_cell(index)
    }

    fn cell_values(&self, index: usize) -> Vec<f64> {
        self.layers.iter().map(|l| l.value_at(index)).collect()
    }

    fn validate(&self) -> Result<()> {
        let first = self.grid();
        first.check_grid()?;
        for (i, layer) in self.layers.iter().enumerate().skip(1) {
            layer.check_grid()?;
            if !first.same_geometry(layer) {
                return Err(Error::invalid(format!("raster stack layer {i} does not share the grid of layer 0")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_index_roundtrips_through_cell_centre() {
        let layer = RasterLayer::new(4, 3, 10.0, 18.0, -3.0, 0.0, Crs::from_epsg(32633), 0.0);
        for idx in 0..layer.cell_count() {
            let centre = layer.coordinate_of_cell(idx);
            assert_eq!(layer.cell_index_of(centre), Some(idx));
        }
        // Top-left cell touches max_y.
        assert_eq!(layer.cell_index_of(Point::new(10.1, -0.1)), Some(0));
        // Far edges are inclusive.
        assert_eq!(layer.cell_index_of(Point::new(18.0, -3.0)), Some(11));
        assert_eq!(layer.cell_index_of(Point::new(18.01, -1.0)), None);
    }

    #[test]
    fn nodata_and_outside_points_extract_as_nan() {
        let mut layer = RasterLayer::unit(2, 2, Crs::Wgs84);
        layer.nodata = Some(-9999.0);
        layer.set(0, 0, 5.0);
        layer.set(0, 1, -9999.0);
        let rows = layer.extract_values(&[Point::new(0.5, 1.5), Point::new(1.5, 1.5), Point::new(5.0, 5.0)]);
        assert_eq!(rows[0], vec![5.0]);
        assert!(rows[1][0].is_nan());
        assert!(rows[2][0].is_nan());
    }

    #[test]
    fn stack_rejects_mismatched_layers() {
        let a = RasterLayer::unit(3, 3, Crs::Wgs84);
        let b = RasterLayer::unit(3, 4, Crs::Wgs84);
        let err = RasterStack::new(vec![a.clone(), b]).unwrap_err();
        assert!(err.is_invalid_input());
        assert!(RasterStack::new(vec![]).is_err());
        let mut b = a.clone();
        b.set(2, 1, 7.0);
        let stack = RasterStack::new(vec![a, b]).unwrap();
        assert_eq!(stack.band_count(), 2);
        assert_eq!(stack.layers()[1].get(2, 1), 7.0);
        assert_eq!(stack.cell_values(7), vec![0.0, 7.0]);
        assert_eq!(stack.cell_values(4).len(), 2);
    }

    #[test]
    fn stack_deserializes_from_layer_array() {
        let layer = RasterLayer::unit(2, 1, Crs::Wgs84);
        let json = serde_json::to_string(&vec![layer.clone(), layer]).unwrap();
        let stack: RasterStack = serde_json::from_str(&json).unwrap();
        assert_eq!(stack.cell_count(), 2);
        let bad = r#"[{"data":[1.0],"width":2,"height":1,"min_x":0,"max_x":2,"min_y":0,"max_y":1}]"#;
        assert!(serde_json::from_str::<RasterStack>(bad).is_err());
    }

    #[test]
    fn bare_layer_document_is_validated() {
        let short = r#"{"data":[1,2],"width":2,"height":2,"min_x":0,"max_x":2,"min_y":0,"max_y":2,"crs":"wgs84"}"#;
        assert!(serde_json::from_str::<RasterLayer>(short).is_err());
        let ok = r#"{"data":[1,2,3,4],"width":2,"height":2,"min_x":0,"max_x":2,"min_y":0,"max_y":2,"crs":"wgs84"}"#;
        let layer: RasterLayer = serde_json::from_str(ok).unwrap();
        assert_eq!(layer.get(1, 0), 3.0);
    }

    #[test]
    fn layer_document_requires_crs() {
        let no_crs = r#"{"data":[1,2,3,4],"width":2,"height":2,"min_x":0,"max_x":2,"min_y":0,"max_y":2}"#;
        let err = serde_json::from_str::<RasterLayer>(no_crs).unwrap_err();
        assert!(err.to_string().contains("crs"), "{err}");
    }

    #[test]
    fn hand_built_layers_validate_on_demand() {
        let empty = RasterLayer::new(0, 2, 0.0, 1.0, 0.0, 1.0, Crs::Wgs84, 0.0);
        assert!(RasterSource::validate(&empty).unwrap_err().is_invalid_input());
        let mut ragged = RasterLayer::unit(2, 2, Crs::Wgs84);
        ragged.data.truncate(3);
        assert!(RasterSource::validate(&ragged).is_err());
        let flipped = RasterLayer::new(2, 2, 1.0, 0.0, 0.0, 1.0, Crs::Wgs84, 0.0);
        assert!(RasterSource::validate(&flipped).is_err());
        assert!(RasterSource::validate(&RasterLayer::unit(2, 2, Crs::Wgs84)).is_ok());
    }
}
