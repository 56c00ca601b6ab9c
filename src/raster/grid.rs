use ndarray::{s, Array2};

use crate::crs::Crs;

/// Affine georeferencing for a north-up grid with "upper" row origin:
/// `(origin_x, origin_y)` is the outer corner of cell `(0, 0)` and
/// `pixel_height` is negative, so row indices grow southward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GridTransform {
    /// World coordinate of the center of cell `(row, col)`.
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y + (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Fractional pixel coordinate (row, col) of a world coordinate.
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (y - self.origin_y) / self.pixel_height,
            (x - self.origin_x) / self.pixel_width,
        )
    }
}

/// One timestamp's raster: grid, georeferencing, CRS and no-data sentinel.
///
/// This is the in-memory "grid + geotransform + CRS" container the clipper
/// masks against; nothing ever touches the filesystem.
#[derive(Debug, Clone)]
pub struct Raster {
    data: Array2<f64>,
    transform: GridTransform,
    crs: Crs,
    nodata: Option<f64>,
}

impl Raster {
    pub fn new(data: Array2<f64>, transform: GridTransform, crs: Crs, nodata: Option<f64>) -> Self {
        Self {
            data,
            transform,
            crs,
            nodata,
        }
    }

    /// Build a raster from a south-up grid (row 0 southmost, the RADOLAN
    /// composite convention) by flipping it to the "upper" row origin.
    pub fn from_south_up(
        grid: Array2<f64>,
        transform: GridTransform,
        crs: Crs,
        nodata: Option<f64>,
    ) -> Self {
        let flipped = grid.slice(s![..;-1, ..]).to_owned();
        Self::new(flipped, transform, crs, nodata)
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn transform(&self) -> &GridTransform {
        &self.transform
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    /// Extent as (min-x, min-y, max-x, max-y) in the native CRS.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let t = &self.transform;
        let max_x = t.origin_x + self.width() as f64 * t.pixel_width;
        let min_y = t.origin_y + self.height() as f64 * t.pixel_height;
        (t.origin_x, min_y, max_x, t.origin_y)
    }
}

/// PROJ definition of the DWD RADOLAN polar stereographic projection.
pub const RADOLAN_PROJ: &str =
    "+proj=stere +lat_0=90 +lat_ts=60 +lon_0=10 +a=6370040 +b=6370040 +units=m +no_defs";

/// Lower-left corner of the 900x900 national composite, meters.
const RADOLAN_LL_X: f64 = -523_462.2;
const RADOLAN_LL_Y: f64 = -4_658_644.7;
/// Composite cell size, meters.
const RADOLAN_CELL: f64 = 1000.0;

pub fn radolan_crs() -> Crs {
    Crs::custom("dwd-radolan", RADOLAN_PROJ)
}

/// Georeferencing for an upper-origin RADOLAN composite of the given shape.
pub fn radolan_transform(rows: usize, _cols: usize) -> GridTransform {
    GridTransform {
        origin_x: RADOLAN_LL_X,
        origin_y: RADOLAN_LL_Y + rows as f64 * RADOLAN_CELL,
        pixel_width: RADOLAN_CELL,
        pixel_height: -RADOLAN_CELL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_center_and_back() {
        let t = GridTransform {
            origin_x: 0.0,
            origin_y: 100.0,
            pixel_width: 10.0,
            pixel_height: -10.0,
        };
        assert_eq!(t.pixel_center(0, 0), (5.0, 95.0));
        assert_eq!(t.pixel_center(9, 9), (95.0, 5.0));
        let (row, col) = t.world_to_pixel(95.0, 5.0);
        assert!((row - 9.5).abs() < 1e-12);
        assert!((col - 9.5).abs() < 1e-12);
    }

    #[test]
    fn south_up_grid_is_flipped() {
        let grid = Array2::from_shape_fn((3, 2), |(r, c)| (r * 2 + c) as f64);
        let raster = Raster::from_south_up(
            grid,
            radolan_transform(3, 2),
            radolan_crs(),
            Some(-9999.0),
        );
        // row 0 now holds what was the northmost (last) row
        assert_eq!(raster.data()[[0, 0]], 4.0);
        assert_eq!(raster.data()[[2, 0]], 0.0);
    }

    #[test]
    fn radolan_bounds_are_consistent() {
        let raster = Raster::new(
            Array2::zeros((900, 900)),
            radolan_transform(900, 900),
            radolan_crs(),
            None,
        );
        let (min_x, min_y, max_x, max_y) = raster.bounds();
        assert_eq!(min_x, RADOLAN_LL_X);
        assert!((min_y - RADOLAN_LL_Y).abs() < 1e-6);
        assert!((max_x - (RADOLAN_LL_X + 900_000.0)).abs() < 1e-6);
        assert!((max_y - (RADOLAN_LL_Y + 900_000.0)).abs() < 1e-6);
    }
}
