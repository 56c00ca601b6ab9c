//! Mask-and-crop a raster against a catchment polygon.

use geo::{BoundingRect, Contains, MultiPolygon, Point};
use ndarray::{s, Array2};

use crate::catchment::Catchment;
use crate::error::Result;
use crate::raster::{MaskedGrid, Raster};

/// Clip one raster to one catchment.
///
/// The catchment polygon is reprojected into the raster's CRS, the raster is
/// cropped to the minimal pixel window covering the polygon's bounds, and a
/// cell stays valid only when its center lies inside the polygon and its
/// value is not the no-data sentinel. A polygon entirely outside the raster
/// extent produces a grid with zero valid cells.
pub fn clip_to_catchment(catchment: &Catchment, raster: &Raster) -> Result<MaskedGrid> {
    let shape = catchment.transform_to(raster.crs())?;
    let Some(rect) = shape.bounding_rect() else {
        return Ok(MaskedGrid::all_invalid(0, 0));
    };

    let Some((rows, cols)) = pixel_window(raster, (rect.min().x, rect.min().y, rect.max().x, rect.max().y))
    else {
        return Ok(MaskedGrid::all_invalid(0, 0));
    };

    let data = raster.data().slice(s![rows.0..rows.1, cols.0..cols.1]).to_owned();
    let valid = build_mask(raster, &shape, rows, cols);
    MaskedGrid::new(data, valid)
}

/// Clamp the polygon's bounds to a half-open pixel window; `None` when the
/// bounds and the raster extent are disjoint.
fn pixel_window(
    raster: &Raster,
    bounds: (f64, f64, f64, f64),
) -> Option<((usize, usize), (usize, usize))> {
    let t = raster.transform();
    let (min_x, min_y, max_x, max_y) = bounds;

    // with a negative pixel height the y maximum maps to the smallest row
    let (row_top, col_left) = t.world_to_pixel(min_x, max_y);
    let (row_bottom, col_right) = t.world_to_pixel(max_x, min_y);

    let row_start = row_top.floor().max(0.0) as usize;
    let row_end = (row_bottom.ceil().min(raster.height() as f64)) as usize;
    let col_start = col_left.floor().max(0.0) as usize;
    let col_end = (col_right.ceil().min(raster.width() as f64)) as usize;

    if row_top >= raster.height() as f64
        || row_bottom <= 0.0
        || col_left >= raster.width() as f64
        || col_right <= 0.0
        || row_start >= row_end
        || col_start >= col_end
    {
        return None;
    }
    Some(((row_start, row_end), (col_start, col_end)))
}

fn build_mask(
    raster: &Raster,
    shape: &MultiPolygon<f64>,
    rows: (usize, usize),
    cols: (usize, usize),
) -> Array2<bool> {
    let t = raster.transform();
    let nodata = raster.nodata();
    Array2::from_shape_fn((rows.1 - rows.0, cols.1 - cols.0), |(r, c)| {
        let row = rows.0 + r;
        let col = cols.0 + c;
        let (x, y) = t.pixel_center(row, col);
        if !shape.contains(&Point::new(x, y)) {
            return false;
        }
        match nodata {
            Some(sentinel) => raster.data()[[row, col]] != sentinel,
            None => true,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::Crs;
    use crate::raster::GridTransform;
    use crate::vector::Feature;
    use geo::polygon;
    use std::collections::BTreeMap;

    /// 10x10 unit grid, origin upper-left at (0, 10), value = row * 10 + col.
    fn test_raster(nodata: Option<f64>) -> Raster {
        Raster::new(
            Array2::from_shape_fn((10, 10), |(r, c)| (r * 10 + c) as f64),
            GridTransform {
                origin_x: 0.0,
                origin_y: 10.0,
                pixel_width: 1.0,
                pixel_height: -1.0,
            },
            Crs::Epsg(25832),
            nodata,
        )
    }

    fn catchment_with(shape: geo::Polygon<f64>) -> Catchment {
        Catchment::from_feature(
            Feature {
                geometry: MultiPolygon(vec![shape]),
                properties: BTreeMap::new(),
            },
            Some(Crs::Epsg(25832)),
        )
    }

    #[test]
    fn square_clip_crops_and_masks() {
        // covers cell centers with 2 <= x <= 5, 2 <= y <= 5
        let ezg = catchment_with(polygon![
            (x: 2.0, y: 2.0), (x: 5.0, y: 2.0), (x: 5.0, y: 5.0), (x: 2.0, y: 5.0),
        ]);
        let clipped = clip_to_catchment(&ezg, &test_raster(None)).unwrap();
        // window is the 3x3 block of cells whose centers fall inside
        assert_eq!(clipped.shape(), (3, 3));
        assert_eq!(clipped.valid_count(), 9);
        // upper-left cell of the window: y center 4.5 -> row 5, x center 2.5 -> col 2
        assert_eq!(clipped.data()[[0, 0]], 52.0);
    }

    #[test]
    fn cells_outside_polygon_are_invalid() {
        // triangle inside a 4x4 window leaves corners invalid
        let ezg = catchment_with(polygon![
            (x: 2.0, y: 2.0), (x: 6.0, y: 2.0), (x: 2.0, y: 6.0),
        ]);
        let clipped = clip_to_catchment(&ezg, &test_raster(None)).unwrap();
        let (rows, cols) = clipped.shape();
        assert!(clipped.valid_count() > 0);
        assert!(clipped.valid_count() < rows * cols);
    }

    #[test]
    fn nodata_cells_are_invalid() {
        let mut raster = test_raster(Some(-9999.0));
        // poke a sentinel into the clip window (row 5, col 2 = value 52)
        let ezg = catchment_with(polygon![
            (x: 2.0, y: 2.0), (x: 5.0, y: 2.0), (x: 5.0, y: 5.0), (x: 2.0, y: 5.0),
        ]);
        raster = Raster::new(
            {
                let mut data = raster.data().clone();
                data[[5, 2]] = -9999.0;
                data
            },
            *raster.transform(),
            raster.crs().clone(),
            raster.nodata(),
        );
        let clipped = clip_to_catchment(&ezg, &raster).unwrap();
        assert_eq!(clipped.shape(), (3, 3));
        assert_eq!(clipped.valid_count(), 8);
        assert!(!clipped.mask()[[0, 0]]);
    }

    #[test]
    fn polygon_outside_extent_is_all_invalid() {
        let ezg = catchment_with(polygon![
            (x: 100.0, y: 100.0), (x: 110.0, y: 100.0), (x: 110.0, y: 110.0), (x: 100.0, y: 110.0),
        ]);
        let clipped = clip_to_catchment(&ezg, &test_raster(None)).unwrap();
        assert_eq!(clipped.valid_count(), 0);
    }

    #[test]
    fn polygon_overlapping_edge_is_clamped() {
        let ezg = catchment_with(polygon![
            (x: -5.0, y: -5.0), (x: 2.0, y: -5.0), (x: 2.0, y: 2.0), (x: -5.0, y: 2.0),
        ]);
        let clipped = clip_to_catchment(&ezg, &test_raster(None)).unwrap();
        let (rows, cols) = clipped.shape();
        assert!(rows <= 10 && cols <= 10);
        assert!(clipped.valid_count() > 0);
    }
}
