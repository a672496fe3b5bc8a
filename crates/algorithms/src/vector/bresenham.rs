//! Bresenham line drawing onto a georeferenced grid

use geo::{Coord, LineString};
use geoseries_core::raster::GeoReference;

/// Integer cells on the segment between two cells, both ends included
pub fn line_cells(from: (i64, i64), to: (i64, i64)) -> Vec<(i64, i64)> {
    let (mut x, mut y) = from;
    let (x1, y1) = to;
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut cells = Vec::with_capacity((dx - dy) as usize + 1);
    loop {
        cells.push((x, y));
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    cells
}

/// Traces coordinate paths onto the cells of a grid
#[derive(Debug, Clone, Copy)]
pub struct Bresenham<'a> {
    georef: &'a GeoReference,
}

impl<'a> Bresenham<'a> {
    pub fn new(georef: &'a GeoReference) -> Self {
        Self { georef }
    }

    /// In-grid pixels `(col, row)` touched by the path through `coords`.
    ///
    /// Segments are traced between consecutive vertices after clipping them
    /// to the grid padded by one cell, so the walk never leaves that frame.
    /// Cells outside the grid are dropped, and a pixel shared by two
    /// segments appears twice.
    pub fn rasterize(&self, coords: &[Coord<f64>]) -> Vec<(usize, usize)> {
        let transform = &self.georef.transform;
        let points: Vec<(f64, f64)> = coords
            .iter()
            .map(|c| transform.geo_to_pixel(c.x, c.y))
            .filter(|(col, row)| col.is_finite() && row.is_finite())
            .collect();

        let mut out = Vec::new();
        match points.as_slice() {
            [] => {}
            [single] => self.push_inside(&mut out, [cell_of(*single)]),
            _ => {
                let frame = self.frame();
                for seg in points.windows(2) {
                    if let Some((a, b)) = clip_segment(seg[0], seg[1], &frame) {
                        self.push_inside(&mut out, line_cells(cell_of(a), cell_of(b)));
                    }
                }
            }
        }
        out
    }

    /// [`Bresenham::rasterize`] over the vertices of a ring or line
    pub fn rasterize_line(&self, line: &LineString<f64>) -> Vec<(usize, usize)> {
        self.rasterize(&line.0)
    }

    fn push_inside(&self, out: &mut Vec<(usize, usize)>, cells: impl IntoIterator<Item = (i64, i64)>) {
        out.extend(
            cells
                .into_iter()
                .filter(|&(c, r)| self.georef.contains_pixel(c, r))
                .map(|(c, r)| (c as usize, r as usize)),
        );
    }

    /// Frame segments are clipped to: the grid grown by one cell
    fn frame(&self) -> Frame {
        Frame {
            min_col: -1.0,
            min_row: -1.0,
            max_col: self.georef.cols as f64 + 1.0,
            max_row: self.georef.rows as f64 + 1.0,
        }
    }
}

/// Rectangle in fractional pixel space
#[derive(Debug, Clone, Copy)]
struct Frame {
    min_col: f64,
    min_row: f64,
    max_col: f64,
    max_row: f64,
}

/// Cohen-Sutherland region codes
const INSIDE: u8 = 0b0000;
const LEFT: u8 = 0b0001;
const RIGHT: u8 = 0b0010;
const ABOVE: u8 = 0b0100;
const BELOW: u8 = 0b1000;

fn outcode((col, row): (f64, f64), frame: &Frame) -> u8 {
    let mut code = INSIDE;
    if col < frame.min_col {
        code |= LEFT;
    }
    if col > frame.max_col {
        code |= RIGHT;
    }
    if row < frame.min_row {
        code |= ABOVE;
    }
    if row > frame.max_row {
        code |= BELOW;
    }
    code
}

/// Part of segment `p0`-`p1` inside `frame`, `None` when it misses
fn clip_segment(
    mut p0: (f64, f64),
    mut p1: (f64, f64),
    frame: &Frame,
) -> Option<((f64, f64), (f64, f64))> {
    let mut code0 = outcode(p0, frame);
    let mut code1 = outcode(p1, frame);

    loop {
        if (code0 | code1) == INSIDE {
            return Some((p0, p1));
        }
        if (code0 & code1) != 0 {
            return None;
        }

        let code_out = if code0 != INSIDE { code0 } else { code1 };
        let (dc, dr) = (p1.0 - p0.0, p1.1 - p0.1);

        let point = if code_out & BELOW != 0 {
            let t = (frame.max_row - p0.1) / dr;
            (p0.0 + t * dc, frame.max_row)
        } else if code_out & ABOVE != 0 {
            let t = (frame.min_row - p0.1) / dr;
            (p0.0 + t * dc, frame.min_row)
        } else if code_out & RIGHT != 0 {
            let t = (frame.max_col - p0.0) / dc;
            (frame.max_col, p0.1 + t * dr)
        } else {
            let t = (frame.min_col - p0.0) / dc;
            (frame.min_col, p0.1 + t * dr)
        };

        if code_out == code0 {
            p0 = point;
            code0 = outcode(p0, frame);
        } else {
            p1 = point;
            code1 = outcode(p1, frame);
        }
    }
}

/// Integer cell containing fractional pixel coordinates
fn cell_of((col, row): (f64, f64)) -> (i64, i64) {
    (col.floor() as i64, row.floor() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoseries_core::raster::GeoTransform;

    #[test]
    fn test_horizontal_and_diagonal() {
        assert_eq!(line_cells((0, 0), (3, 0)), vec![(0, 0), (1, 0), (2, 0), (3, 0)]);
        assert_eq!(line_cells((2, 2), (0, 0)), vec![(2, 2), (1, 1), (0, 0)]);
        assert_eq!(line_cells((1, 1), (1, 1)), vec![(1, 1)]);
    }

    #[test]
    fn test_steep_line_is_connected() {
        let cells = line_cells((0, 0), (2, 7));
        assert_eq!(cells.len(), 8);
        assert_eq!(cells.first(), Some(&(0, 0)));
        assert_eq!(cells.last(), Some(&(2, 7)));
        for pair in cells.windows(2) {
            assert!((pair[1].0 - pair[0].0).abs() <= 1);
            assert_eq!(pair[1].1 - pair[0].1, 1);
        }
    }

    #[test]
    fn test_rasterize_clips_to_grid() {
        let georef = GeoReference::new(4, 4, GeoTransform::new(0.0, 4.0, 1.0, -1.0));
        let tracer = Bresenham::new(&georef);
        // y = 2.5 lies in row 1; x runs from -2 to 6
        let cells = tracer.rasterize(&[Coord { x: -2.0, y: 2.5 }, Coord { x: 6.0, y: 2.5 }]);
        assert_eq!(cells, vec![(0, 1), (1, 1), (2, 1), (3, 1)]);

        let outside = tracer.rasterize(&[Coord { x: 10.0, y: 1.0 }, Coord { x: 12.0, y: 3.0 }]);
        assert!(outside.is_empty());
    }

    #[test]
    fn test_far_vertex_is_clipped() {
        let georef = GeoReference::new(10, 10, GeoTransform::new(0.0, 10.0, 1.0, -1.0));
        let tracer = Bresenham::new(&georef);
        // row 5 from col 5 out to a vertex 1e13 cells away
        let cells = tracer.rasterize(&[Coord { x: 5.5, y: 4.5 }, Coord { x: 1e13, y: 4.5 }]);
        assert_eq!(cells, vec![(5, 5), (6, 5), (7, 5), (8, 5), (9, 5)]);

        // both ends far away on opposite sides, crossing the whole grid
        let cells = tracer.rasterize(&[Coord { x: -1e12, y: 7.5 }, Coord { x: 1e12, y: 7.5 }]);
        assert_eq!(cells.len(), 10);
        assert!(cells.iter().all(|&(_, row)| row == 2));
    }
}
