use std::collections::{BTreeMap, BTreeSet};

use crate::Point;
use crate::geom::bboxes::BBox2;

/// Uniform planar grid mapping cells to the items whose bounding box overlaps them.
///
/// Query results are ordered by item index so that callers iterate
/// deterministically.
#[derive(Debug, Clone, Default)]
pub struct GridIndex {
    cells: BTreeMap<(i64, i64), Vec<usize>>,
    step: f64,
    /// Smallest and largest occupied cell coordinates.
    occupied: Option<((i64, i64), (i64, i64))>,
}

impl GridIndex {
    /// Minimum cell size in metres.
    const MIN_STEP: f64 = 10.0;
    /// Target number of cells along the largest side of the indexed area.
    const TARGET_CELLS: f64 = 256.0;

    pub fn new(bboxes: &[BBox2]) -> Self {
        let step = match bboxes.iter().copied().reduce(|mut acc, b| {
            acc.xmin = acc.xmin.min(b.xmin);
            acc.ymin = acc.ymin.min(b.ymin);
            acc.xmax = acc.xmax.max(b.xmax);
            acc.ymax = acc.ymax.max(b.ymax);
            acc
        }) {
            Some(all) => {
                let extent = (all.xmax - all.xmin).max(all.ymax - all.ymin);
                (extent / Self::TARGET_CELLS).max(Self::MIN_STEP)
            }
            None => Self::MIN_STEP,
        };
        Self::with_step(bboxes, step)
    }

    pub fn with_step(bboxes: &[BBox2], step: f64) -> Self {
        let mut cells: BTreeMap<(i64, i64), Vec<usize>> = BTreeMap::new();
        for (idx, bbox) in bboxes.iter().enumerate() {
            let (imin, jmin) = cell_of(bbox.xmin, bbox.ymin, step);
            let (imax, jmax) = cell_of(bbox.xmax, bbox.ymax, step);
            for i in imin..=imax {
                for j in jmin..=jmax {
                    cells.entry((i, j)).or_default().push(idx);
                }
            }
        }
        let occupied = cells.keys().fold(None, |acc, &(i, j)| match acc {
            None => Some(((i, j), (i, j))),
            Some(((imin, jmin), (imax, jmax))) => {
                Some(((imin.min(i), jmin.min(j)), (imax.max(i), jmax.max(j))))
            }
        });
        Self {
            cells,
            step,
            occupied,
        }
    }

    /// Items registered in the cell containing `p`.
    pub fn find_at(&self, p: &Point) -> &[usize] {
        self.cells
            .get(&cell_of(p.x, p.y, self.step))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Items whose cells overlap the given rectangle.
    ///
    /// Only the occupied part of the grid is visited, however large the rectangle.
    pub fn find_in_bbox(&self, bbox: &BBox2) -> BTreeSet<usize> {
        let mut result = BTreeSet::new();
        let Some(((omin_i, omin_j), (omax_i, omax_j))) = self.occupied else {
            return result;
        };
        let (imin, jmin) = cell_of(bbox.xmin, bbox.ymin, self.step);
        let (imax, jmax) = cell_of(bbox.xmax, bbox.ymax, self.step);
        let (imin, imax) = (imin.max(omin_i), imax.min(omax_i));
        let (jmin, jmax) = (jmin.max(omin_j), jmax.min(omax_j));
        for i in imin..=imax {
            for j in jmin..=jmax {
                if let Some(items) = self.cells.get(&(i, j)) {
                    result.extend(items);
                }
            }
        }
        result
    }

    /// Items whose cells are traversed by the planar segment p1-p2.
    pub fn find_along_segment(&self, p1: &Point, p2: &Point) -> BTreeSet<usize> {
        let mut result = BTreeSet::new();
        let step = self.step;
        let (xa, xb) = (p1.x.min(p2.x), p1.x.max(p2.x));
        let (ia, ib) = (cell_of(xa, 0.0, step).0, cell_of(xb, 0.0, step).0);
        let dx = p2.x - p1.x;

        for i in ia..=ib {
            // Part of the segment inside the column [x0, x1]
            let x0 = (i as f64 * step).max(xa);
            let x1 = ((i + 1) as f64 * step).min(xb);
            let (y0, y1) = if dx.abs() < f64::EPSILON {
                (p1.y, p2.y)
            } else {
                (
                    p1.y + (x0 - p1.x) / dx * (p2.y - p1.y),
                    p1.y + (x1 - p1.x) / dx * (p2.y - p1.y),
                )
            };
            let ja = cell_of(0.0, y0.min(y1), step).1;
            let jb = cell_of(0.0, y0.max(y1), step).1;
            for j in ja..=jb {
                if let Some(items) = self.cells.get(&(i, j)) {
                    result.extend(items);
                }
            }
        }
        result
    }
}

fn cell_of(x: f64, y: f64, step: f64) -> (i64, i64) {
    ((x / step).floor() as i64, (y / step).floor() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, size: f64) -> BBox2 {
        BBox2 {
            xmin: x,
            ymin: y,
            xmax: x + size,
            ymax: y + size,
        }
    }

    #[test]
    fn test_find_at() {
        let index = GridIndex::with_step(&[square(0.0, 0.0, 5.0), square(20.0, 20.0, 5.0)], 10.0);
        assert_eq!(index.find_at(&Point::new(2.0, 2.0, 0.0)), &[0]);
        assert!(index.find_at(&Point::new(-50.0, 2.0, 0.0)).is_empty());
    }

    #[test]
    fn test_find_along_segment() {
        let bboxes = vec![
            square(0.0, 0.0, 5.0),
            square(40.0, 40.0, 5.0),
            square(40.0, 0.0, 5.0),
        ];
        let index = GridIndex::with_step(&bboxes, 10.0);
        // Diagonal passes over the first two boxes only
        let found = index.find_along_segment(&Point::new(1.0, 1.0, 0.0), &Point::new(44.0, 44.0, 0.0));
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec![0, 1]);
        // Vertical segment
        let found = index.find_along_segment(&Point::new(42.0, -5.0, 0.0), &Point::new(42.0, 50.0, 0.0));
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_find_in_bbox() {
        let index = GridIndex::new(&[square(0.0, 0.0, 5.0), square(100.0, 100.0, 5.0)]);
        let found = index.find_in_bbox(&square(-1.0, -1.0, 3.0));
        assert!(found.contains(&0));
        assert!(!found.contains(&1));
    }

    #[test]
    fn test_find_in_huge_bbox() {
        let index = GridIndex::new(&[square(0.0, 0.0, 5.0), square(100.0, 100.0, 5.0)]);
        let everywhere = BBox2 {
            xmin: -1e15,
            ymin: -1e15,
            xmax: 1e15,
            ymax: 1e15,
        };
        assert_eq!(index.find_in_bbox(&everywhere).into_iter().collect::<Vec<_>>(), vec![0, 1]);
        let beside = square(1e12, 1e12, 1e9);
        assert!(index.find_in_bbox(&beside).is_empty());
        assert!(GridIndex::new(&[]).find_in_bbox(&everywhere).is_empty());
    }
}
