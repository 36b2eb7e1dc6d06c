use geo::{BoundingRect, Centroid, Coord, Intersects, MultiPolygon, Point};
use rstar::{RTree, AABB};

use crate::geom::BoundingBox;

/// A collection of MultiPolygons in lon/lat with an R-tree over their bounding boxes.
#[derive(Debug, Clone)]
pub struct Geometries {
    shapes: Vec<MultiPolygon<f64>>,
    rtree: RTree<BoundingBox>,
}

impl Geometries {
    /// Construct a Geometries object from a vector of MultiPolygons.
    /// Empty shapes are kept (so indices line up with attribute rows) but never indexed.
    pub fn new(shapes: Vec<MultiPolygon<f64>>) -> Self {
        Self {
            rtree: RTree::bulk_load(
                shapes.iter().enumerate()
                    .filter_map(|(i, shape)| shape.bounding_rect().map(|bbox| BoundingBox::new(i, bbox)))
                    .collect()
            ),
            shapes,
        }
    }

    /// Get a reference to the list of MultiPolygons.
    #[inline] pub fn shapes(&self) -> &[MultiPolygon<f64>] { &self.shapes }

    /// Indices of shapes that intersect `area`, in ascending order.
    pub fn intersecting(&self, area: &MultiPolygon<f64>) -> Vec<usize> {
        let Some(rect) = area.bounding_rect() else { return Vec::new() };
        let envelope = AABB::from_corners(rect.min().into(), rect.max().into());

        let mut hits: Vec<usize> = self.rtree.locate_in_envelope_intersecting(&envelope)
            .map(|bbox| bbox.idx())
            .filter(|&idx| self.shapes[idx].intersects(area))
            .collect();
        hits.sort_unstable();
        hits
    }

    /// Mean of the centroids of the given shapes, skipping empty ones.
    pub fn mean_centroid(&self, indices: impl IntoIterator<Item = usize>) -> Option<Point<f64>> {
        let (sum, count) = indices.into_iter()
            .filter_map(|idx| self.shapes.get(idx).and_then(|shape| shape.centroid()))
            .fold((Coord { x: 0.0, y: 0.0 }, 0usize), |(sum, n), p| (sum + p.0, n + 1));
        (count > 0).then(|| Point::new(sum.x / count as f64, sum.y / count as f64))
    }
}

#[cfg(test)]
mod tests {
    use geo::{polygon, MultiPolygon};

    use super::*;

    fn square(x0: f64, y0: f64, side: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: x0, y: y0), (x: x0 + side, y: y0), (x: x0 + side, y: y0 + side), (x: x0, y: y0 + side), (x: x0, y: y0),
        ]])
    }

    #[test]
    fn intersecting_uses_exact_geometry_not_just_boxes() {
        // An L-shaped area whose bounding box covers (2,2) but whose geometry does not.
        let l_shape = MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0), (x: 3.0, y: 0.0), (x: 3.0, y: 1.0), (x: 1.0, y: 1.0), (x: 1.0, y: 3.0), (x: 0.0, y: 3.0), (x: 0.0, y: 0.0),
        ]]);
        let geoms = Geometries::new(vec![
            square(0.2, 0.2, 0.5),  // inside
            square(2.2, 2.2, 0.5),  // bbox hit only
            square(2.5, 0.5, 1.0),  // overlaps the foot of the L
            square(10.0, 10.0, 1.0),
        ]);

        assert_eq!(geoms.intersecting(&l_shape), vec![0, 2]);
    }

    #[test]
    fn empty_shapes_are_skipped() {
        let geoms = Geometries::new(vec![MultiPolygon(vec![]), square(0.0, 0.0, 2.0)]);
        assert_eq!(geoms.shapes().len(), 2);
        assert_eq!(geoms.intersecting(&square(1.0, 1.0, 0.5)), vec![1]);

        let centroid = geoms.mean_centroid(0..2).unwrap();
        assert_eq!((centroid.x(), centroid.y()), (1.0, 1.0));
        assert!(geoms.mean_centroid([0]).is_none());
    }
}
