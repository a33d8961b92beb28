//! Vectorization of binary risk masks
//!
//! Risk reporting wants polygons, not pixels: each 4-connected component
//! of flagged pixels becomes a GeoJSON feature whose exterior ring follows
//! the pixel-edge boundary. Interior holes are not emitted; the consumers
//! (map overlays, per-date summaries) use outlines and counts only.

use crate::statistics::summary::cell_area_m2;
use ndarray::Array2;
use pestwatch_core::raster::Raster;
use pestwatch_core::{Error, Result};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::path::Path;

/// One 4-connected component of flagged pixels
#[derive(Debug, Clone)]
pub struct Component {
    /// (row, col) of every member pixel
    pub pixels: Vec<(usize, usize)>,
    /// Topmost-leftmost member pixel, the trace anchor
    pub anchor: (usize, usize),
}

impl Component {
    /// Number of member pixels
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Whether the component is empty (never produced by labeling)
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

/// Label the 4-connected components of a binary mask.
///
/// Returns the components in discovery order (row-major by anchor).
pub fn connected_components(mask: &Raster<u8>) -> Vec<Component> {
    let (rows, cols) = mask.shape();
    let mut labels: Array2<u32> = Array2::zeros((rows, cols));
    let mut components = Vec::new();

    for row in 0..rows {
        for col in 0..cols {
            let flagged = unsafe { mask.get_unchecked(row, col) } == 1;
            if !flagged || labels[(row, col)] != 0 {
                continue;
            }

            let id = components.len() as u32 + 1;
            let mut pixels = Vec::new();
            let mut queue = VecDeque::new();
            labels[(row, col)] = id;
            queue.push_back((row, col));

            while let Some((r, c)) = queue.pop_front() {
                pixels.push((r, c));
                let mut visit = |nr: usize, nc: usize| {
                    let flagged = unsafe { mask.get_unchecked(nr, nc) } == 1;
                    if flagged && labels[(nr, nc)] == 0 {
                        labels[(nr, nc)] = id;
                        queue.push_back((nr, nc));
                    }
                };
                if r > 0 {
                    visit(r - 1, c);
                }
                if r + 1 < rows {
                    visit(r + 1, c);
                }
                if c > 0 {
                    visit(r, c - 1);
                }
                if c + 1 < cols {
                    visit(r, c + 1);
                }
            }

            components.push(Component {
                anchor: (row, col),
                pixels,
            });
        }
    }

    components
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dir {
    Right,
    Down,
    Left,
    Up,
}

impl Dir {
    fn turn_right(self) -> Dir {
        match self {
            Dir::Right => Dir::Down,
            Dir::Down => Dir::Left,
            Dir::Left => Dir::Up,
            Dir::Up => Dir::Right,
        }
    }

    fn turn_left(self) -> Dir {
        self.turn_right().turn_right().turn_right()
    }

    fn advance(self, vertex: (isize, isize)) -> (isize, isize) {
        let (r, c) = vertex;
        match self {
            Dir::Right => (r, c + 1),
            Dir::Down => (r + 1, c),
            Dir::Left => (r, c - 1),
            Dir::Up => (r - 1, c),
        }
    }

    /// Pixels forward-right and forward-left of a vertex, relative to
    /// this direction (row axis points down).
    fn look_ahead(self, vertex: (isize, isize)) -> ((isize, isize), (isize, isize)) {
        let (r, c) = vertex;
        match self {
            Dir::Right => ((r, c), (r - 1, c)),
            Dir::Down => ((r, c - 1), (r, c)),
            Dir::Left => ((r - 1, c - 1), (r, c - 1)),
            Dir::Up => ((r - 1, c), (r - 1, c - 1)),
        }
    }
}

/// Trace the exterior ring of a component as pixel-corner vertices.
///
/// Walks the pixel-edge boundary keeping the component on the right, so
/// the ring is clockwise in grid coordinates (counterclockwise once the
/// y axis flips to geographic north-up). The returned ring is closed
/// (first vertex repeated at the end).
pub fn component_outline(component: &Component, mask: &Raster<u8>) -> Result<Vec<(usize, usize)>> {
    let (rows, cols) = mask.shape();
    // Membership must be per-component: a diagonally-touching neighbor
    // component would otherwise be swallowed by the trace.
    let members: std::collections::HashSet<(usize, usize)> =
        component.pixels.iter().copied().collect();
    let inside = |p: (isize, isize)| -> bool {
        let (r, c) = p;
        if r < 0 || c < 0 || r as usize >= rows || c as usize >= cols {
            return false;
        }
        members.contains(&(r as usize, c as usize))
    };

    // The anchor's top-left corner touches exactly one member pixel (row-major
    // scanning guarantees nothing above or left of it), so the trace passes
    // through the start vertex exactly once.
    let (ar, ac) = component.anchor;
    let start = (ar as isize, ac as isize);

    let mut ring = vec![start];
    let mut vertex = start;
    let mut dir = Dir::Right;
    let cap = 4 * (rows + 1) * (cols + 1);

    loop {
        let (forward_right, forward_left) = dir.look_ahead(vertex);
        dir = if inside(forward_right) && inside(forward_left) {
            dir.turn_left()
        } else if inside(forward_right) {
            dir
        } else {
            dir.turn_right()
        };
        vertex = dir.advance(vertex);

        if vertex == start {
            break;
        }
        ring.push(vertex);

        if ring.len() > cap {
            return Err(Error::Algorithm("boundary trace did not close".into()));
        }
    }

    ring.push(start);
    Ok(ring
        .into_iter()
        .map(|(r, c)| (r as usize, c as usize))
        .collect())
}

/// Convert a risk mask to a GeoJSON FeatureCollection.
///
/// One feature per 4-connected component; geometry is the exterior
/// polygon in the mask's geographic coordinates, properties carry the
/// pixel count and area in hectares.
pub fn mask_to_geojson(mask: &Raster<u8>) -> Result<Value> {
    let components = connected_components(mask);
    let gt = mask.transform();
    let cell_ha = cell_area_m2(mask) / 10_000.0;

    let mut features = Vec::with_capacity(components.len());
    for component in &components {
        let ring = component_outline(component, mask)?;
        let coords: Vec<Value> = ring
            .iter()
            .map(|&(r, c)| {
                let (x, y) = gt.pixel_to_geo_corner(c, r);
                json!([x, y])
            })
            .collect();

        features.push(json!({
            "type": "Feature",
            "geometry": {
                "type": "Polygon",
                "coordinates": [coords],
            },
            "properties": {
                "pixels": component.len(),
                "area_ha": component.len() as f64 * cell_ha,
            },
        }));
    }

    Ok(json!({
        "type": "FeatureCollection",
        "features": features,
    }))
}

/// Write a risk mask's polygons as a GeoJSON file.
pub fn write_geojson<P: AsRef<Path>>(mask: &Raster<u8>, path: P) -> Result<()> {
    let collection = mask_to_geojson(mask)?;
    let text = serde_json::to_string_pretty(&collection)
        .map_err(|e| Error::Other(format!("serializing GeoJSON: {}", e)))?;
    std::fs::write(path.as_ref(), text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pestwatch_core::GeoTransform;

    fn mask(cells: &[(usize, usize)]) -> Raster<u8> {
        let mut m: Raster<u8> = Raster::new(6, 6);
        for &(r, c) in cells {
            m.set(r, c, 1).unwrap();
        }
        m
    }

    #[test]
    fn single_pixel_component() {
        let m = mask(&[(2, 3)]);
        let comps = connected_components(&m);
        assert_eq!(comps.len(), 1);
        assert_eq!(comps[0].len(), 1);
        assert_eq!(comps[0].anchor, (2, 3));
    }

    #[test]
    fn diagonal_pixels_are_separate() {
        // 4-connectivity: diagonal neighbors do not merge
        let m = mask(&[(1, 1), (2, 2)]);
        let comps = connected_components(&m);
        assert_eq!(comps.len(), 2);
    }

    #[test]
    fn cross_is_one_component() {
        let m = mask(&[(2, 2), (1, 2), (3, 2), (2, 1), (2, 3)]);
        let comps = connected_components(&m);
        assert_eq!(comps.len(), 1);
        assert_eq!(comps[0].len(), 5);
    }

    #[test]
    fn single_pixel_outline() {
        let m = mask(&[(2, 3)]);
        let comps = connected_components(&m);
        let ring = component_outline(&comps[0], &m).unwrap();

        // Four corners plus the closing vertex
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());
        assert!(ring.contains(&(2, 3)));
        assert!(ring.contains(&(2, 4)));
        assert!(ring.contains(&(3, 4)));
        assert!(ring.contains(&(3, 3)));
    }

    #[test]
    fn l_shape_outline_closes() {
        let m = mask(&[(1, 1), (2, 1), (2, 2)]);
        let comps = connected_components(&m);
        assert_eq!(comps.len(), 1);

        let ring = component_outline(&comps[0], &m).unwrap();
        assert_eq!(ring.first(), ring.last());
        // L-shape boundary: 8 edge segments, 8 distinct vertices + close
        assert_eq!(ring.len(), 9);
        // The concave corner sits on the ring
        assert!(ring.contains(&(2, 2)));
    }

    #[test]
    fn diagonal_neighbor_does_not_leak_into_outline() {
        // Anti-diagonal touch: each component's ring stays a unit square
        let m = mask(&[(0, 1), (1, 0)]);
        let comps = connected_components(&m);
        assert_eq!(comps.len(), 2);

        for comp in &comps {
            let ring = component_outline(comp, &m).unwrap();
            assert_eq!(ring.len(), 5, "expected a unit square, got {:?}", ring);
        }
    }

    #[test]
    fn geojson_structure() {
        let mut m = mask(&[(1, 1), (1, 2), (4, 4)]);
        m.set_transform(GeoTransform::from_bounds(79.0, 10.57, 79.047, 10.617, 6, 6));

        let geojson = mask_to_geojson(&m).unwrap();
        assert_eq!(geojson["type"], "FeatureCollection");

        let features = geojson["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0]["geometry"]["type"], "Polygon");
        assert_eq!(features[0]["properties"]["pixels"], 2);
        assert_eq!(features[1]["properties"]["pixels"], 1);

        // Ring coordinates are closed and in geographic range
        let ring = features[0]["geometry"]["coordinates"][0].as_array().unwrap();
        assert_eq!(ring.first().unwrap(), ring.last().unwrap());
        let x = ring[0][0].as_f64().unwrap();
        assert!((79.0..=79.047).contains(&x));
    }

    #[test]
    fn empty_mask_has_no_features() {
        let m = mask(&[]);
        let geojson = mask_to_geojson(&m).unwrap();
        assert_eq!(geojson["features"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn geojson_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pest_risk_2024-06-15.geojson");

        let m = mask(&[(2, 2)]);
        write_geojson(&m, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["type"], "FeatureCollection");
    }
}
