//! C5 Stage 1: land-polygon mask.
//!
//! Loads polygon features from a shapefile land-mask source and unions them
//! into one `MultiPolygon` supporting the `contains`/`intersects` predicates
//! the rest of the pipeline needs. lon/lat order throughout, matching
//! EPSG:4326 and the convention `geo::Point::new(lon, lat)` already used by
//! the teacher's `geo.rs`.

use std::path::{Path, PathBuf};

use geo::{BooleanOps, Coord, Line, LineString, MultiPolygon, Point, Polygon};
use geo::{Contains, Intersects};
use seaway_common::Error;

pub struct LandMask {
    geometry: MultiPolygon<f64>,
    source: PathBuf,
}

impl LandMask {
    /// Load and union every polygon feature in `path` (§4.5 Stage 1). Fails
    /// with `LandMaskLoadFailed` if the source is missing or contributes no
    /// polygons.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let mut reader = shapefile::Reader::from_path(path).map_err(|e| Error::LandMaskLoadFailed {
            source: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut polygons: Vec<Polygon<f64>> = Vec::new();
        for shape_result in reader.iter_shapes() {
            let shape = shape_result.map_err(|e| Error::LandMaskLoadFailed {
                source: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            polygons.extend(shape_to_polygons(shape));
        }

        if polygons.is_empty() {
            return Err(Error::LandMaskLoadFailed {
                source: path.to_path_buf(),
                reason: "no polygon features found".to_string(),
            });
        }

        let mut geometry = MultiPolygon::new(vec![polygons.remove(0)]);
        for polygon in polygons {
            geometry = geometry.union(&MultiPolygon::new(vec![polygon]));
        }

        Ok(LandMask {
            geometry,
            source: path.to_path_buf(),
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Polygon containment test in lon/lat order (I1).
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.geometry.contains(&Point::new(lon, lat))
    }

    /// Segment/land intersection test in lon/lat order (I2). Callers are
    /// responsible for splitting antimeridian-crossing segments before
    /// calling this (§4.5 Stage 6).
    pub fn intersects_segment(&self, from: (f64, f64), to: (f64, f64)) -> bool {
        let line = Line::new(
            Coord { x: from.0, y: from.1 },
            Coord { x: to.0, y: to.1 },
        );
        self.geometry.intersects(&line)
    }
}

#[cfg(test)]
impl LandMask {
    /// Build a mask directly from geometry, bypassing shapefile I/O, for
    /// tests elsewhere in this crate that need a synthetic land mask.
    pub(crate) fn from_geometry(geometry: MultiPolygon<f64>) -> Self {
        LandMask {
            geometry,
            source: PathBuf::from("test"),
        }
    }
}

/// Group a shapefile polygon feature's rings into proper exterior/hole
/// polygons by winding order, per the ESRI shapefile convention: clockwise
/// rings are exteriors, counterclockwise rings are holes belonging to the
/// most recently seen exterior. Ungrouped leading holes (malformed input)
/// are dropped rather than promoted to bare solid polygons, since treating
/// a hole as land would silently erase water the dataset meant to keep open.
fn shape_to_polygons(shape: shapefile::Shape) -> Vec<Polygon<f64>> {
    match shape {
        shapefile::Shape::Polygon(poly) => {
            let mut polygons: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();
            for ring in poly.rings() {
                let coords: Vec<Coord<f64>> = ring.points().iter().map(|p| Coord { x: p.x, y: p.y }).collect();
                let line = LineString::new(coords);
                if is_clockwise(&line) {
                    polygons.push((line, Vec::new()));
                } else if let Some((_, holes)) = polygons.last_mut() {
                    holes.push(line);
                }
                // a hole ring with no preceding exterior is malformed input; dropped.
            }
            polygons
                .into_iter()
                .map(|(exterior, holes)| Polygon::new(exterior, holes))
                .collect()
        }
        _ => Vec::new(),
    }
}

/// ESRI shapefile winding convention: exterior rings are clockwise in (x, y)
/// screen-style coordinates, which for lon/lat (x=lon, y=lat) means a
/// negative signed area (the shoelace formula's sign flips against the usual
/// mathematical convention because y increases "downward" in that formula's
/// orientation only when compared to a counterclockwise-positive reference;
/// shapefile defines clockwise = outer regardless, so signed area < 0 here
/// is treated as clockwise).
fn is_clockwise(ring: &LineString<f64>) -> bool {
    let coords: Vec<Coord<f64>> = ring.coords().copied().collect();
    if coords.len() < 3 {
        return true;
    }
    let mut signed_area = 0.0;
    for window in coords.windows(2) {
        let (p0, p1) = (window[0], window[1]);
        signed_area += p0.x * p1.y - p1.x * p0.y;
    }
    signed_area < 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min: (f64, f64), max: (f64, f64)) -> Polygon<f64> {
        Polygon::new(
            LineString::new(vec![
                Coord { x: min.0, y: min.1 },
                Coord { x: max.0, y: min.1 },
                Coord { x: max.0, y: max.1 },
                Coord { x: min.0, y: max.1 },
                Coord { x: min.0, y: min.1 },
            ]),
            vec![],
        )
    }

    #[test]
    fn contains_and_intersects_against_a_synthetic_square() {
        let geometry = MultiPolygon::new(vec![square((0.0, 0.0), (10.0, 10.0))]);
        let mask = LandMask {
            geometry,
            source: PathBuf::from("test"),
        };

        assert!(mask.contains(5.0, 5.0));
        assert!(!mask.contains(20.0, 20.0));
        assert!(mask.intersects_segment((-5.0, 5.0), (5.0, 5.0)));
        assert!(!mask.intersects_segment((20.0, 20.0), (30.0, 30.0)));
    }

    #[test]
    fn load_fails_on_missing_source() {
        let err = LandMask::load("/nonexistent/land.shp").unwrap_err();
        assert!(matches!(err, Error::LandMaskLoadFailed { .. }));
    }
}
