//! Mesh extraction and vertex/normal deduplication
//!
//! [`GeometryCache`] turns a polygon mesh ([`RawMesh`]) into the compact
//! triangle form written to the scene file ([`DedupedMesh`]):
//!
//! - unreferenced points are dropped and the rest renumbered
//! - when per-corner normals carry information, corners sharing a point and
//!   a normal are merged and points are split only where normals differ
//! - quads are split into two triangles with the winding flipped for the
//!   target coordinate system
//!
//! The cache owns its scratch buffers and reuses them across meshes, so one
//! cache serves a whole conversion. Each call overwrites the previous result.

use std::collections::TryReserveError;

use thiserror::Error;

use crate::foundation::math::Vec3;

/// Squared distance below which two normals count as equal
pub const NORMAL_EPSILON_SQ: f32 = 1e-6;

const UNUSED: u32 = u32::MAX;

/// Errors raised while processing a mesh
#[derive(Error, Debug)]
pub enum GeometryError {
    /// A scratch buffer could not be allocated
    #[error("Allocation failed: {0}")]
    Allocation(#[from] TryReserveError),

    /// A polygon refers to a point that does not exist
    #[error("Polygon {polygon} refers to point {index} but the mesh has {point_count} points")]
    IndexOutOfRange {
        /// Polygon position in the polygon list
        polygon: usize,
        /// Offending point index
        index: u32,
        /// Number of points in the mesh
        point_count: usize,
    },

    /// Per-corner normals must come four per polygon
    #[error("Expected {expected} corner normals, found {found}")]
    NormalCount {
        /// Four times the polygon count
        expected: usize,
        /// Length of the supplied normal array
        found: usize,
    },
}

/// A triangle or quad referencing points by index
///
/// Triangles repeat their third index in `d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Polygon {
    /// First corner
    pub a: u32,
    /// Second corner
    pub b: u32,
    /// Third corner
    pub c: u32,
    /// Fourth corner, equal to `c` for triangles
    pub d: u32,
}

impl Polygon {
    /// Create a triangle
    pub fn triangle(a: u32, b: u32, c: u32) -> Self {
        Self { a, b, c, d: c }
    }

    /// Create a quad
    pub fn quad(a: u32, b: u32, c: u32, d: u32) -> Self {
        Self { a, b, c, d }
    }

    /// Whether this polygon is a triangle
    pub fn is_triangle(&self) -> bool {
        self.c == self.d
    }

    /// Number of distinct corners (3 or 4)
    pub fn corner_count(&self) -> usize {
        if self.is_triangle() { 3 } else { 4 }
    }

    /// All four corner slots
    pub fn corners(&self) -> [u32; 4] {
        [self.a, self.b, self.c, self.d]
    }

    fn from_corners(corners: [u32; 4]) -> Self {
        Self {
            a: corners[0],
            b: corners[1],
            c: corners[2],
            d: corners[3],
        }
    }
}

/// Polygon mesh as supplied by the scene
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMesh {
    /// Point positions in object space
    pub points: Vec<Vec3>,
    /// Triangles and quads
    pub polygons: Vec<Polygon>,
    /// Optional per-corner normals, four per polygon in corner order
    pub normals: Option<Vec<Vec3>>,
}

impl RawMesh {
    /// Create a mesh without normals
    pub fn new(points: Vec<Vec3>, polygons: Vec<Polygon>) -> Self {
        Self {
            points,
            polygons,
            normals: None,
        }
    }

    /// Attach per-corner normals
    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = Some(normals);
        self
    }

    fn validate(&self) -> Result<(), GeometryError> {
        let point_count = self.points.len();
        for (polygon, poly) in self.polygons.iter().enumerate() {
            if let Some(&index) = poly.corners().iter().find(|&&i| i as usize >= point_count) {
                return Err(GeometryError::IndexOutOfRange {
                    polygon,
                    index,
                    point_count,
                });
            }
        }
        if let Some(normals) = &self.normals {
            let expected = self.polygons.len() * 4;
            if normals.len() != expected {
                return Err(GeometryError::NormalCount {
                    expected,
                    found: normals.len(),
                });
            }
        }
        Ok(())
    }
}

/// Compact triangle mesh ready for serialization
///
/// Every triangle index is below `points.len()`, and `normals`, when
/// present, is index-aligned with `points`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupedMesh {
    /// Point positions scaled to target units
    pub points: Vec<Vec3>,
    /// Unit normals, one per point
    pub normals: Option<Vec<Vec3>>,
    /// Three indices per triangle
    pub triangles: Vec<u32>,
}

impl DedupedMesh {
    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    /// Whether there is nothing to draw
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Total area of all triangles
    pub fn surface_area(&self) -> f32 {
        self.triangles
            .chunks_exact(3)
            .map(|t| {
                let a = self.points[t[0] as usize];
                let b = self.points[t[1] as usize];
                let c = self.points[t[2] as usize];
                (b - a).cross(&(c - a)).norm() * 0.5
            })
            .sum()
    }

    fn clear(&mut self) {
        self.points.clear();
        self.triangles.clear();
        self.normals = None;
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct BucketSlot {
    normal: Vec3,
    new_index: u32,
}

/// Reusable mesh processing state
#[derive(Debug, Default)]
pub struct GeometryCache {
    /// Working copy of the polygons, rewritten to new indices in place
    polygons: Vec<Polygon>,
    /// Usage markers, then compacted indices (normal-free path)
    markers: Vec<u32>,
    /// Bucket start offsets per original point, plus the total at the end
    starts: Vec<u32>,
    /// Claimed slots per original point
    fill: Vec<u32>,
    /// Flat corner buckets partitioned by original point
    buckets: Vec<BucketSlot>,
    mesh: DedupedMesh,
}

impl GeometryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Process `raw` and return the compact mesh
    ///
    /// Normals are considered only if `use_normals` is set, the mesh has
    /// them, and at least one polygon has differing corner normals.
    /// Positions are multiplied by `unit_scale`.
    ///
    /// After an error the cache contents are unspecified until the next
    /// successful call.
    pub fn update(
        &mut self,
        raw: &RawMesh,
        use_normals: bool,
        unit_scale: f32,
    ) -> Result<&DedupedMesh, GeometryError> {
        raw.validate()?;

        let normals = raw
            .normals
            .as_deref()
            .filter(|normals| use_normals && !normals_are_trivial(&raw.polygons, normals));
        self.run(raw, normals, unit_scale)?;

        log::debug!(
            "Mesh {} points / {} polygons -> {} points / {} triangles{}",
            raw.points.len(),
            raw.polygons.len(),
            self.mesh.points.len(),
            self.mesh.triangle_count(),
            if self.mesh.normals.is_some() { " with normals" } else { "" },
        );
        Ok(&self.mesh)
    }

    /// Result of the last successful [`update`](Self::update)
    pub fn mesh(&self) -> &DedupedMesh {
        &self.mesh
    }

    /// Drop the last result and scratch contents, keeping allocations
    pub fn reset(&mut self) {
        self.polygons.clear();
        self.markers.clear();
        self.starts.clear();
        self.fill.clear();
        self.buckets.clear();
        self.mesh.clear();
    }

    fn run(
        &mut self,
        raw: &RawMesh,
        normals: Option<&[Vec3]>,
        unit_scale: f32,
    ) -> Result<(), GeometryError> {
        self.mesh.clear();
        self.polygons.clear();
        self.polygons.try_reserve(raw.polygons.len())?;
        self.polygons.extend_from_slice(&raw.polygons);

        match normals {
            Some(normals) => self.dedup_with_normals(raw, normals, unit_scale)?,
            None => self.dedup_points(raw, unit_scale)?,
        }
        self.triangulate()
    }

    fn dedup_points(&mut self, raw: &RawMesh, unit_scale: f32) -> Result<(), GeometryError> {
        let point_count = raw.points.len();
        reset_to(&mut self.markers, point_count, UNUSED)?;

        for poly in &self.polygons {
            for &corner in &poly.corners() {
                self.markers[corner as usize] = 0;
            }
        }

        let mut next = 0u32;
        for marker in &mut self.markers {
            if *marker != UNUSED {
                *marker = next;
                next += 1;
            }
        }

        self.mesh.points.try_reserve(next as usize)?;
        for (point, &marker) in raw.points.iter().zip(&self.markers) {
            if marker != UNUSED {
                self.mesh.points.push(*point * unit_scale);
            }
        }

        for poly in &mut self.polygons {
            let corners = poly.corners().map(|c| self.markers[c as usize]);
            *poly = Polygon::from_corners(corners);
        }
        Ok(())
    }

    fn dedup_with_normals(
        &mut self,
        raw: &RawMesh,
        normals: &[Vec3],
        unit_scale: f32,
    ) -> Result<(), GeometryError> {
        let point_count = raw.points.len();

        // Degree of each point, shifted by one so the prefix sum yields starts.
        reset_to(&mut self.starts, point_count + 1, 0)?;
        for poly in &self.polygons {
            for &corner in &poly.corners()[..poly.corner_count()] {
                self.starts[corner as usize + 1] += 1;
            }
        }
        for i in 1..=point_count {
            self.starts[i] += self.starts[i - 1];
        }
        let total = self.starts[point_count] as usize;

        reset_to(&mut self.fill, point_count, 0)?;
        reset_to(&mut self.buckets, total, BucketSlot::default())?;

        let mut next_index = 0u32;
        for (pi, poly) in self.polygons.iter_mut().enumerate() {
            let corners = poly.corners();
            let count = poly.corner_count();
            let mut assigned = [0u32; 4];

            for k in 0..count {
                let original = corners[k] as usize;
                let normal = normals[pi * 4 + k];
                let start = self.starts[original] as usize;
                let used = self.fill[original] as usize;

                let existing = self.buckets[start..start + used]
                    .iter()
                    .find(|slot| (slot.normal - normal).norm_squared() < NORMAL_EPSILON_SQ)
                    .map(|slot| slot.new_index);

                assigned[k] = match existing {
                    Some(index) => index,
                    None => {
                        self.buckets[start + used] = BucketSlot {
                            normal,
                            new_index: next_index,
                        };
                        self.fill[original] += 1;
                        next_index += 1;
                        next_index - 1
                    }
                };
            }
            if count == 3 {
                assigned[3] = assigned[2];
            }
            *poly = Polygon::from_corners(assigned);
        }

        let new_count = next_index as usize;
        reset_to(&mut self.mesh.points, new_count, Vec3::zeros())?;
        let mut out_normals = Vec::new();
        out_normals.try_reserve(new_count)?;
        out_normals.resize(new_count, Vec3::zeros());

        for original in 0..point_count {
            let start = self.starts[original] as usize;
            let used = self.fill[original] as usize;
            for slot in &self.buckets[start..start + used] {
                let index = slot.new_index as usize;
                self.mesh.points[index] = raw.points[original] * unit_scale;
                out_normals[index] = slot.normal.try_normalize(f32::EPSILON).unwrap_or(slot.normal);
            }
        }
        self.mesh.normals = Some(out_normals);
        Ok(())
    }

    fn triangulate(&mut self) -> Result<(), GeometryError> {
        let index_count: usize = self
            .polygons
            .iter()
            .map(|p| if p.is_triangle() { 3 } else { 6 })
            .sum();
        self.mesh.triangles.try_reserve(index_count)?;

        for poly in &self.polygons {
            // Winding is reversed: the target space has the opposite handedness.
            self.mesh.triangles.extend_from_slice(&[poly.a, poly.c, poly.b]);
            if !poly.is_triangle() {
                self.mesh.triangles.extend_from_slice(&[poly.a, poly.d, poly.c]);
            }
        }
        Ok(())
    }
}

/// Whether every polygon's corner normals are mutually equal
pub fn normals_are_trivial(polygons: &[Polygon], normals: &[Vec3]) -> bool {
    polygons.iter().enumerate().all(|(pi, poly)| {
        let corners = &normals[pi * 4..pi * 4 + poly.corner_count()];
        corners.iter().enumerate().all(|(i, a)| {
            corners[i + 1..]
                .iter()
                .all(|b| (a - b).norm_squared() < NORMAL_EPSILON_SQ)
        })
    })
}

fn reset_to<T: Clone>(buffer: &mut Vec<T>, len: usize, value: T) -> Result<(), TryReserveError> {
    buffer.clear();
    buffer.try_reserve(len)?;
    buffer.resize(len, value);
    Ok(())
}
