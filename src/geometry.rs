//! CPU-side geometry: procedural primitives and Wavefront OBJ parsing.
//!
//! Everything here produces a [`RawGeometry`], which can be adjusted
//! (recentred, normalised, normals rebuilt) before it is uploaded as a
//! [`Mesh`]. Nothing in this module touches the GPU until
//! [`RawGeometry::upload`], so it is safe to run on a loader thread.
//!
//! # OBJ subset
//!
//! | Directive | Meaning |
//! |-----------|---------|
//! | `v x y z [w]` | position (`w` ignored) |
//! | `vt u [v] [w]` | texture coordinate (`v` defaults to 0, `w` ignored) |
//! | `vn x y z` | normal |
//! | `f a b c` | triangle; each corner is `p`, `p/t`, `p//n` or `p/t/n` |
//!
//! Indices are 1-based. Vertex `i` of the result is the `i`-th `v` line, so
//! face indices keep their file numbering (minus one). A position used with
//! more than one `(t, n)` pair gets an extra vertex per additional pair,
//! appended after the positions. Faces with more than three corners are
//! rejected rather than triangulated. All other directives (`o`, `g`, `s`, `usemtl`,
//! `mtllib`, ...) and `#` comments are skipped.

use std::collections::HashMap;
use std::f32::consts::PI;
use std::path::Path;

use glam::Vec3;

use crate::assets::TextureId;
use crate::error::RenderError;
use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Vertex3d};

#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown geometry format: '{0}'")]
    UnknownFormat(String),

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("invalid vertex streams: {0}")]
    InvalidStreams(String),
}

/// Direction of the normals generated by [`RawGeometry::sphere`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SphereNormals {
    #[default]
    Outward,
    /// Normals point at the centre and triangles are wound to face inside,
    /// for sky domes and rooms.
    Inward,
}

/// Vertices and triangle indices before GPU upload.
#[derive(Clone, Debug, Default)]
pub struct RawGeometry {
    pub vertices: Vec<Vertex3d>,
    pub indices: Vec<u32>,
}

impl RawGeometry {
    pub fn new(vertices: Vec<Vertex3d>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Interleaves flat `positions` (xyz), `uvs` (uv) and optional `normals`
    /// (xyz). Normals are computed from the triangles when `None`.
    pub fn from_streams(
        positions: &[f32],
        indices: &[u32],
        uvs: &[f32],
        normals: Option<&[f32]>,
    ) -> Result<Self, GeometryError> {
        let invalid = |message: String| Err(GeometryError::InvalidStreams(message));

        if positions.len() % 3 != 0 {
            return invalid(format!(
                "{} position floats is not a multiple of 3",
                positions.len()
            ));
        }
        let count = positions.len() / 3;
        if uvs.len() != count * 2 {
            return invalid(format!(
                "expected {} uv floats for {count} vertices, got {}",
                count * 2,
                uvs.len()
            ));
        }
        match normals {
            Some(n) if n.len() != positions.len() => {
                return invalid(format!(
                    "expected {} normal floats for {count} vertices, got {}",
                    positions.len(),
                    n.len()
                ));
            }
            _ => {}
        }
        if indices.len() % 3 != 0 {
            return invalid(format!("{} indices do not form triangles", indices.len()));
        }
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= count) {
            return invalid(format!("index {bad} out of range for {count} vertices"));
        }

        let vertices = (0..count)
            .map(|i| {
                let normal = normals
                    .map(|n| [n[i * 3], n[i * 3 + 1], n[i * 3 + 2]])
                    .unwrap_or_default();
                Vertex3d::new(
                    [positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]],
                    [uvs[i * 2], uvs[i * 2 + 1]],
                    normal,
                )
            })
            .collect();

        let mut geometry = Self::new(vertices, indices.to_vec());
        if normals.is_none() {
            geometry.recalculate_normals();
        }
        Ok(geometry)
    }

    /// A `width` × `height` rectangle in the XY plane spanning
    /// `(0, 0, 0)..(width, height, 0)`, facing +Z, with full-unit UVs.
    pub fn plane(width: f32, height: f32) -> Self {
        let n = [0.0, 0.0, 1.0];
        let vertices = vec![
            Vertex3d::new([0.0, 0.0, 0.0], [0.0, 0.0], n),
            Vertex3d::new([width, 0.0, 0.0], [1.0, 0.0], n),
            Vertex3d::new([width, height, 0.0], [1.0, 1.0], n),
            Vertex3d::new([0.0, height, 0.0], [0.0, 1.0], n),
        ];
        Self::new(vertices, vec![0, 1, 2, 0, 2, 3])
    }

    /// A box centred on the origin. Each face has its own four vertices so
    /// normals stay flat and every face maps the full texture.
    pub fn cube(width: f32, height: f32, depth: f32) -> Self {
        // Corners are in units of the box size, wound CCW seen from outside.
        #[rustfmt::skip]
        const FACES: [([f32; 3], [[f32; 3]; 4]); 6] = [
            ([ 0.0,  0.0,  1.0], [[-0.5, -0.5,  0.5], [ 0.5, -0.5,  0.5], [ 0.5,  0.5,  0.5], [-0.5,  0.5,  0.5]]),
            ([ 0.0,  0.0, -1.0], [[ 0.5, -0.5, -0.5], [-0.5, -0.5, -0.5], [-0.5,  0.5, -0.5], [ 0.5,  0.5, -0.5]]),
            ([ 0.0,  1.0,  0.0], [[-0.5,  0.5,  0.5], [ 0.5,  0.5,  0.5], [ 0.5,  0.5, -0.5], [-0.5,  0.5, -0.5]]),
            ([ 0.0, -1.0,  0.0], [[-0.5, -0.5, -0.5], [ 0.5, -0.5, -0.5], [ 0.5, -0.5,  0.5], [-0.5, -0.5,  0.5]]),
            ([ 1.0,  0.0,  0.0], [[ 0.5, -0.5,  0.5], [ 0.5, -0.5, -0.5], [ 0.5,  0.5, -0.5], [ 0.5,  0.5,  0.5]]),
            ([-1.0,  0.0,  0.0], [[-0.5, -0.5, -0.5], [-0.5, -0.5,  0.5], [-0.5,  0.5,  0.5], [-0.5,  0.5, -0.5]]),
        ];
        const UVS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

        let size = Vec3::new(width, height, depth);
        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (normal, corners) in FACES {
            let base = vertices.len() as u32;
            for (corner, uv) in corners.into_iter().zip(UVS) {
                let position = Vec3::from(corner) * size;
                vertices.push(Vertex3d::new(position.into(), uv, normal));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::new(vertices, indices)
    }

    /// A latitude/longitude sphere of `radius` centred on the origin.
    ///
    /// Produces `(slices + 1) * (stacks + 1)` vertices and
    /// `slices * stacks * 6` indices. The seam and poles carry duplicate
    /// vertices so UVs stay continuous: `u = 1 - j / slices`,
    /// `v = 1 - i / stacks`.
    ///
    /// `slices` and `stacks` are clamped to at least 1, so the counts above
    /// are computed from the clamped values.
    pub fn sphere(radius: f32, slices: u32, stacks: u32, normals: SphereNormals) -> Self {
        let slices = slices.max(1);
        let stacks = stacks.max(1);
        let sign = match normals {
            SphereNormals::Outward => 1.0,
            SphereNormals::Inward => -1.0,
        };

        let mut vertices = Vec::with_capacity(((slices + 1) * (stacks + 1)) as usize);
        for i in 0..=stacks {
            let theta = i as f32 * PI / stacks as f32;
            let (sin_theta, cos_theta) = theta.sin_cos();

            for j in 0..=slices {
                let phi = j as f32 * 2.0 * PI / slices as f32;
                let (sin_phi, cos_phi) = phi.sin_cos();

                let dir = Vec3::new(cos_phi * sin_theta, cos_theta, sin_phi * sin_theta);
                let uv = [
                    1.0 - j as f32 / slices as f32,
                    1.0 - i as f32 / stacks as f32,
                ];
                vertices.push(Vertex3d::new(
                    (dir * radius).into(),
                    uv,
                    (dir * sign).into(),
                ));
            }
        }

        let mut indices = Vec::with_capacity((slices * stacks * 6) as usize);
        for i in 0..stacks {
            for j in 0..slices {
                let first = i * (slices + 1) + j;
                let second = first + slices + 1;
                match normals {
                    SphereNormals::Outward => indices.extend_from_slice(&[
                        first,
                        first + 1,
                        second,
                        second,
                        first + 1,
                        second + 1,
                    ]),
                    SphereNormals::Inward => indices.extend_from_slice(&[
                        first,
                        second,
                        first + 1,
                        second,
                        second + 1,
                        first + 1,
                    ]),
                }
            }
        }

        Self::new(vertices, indices)
    }

    /// Loads a model, picking the parser from the file extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GeometryError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "obj" => parse_obj(&std::fs::read_to_string(path)?),
            _ => Err(GeometryError::UnknownFormat(ext)),
        }
    }

    /// Returns the `(min, max)` corners of the axis-aligned bounding box.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        for v in &self.vertices {
            let p = Vec3::from(v.position);
            min = min.min(p);
            max = max.max(p);
        }

        (min, max)
    }

    pub fn center(&self) -> Vec3 {
        let (min, max) = self.bounds();
        (min + max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        let (min, max) = self.bounds();
        max - min
    }

    pub fn translate(&mut self, offset: Vec3) {
        for v in &mut self.vertices {
            v.position = (Vec3::from(v.position) + offset).into();
        }
    }

    pub fn scale(&mut self, factor: f32) {
        for v in &mut self.vertices {
            v.position = (Vec3::from(v.position) * factor).into();
        }
    }

    /// Moves the bounding box centre to the origin.
    pub fn recenter(&mut self) {
        let center = self.center();
        self.translate(-center);
    }

    /// Scales uniformly so the largest extent is 1.
    pub fn normalize(&mut self) {
        let size = self.size();
        let max_dim = size.x.max(size.y).max(size.z);
        if max_dim > 0.0 {
            self.scale(1.0 / max_dim);
        }
    }

    /// Rebuilds smooth normals by summing area-weighted face normals at every
    /// vertex. Triangles referencing missing vertices are skipped.
    pub fn recalculate_normals(&mut self) {
        let mut sums = vec![Vec3::ZERO; self.vertices.len()];

        for tri in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let (Some(a), Some(b), Some(c)) = (
                self.vertices.get(i0),
                self.vertices.get(i1),
                self.vertices.get(i2),
            ) else {
                continue;
            };

            let p0 = Vec3::from(a.position);
            let face_normal = (Vec3::from(b.position) - p0).cross(Vec3::from(c.position) - p0);
            for i in [i0, i1, i2] {
                sums[i] += face_normal;
            }
        }

        for (v, n) in self.vertices.iter_mut().zip(sums) {
            v.normal = n.normalize_or_zero().into();
        }
    }

    /// Uploads this geometry as a [`Mesh`] drawn with `texture`.
    pub fn upload(&self, gpu: &GpuContext, texture: TextureId) -> Result<Mesh, RenderError> {
        Mesh::create(gpu, self, texture)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct Corner {
    position: usize,
    uv: Option<usize>,
    normal: Option<usize>,
}

/// Parses OBJ text into indexed triangles. See the module docs for the
/// supported subset.
pub fn parse_obj(source: &str) -> Result<RawGeometry, GeometryError> {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut uvs: Vec<[f32; 2]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();
    let mut faces: Vec<(usize, [Corner; 3])> = Vec::new();

    for (n, raw) in source.lines().enumerate() {
        let line = n + 1;
        let content = raw.split('#').next().unwrap_or_default().trim();
        let mut tokens = content.split_whitespace();

        match tokens.next() {
            Some("v") => {
                let [x, y, z] = parse_floats::<3>(tokens, line, "v", 3, 1)?;
                positions.push([x, y, z]);
            }
            Some("vt") => {
                let [u, v] = parse_floats::<2>(tokens, line, "vt", 1, 1)?;
                uvs.push([u, v]);
            }
            Some("vn") => {
                normals.push(parse_floats::<3>(tokens, line, "vn", 3, 0)?);
            }
            Some("f") => {
                let corners: Vec<&str> = tokens.collect();
                if corners.len() != 3 {
                    return Err(parse_error(
                        line,
                        format!("face has {} corners, only triangles are supported", corners.len()),
                    ));
                }
                faces.push((
                    line,
                    [
                        parse_corner(corners[0], line)?,
                        parse_corner(corners[1], line)?,
                        parse_corner(corners[2], line)?,
                    ],
                ));
            }
            _ => {}
        }
    }

    // Vertex `i` is position `i`, carrying the uv and normal of the first
    // corner that uses it. A later corner pairing the same position with a
    // different uv or normal gets an extra vertex after the positions.
    let mut geometry = RawGeometry {
        vertices: positions
            .iter()
            .map(|&p| Vertex3d::new(p, [0.0; 2], [0.0; 3]))
            .collect(),
        indices: Vec::with_capacity(faces.len() * 3),
    };
    let mut claimed: Vec<Option<Corner>> = vec![None; positions.len()];
    let mut extra: HashMap<Corner, u32> = HashMap::new();
    let mut missing_normals = false;

    for (line, corners) in faces {
        for corner in corners {
            let corner = resolve_corner(corner, line, &positions, &uvs, &normals)?;
            missing_normals |= corner.normal.is_none();
            let uv = corner.uv.map(|i| uvs[i]).unwrap_or_default();
            let normal = corner.normal.map(|i| normals[i]).unwrap_or_default();

            let index = match claimed[corner.position] {
                None => {
                    claimed[corner.position] = Some(corner);
                    let vertex = &mut geometry.vertices[corner.position];
                    vertex.uv = uv;
                    vertex.normal = normal;
                    corner.position as u32
                }
                Some(first) if first == corner => corner.position as u32,
                Some(_) => *extra.entry(corner).or_insert_with(|| {
                    geometry.vertices.push(Vertex3d::new(positions[corner.position], uv, normal));
                    geometry.vertices.len() as u32 - 1
                }),
            };
            geometry.indices.push(index);
        }
    }

    if missing_normals {
        geometry.recalculate_normals();
    }
    Ok(geometry)
}

fn parse_error(line: usize, message: impl Into<String>) -> GeometryError {
    GeometryError::Parse {
        line,
        message: message.into(),
    }
}

/// Reads between `required` and `N` floats, missing ones defaulting to zero.
/// At most `extra` more are tolerated and ignored.
fn parse_floats<'a, const N: usize>(
    tokens: impl Iterator<Item = &'a str>,
    line: usize,
    directive: &str,
    required: usize,
    extra: usize,
) -> Result<[f32; N], GeometryError> {
    let values = tokens
        .map(|t| {
            t.parse::<f32>()
                .map_err(|_| parse_error(line, format!("`{t}` is not a number")))
        })
        .collect::<Result<Vec<f32>, _>>()?;

    if values.len() < required || values.len() > N + extra {
        return Err(parse_error(
            line,
            format!(
                "`{directive}` expects {required} to {} components, found {}",
                N + extra,
                values.len()
            ),
        ));
    }

    let mut out = [0.0; N];
    let len = values.len().min(N);
    out[..len].copy_from_slice(&values[..len]);
    Ok(out)
}

fn parse_corner(token: &str, line: usize) -> Result<Corner, GeometryError> {
    let index = |part: &str| -> Result<usize, GeometryError> {
        match part.parse::<i64>() {
            Ok(i) if i >= 1 => Ok(i as usize - 1),
            Ok(i) => Err(parse_error(
                line,
                format!("index {i} in `{token}`: indices are 1-based and positive"),
            )),
            Err(_) => Err(parse_error(line, format!("malformed face corner `{token}`"))),
        }
    };
    let optional = |part: Option<&str>| -> Result<Option<usize>, GeometryError> {
        match part {
            None | Some("") => Ok(None),
            Some(p) => index(p).map(Some),
        }
    };

    let mut parts = token.split('/');
    let position = index(parts.next().unwrap_or_default())?;
    let uv = optional(parts.next())?;
    let normal = optional(parts.next())?;
    if parts.next().is_some() {
        return Err(parse_error(line, format!("malformed face corner `{token}`")));
    }

    Ok(Corner {
        position,
        uv,
        normal,
    })
}

/// Checks indices against the streams. References into an empty stream are
/// dropped; references past the end of a non-empty one are errors.
fn resolve_corner(
    corner: Corner,
    line: usize,
    positions: &[[f32; 3]],
    uvs: &[[f32; 2]],
    normals: &[[f32; 3]],
) -> Result<Corner, GeometryError> {
    fn check(
        index: Option<usize>,
        len: usize,
        what: &str,
        line: usize,
    ) -> Result<Option<usize>, GeometryError> {
        match index {
            Some(_) if len == 0 => Ok(None),
            Some(i) if i >= len => Err(parse_error(
                line,
                format!("{what} index {} out of range ({len} defined)", i + 1),
            )),
            other => Ok(other),
        }
    }

    if corner.position >= positions.len() {
        return Err(parse_error(
            line,
            format!(
                "position index {} out of range ({} defined)",
                corner.position + 1,
                positions.len()
            ),
        ));
    }

    Ok(Corner {
        position: corner.position,
        uv: check(corner.uv, uvs.len(), "texture coordinate", line)?,
        normal: check(corner.normal, normals.len(), "normal", line)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn raw_geometry_bounds() {
        let vertices = vec![
            Vertex3d::new([0.0, 0.0, 0.0], [0.0, 0.0], [0.0, 1.0, 0.0]),
            Vertex3d::new([1.0, 2.0, 3.0], [0.0, 0.0], [0.0, 1.0, 0.0]),
            Vertex3d::new([-1.0, -1.0, -1.0], [0.0, 0.0], [0.0, 1.0, 0.0]),
        ];
        let geom = RawGeometry::new(vertices, vec![0, 1, 2]);

        let (min, max) = geom.bounds();
        assert_eq!(min, Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn recenter_then_normalize() {
        let vertices = vec![
            Vertex3d::new([2.0, 2.0, 2.0], [0.0, 0.0], [0.0; 3]),
            Vertex3d::new([6.0, 4.0, 3.0], [0.0, 0.0], [0.0; 3]),
        ];
        let mut geom = RawGeometry::new(vertices, vec![0, 1, 0]);

        geom.recenter();
        assert!(geom.center().abs_diff_eq(Vec3::ZERO, EPS));

        geom.normalize();
        assert!((geom.size().x - 1.0).abs() < EPS);
        assert!((geom.size().y - 0.5).abs() < EPS);
    }

    #[test]
    fn plane_corners() {
        let plane = RawGeometry::plane(2.0, 3.0);
        let positions: Vec<[f32; 3]> = plane.vertices.iter().map(|v| v.position).collect();
        assert_eq!(
            positions,
            vec![
                [0.0, 0.0, 0.0],
                [2.0, 0.0, 0.0],
                [2.0, 3.0, 0.0],
                [0.0, 3.0, 0.0]
            ]
        );
        assert_eq!(plane.indices.len(), 6);
        assert!(plane.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }

    fn triangle_normals(geom: &RawGeometry) -> impl Iterator<Item = (Vec3, Vec3)> + '_ {
        geom.indices.chunks_exact(3).map(|t| {
            let p = |i: u32| Vec3::from(geom.vertices[i as usize].position);
            let face = (p(t[1]) - p(t[0])).cross(p(t[2]) - p(t[0]));
            let centroid = (p(t[0]) + p(t[1]) + p(t[2])) / 3.0;
            (face, centroid)
        })
    }

    #[test]
    fn cube_faces_point_outward() {
        let cube = RawGeometry::cube(2.0, 1.0, 4.0);
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);

        let (min, max) = cube.bounds();
        assert_eq!(min, Vec3::new(-1.0, -0.5, -2.0));
        assert_eq!(max, Vec3::new(1.0, 0.5, 2.0));

        for (face, centroid) in triangle_normals(&cube) {
            assert!(face.dot(centroid) > 0.0);
        }
        for v in &cube.vertices {
            assert!(Vec3::from(v.normal).dot(Vec3::from(v.position)) > 0.0);
        }
    }

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let radius = 2.5;
        let sphere = RawGeometry::sphere(radius, 24, 12, SphereNormals::Outward);
        assert_eq!(sphere.vertices.len(), 25 * 13);
        assert_eq!(sphere.indices.len(), 24 * 12 * 6);

        for v in &sphere.vertices {
            let p = Vec3::from(v.position);
            assert!((p.length() - radius).abs() < EPS);
            assert!(Vec3::from(v.normal).abs_diff_eq(p / radius, EPS));
            assert!((0.0..=1.0).contains(&v.uv[0]) && (0.0..=1.0).contains(&v.uv[1]));
        }
    }

    #[test]
    fn sphere_clamps_zero_subdivisions() {
        let sphere = RawGeometry::sphere(1.0, 0, 4, SphereNormals::Outward);
        assert_eq!(sphere.vertices.len(), 2 * 5);
        assert_eq!(sphere.indices.len(), 4 * 6);
    }

    #[test]
    fn sphere_winding_follows_normals() {
        let outward = RawGeometry::sphere(1.0, 16, 8, SphereNormals::Outward);
        let inward = RawGeometry::sphere(1.0, 16, 8, SphereNormals::Inward);

        // pole triangles are degenerate, so only count the non-zero ones
        for (face, centroid) in triangle_normals(&outward) {
            if face.length() > 1e-6 {
                assert!(face.dot(centroid) > 0.0);
            }
        }
        for (face, centroid) in triangle_normals(&inward) {
            if face.length() > 1e-6 {
                assert!(face.dot(centroid) < 0.0);
            }
        }
        assert!(inward.vertices.iter().all(|v| {
            Vec3::from(v.normal).dot(Vec3::from(v.position)) <= EPS
        }));
    }

    #[test]
    fn streams_interleave_and_compute_normals() {
        let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let uvs = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
        let geom = RawGeometry::from_streams(&positions, &[0, 1, 2], &uvs, None).unwrap();

        assert_eq!(geom.vertices[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(geom.vertices[2].uv, [0.0, 1.0]);
        for v in &geom.vertices {
            assert!(Vec3::from(v.normal).abs_diff_eq(Vec3::Z, EPS));
        }
    }

    #[test]
    fn streams_are_validated() {
        let positions = [0.0; 9];
        let uvs = [0.0; 6];
        assert!(RawGeometry::from_streams(&positions[..8], &[0, 1, 2], &uvs, None).is_err());
        assert!(RawGeometry::from_streams(&positions, &[0, 1, 2], &uvs[..4], None).is_err());
        assert!(RawGeometry::from_streams(&positions, &[0, 1, 3], &uvs, None).is_err());
        assert!(RawGeometry::from_streams(&positions, &[0, 1], &uvs, None).is_err());
        assert!(
            RawGeometry::from_streams(&positions, &[0, 1, 2], &uvs, Some(&[0.0; 6])).is_err()
        );
    }

    #[test]
    fn obj_full_corners() {
        let src = "\
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vt 1 0
vt 0 1
vn 0 0 1
vn 0 0 1
vn 0 0 1
f 1/1/1 2/2/2 3/3/3
";
        let geom = parse_obj(src).unwrap();
        assert_eq!(geom.indices, vec![0, 1, 2]);
        assert_eq!(geom.vertices.len(), 3);
        assert_eq!(geom.vertices[1].uv, [1.0, 0.0]);
        assert_eq!(geom.vertices[2].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn obj_absent_streams_are_ignored() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1/1/1 2/2/2 3/3/3\n";
        let geom = parse_obj(src).unwrap();
        assert_eq!(geom.indices, vec![0, 1, 2]);
        assert!(geom.vertices.iter().all(|v| v.uv == [0.0, 0.0]));
        for v in &geom.vertices {
            assert!(Vec3::from(v.normal).abs_diff_eq(Vec3::Z, EPS));
        }
    }

    #[test]
    fn obj_shares_repeated_corners() {
        let src = "\
# a unit quad
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
s off
f 1/1 2/2 3/3
f 1/1 3/3 4/4   # second half
";
        let geom = parse_obj(src).unwrap();
        assert_eq!(geom.vertices.len(), 4);
        assert_eq!(geom.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn obj_indices_follow_vertex_lines() {
        let geom = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 3 1 2\n").unwrap();
        assert_eq!(geom.indices, vec![2, 0, 1]);
        assert_eq!(geom.vertices[0].position, [0.0, 0.0, 0.0]);
        assert_eq!(geom.vertices[2].position, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn obj_splits_positions_with_different_uvs() {
        let src = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 1 1 0
vt 0 0
vt 1 0
vt 0 1
vt 1 1
vt 0.5 0.5
f 1/1 2/2 3/3
f 2/2 4/4 3/5
";
        let geom = parse_obj(src).unwrap();
        assert_eq!(geom.indices, vec![0, 1, 2, 1, 3, 4]);
        assert_eq!(geom.vertices.len(), 5);
        assert_eq!(geom.vertices[2].uv, [0.0, 1.0]);
        assert_eq!(geom.vertices[4].position, [0.0, 1.0, 0.0]);
        assert_eq!(geom.vertices[4].uv, [0.5, 0.5]);
    }

    #[test]
    fn obj_texcoord_v_is_optional() {
        let geom = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0.5\nf 1/1 2/1 3/1\n").unwrap();
        assert_eq!(geom.vertices[0].uv, [0.5, 0.0]);
        assert_eq!(parse_line_of("vt\n"), 1);
        assert_eq!(parse_line_of("vt 0 0 0 0\n"), 1);
    }

    #[test]
    fn obj_position_and_normal_only() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 -1\nf 1//1 2//1 3//1\n";
        let geom = parse_obj(src).unwrap();
        assert!(geom.vertices.iter().all(|v| v.normal == [0.0, 0.0, -1.0]));
    }

    fn parse_line_of(src: &str) -> usize {
        match parse_obj(src) {
            Err(GeometryError::Parse { line, .. }) => line,
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn obj_rejects_quads() {
        let src = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        assert_eq!(parse_line_of(src), 5);
    }

    #[test]
    fn obj_rejects_bad_indices() {
        assert_eq!(parse_line_of("v 0 0 0\nv 1 0 0\nf 1 2 3\n"), 3);
        assert_eq!(parse_line_of("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 0 1 2\n"), 4);
        assert_eq!(parse_line_of("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -1 1 2\n"), 4);
        assert_eq!(parse_line_of("v 0 0 0\nv 1 0 0\nv 0 1 0\nf a 1 2\n"), 4);
        assert_eq!(
            parse_line_of("v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nf 1/2 2/1 3/1\n"),
            5
        );
    }

    #[test]
    fn obj_rejects_malformed_vertices() {
        assert_eq!(parse_line_of("v 0 0\n"), 1);
        assert_eq!(parse_line_of("\n\nv 0 zero 0\n"), 3);
        assert_eq!(parse_line_of("vn 0 0 1 1\n"), 1);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(matches!(
            RawGeometry::from_file("model.fbx"),
            Err(GeometryError::UnknownFormat(ext)) if ext == "fbx"
        ));
    }
}
