//! Face-vertex token parsing and polygon triangulation.

use corelib::Vec3;

use crate::lines::parse_index;

/// 0-based indices into the file-global pools. `None` means absent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FaceVertexRef {
    pub position: Option<u32>,
    pub uv: Option<u32>,
    pub normal: Option<u32>,
}

impl FaceVertexRef {
    /// Parse `position['/'texcoord]['/'normal]`. Empty segments are absent,
    /// so `7//3` has a position and a normal but no texcoord.
    pub fn parse(token: &str) -> Self {
        let mut parts = token.split('/');
        let mut next = || parts.next().and_then(parse_index);
        let position = next();
        let uv = next();
        let normal = next();
        Self {
            position,
            uv,
            normal,
        }
    }
}

/// Append the references of one face to `out`.
///
/// Triangles go in as written. Larger polygons are triangulated in their
/// own plane and each triangle `(a, b, c)` is appended as `(a, c, b)`,
/// which restores the winding the face was written in.
pub fn push_face(vertices: &[FaceVertexRef], positions: &[Vec3], out: &mut Vec<FaceVertexRef>) {
    if vertices.len() == 3 {
        out.extend_from_slice(vertices);
        return;
    }

    let points: Option<Vec<Vec3>> = vertices
        .iter()
        .map(|v| v.position.and_then(|i| positions.get(i as usize).copied()))
        .collect();
    let triangles = match points {
        Some(points) => triangulate_polygon(&points),
        None => fan(vertices.len()),
    };
    for [a, b, c] in triangles {
        out.extend([vertices[a], vertices[c], vertices[b]]);
    }
}

/// Ear-clip a planar polygon.
///
/// The polygon is projected onto its own plane (Newell normal). Returned
/// triangles index into `points` and are wound clockwise about that
/// normal, i.e. opposite to the polygon's own winding. Degenerate input
/// falls back to a fan with the same orientation.
pub fn triangulate_polygon(points: &[Vec3]) -> Vec<[usize; 3]> {
    if points.len() < 3 {
        return Vec::new();
    }

    let normal = newell_normal(points);
    if normal.length_squared() <= f32::EPSILON * f32::EPSILON {
        log::debug!("Degenerate polygon with {} vertices, using a fan", points.len());
        return fan(points.len());
    }
    let normal = normal.normalize();
    let u = normal.any_orthonormal_vector();
    let v = normal.cross(u);

    let flat: Vec<f64> = points
        .iter()
        .flat_map(|p| [p.dot(u) as f64, p.dot(v) as f64])
        .collect();

    let indices = match earcutr::earcut(&flat, &[], 2) {
        Ok(indices) if indices.len() == (points.len() - 2) * 3 => indices,
        Ok(indices) => {
            log::debug!(
                "Ear clipping produced {} of {} triangles, using a fan",
                indices.len() / 3,
                points.len() - 2
            );
            return fan(points.len());
        }
        Err(err) => {
            log::debug!("Ear clipping failed ({err:?}), using a fan");
            return fan(points.len());
        }
    };

    indices
        .chunks_exact(3)
        .map(|tri| {
            let (a, b, c) = (tri[0], tri[1], tri[2]);
            if signed_area(&flat, a, b, c) > 0.0 {
                [a, c, b]
            } else {
                [a, b, c]
            }
        })
        .collect()
}

/// Fan around vertex 0, wound against the input order.
fn fan(count: usize) -> Vec<[usize; 3]> {
    (1..count.saturating_sub(1)).map(|i| [0, i + 1, i]).collect()
}

fn newell_normal(points: &[Vec3]) -> Vec3 {
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .fold(Vec3::ZERO, |n, (cur, next)| {
            n + Vec3::new(
                (cur.y - next.y) * (cur.z + next.z),
                (cur.z - next.z) * (cur.x + next.x),
                (cur.x - next.x) * (cur.y + next.y),
            )
        })
}

/// Twice the signed area of a projected triangle, positive when
/// counter-clockwise.
fn signed_area(flat: &[f64], a: usize, b: usize, c: usize) -> f64 {
    let (ax, ay) = (flat[a * 2], flat[a * 2 + 1]);
    let (bx, by) = (flat[b * 2], flat[b * 2 + 1]);
    let (cx, cy) = (flat[c * 2], flat[c * 2 + 1]);
    (bx - ax) * (cy - ay) - (by - ay) * (cx - ax)
}
