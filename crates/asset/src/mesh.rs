//! CPU-side mesh representation produced by the OBJ loader.

use corelib::{Vec2, Vec3};

use crate::{face::FaceVertexRef, material::MaterialHandle};

/// Normal used when a face vertex has none but the document has normals.
pub const UP_NORMAL: Vec3 = Vec3::Z;

/// File-global attribute pools. Face indices address these.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VertexPools {
    pub positions: Vec<Vec3>,
    /// Stored as `(u, 1 - v)`.
    pub uvs: Vec<Vec2>,
    pub normals: Vec<Vec3>,
}

/// One material-homogeneous chunk of a mesh.
///
/// `uvs` holds zero or one channel; each channel and `normals` are either
/// empty or exactly as long as `positions`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Primitive {
    pub positions: Vec<Vec3>,
    pub uvs: Vec<Vec<Vec2>>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub material_name: String,
    /// `None` selects the consumer's default surface material.
    pub material: Option<MaterialHandle>,
}

impl Primitive {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Same attribute layout, so the two can be concatenated.
    fn layout_matches(&self, other: &Primitive) -> bool {
        self.uvs.len() == other.uvs.len() && self.normals.is_empty() == other.normals.is_empty()
    }

    /// Expand face-vertex references against the pools.
    ///
    /// A reference whose position is missing or out of range is skipped
    /// entirely, which can leave a triangle short; that is accepted rather
    /// than corrected. UVs and normals fall back to zero and [`UP_NORMAL`]
    /// when the document has such data but the reference does not resolve.
    pub fn append_faces(&mut self, refs: &[FaceVertexRef], pools: &VertexPools) {
        let with_uvs = !pools.uvs.is_empty();
        let with_normals = !pools.normals.is_empty();
        if with_uvs && self.uvs.is_empty() {
            self.uvs.push(Vec::new());
        }

        for face_vertex in refs {
            let Some(position) = lookup(&pools.positions, face_vertex.position) else {
                continue;
            };
            let Some(index) = index_base(self.positions.len(), 0) else {
                log::warn!(
                    "Primitive '{}' ran out of u32 indices, remaining vertices dropped",
                    self.material_name
                );
                return;
            };
            self.positions.push(position);

            if with_uvs {
                let uv = lookup(&pools.uvs, face_vertex.uv).unwrap_or(Vec2::ZERO);
                self.uvs[0].push(uv);
            }
            if with_normals {
                let normal = lookup(&pools.normals, face_vertex.normal).unwrap_or(UP_NORMAL);
                self.normals.push(normal);
            }
            self.indices.push(index);
        }
    }

    /// Append another primitive with the same layout, re-basing its indices.
    /// Hands `other` back when the combined vertices would not be
    /// addressable by `u32`.
    fn absorb(&mut self, other: Primitive) -> Result<(), Primitive> {
        let Some(base) = index_base(self.positions.len(), other.positions.len()) else {
            return Err(other);
        };
        self.positions.extend(other.positions);
        for (channel, extra) in self.uvs.iter_mut().zip(other.uvs) {
            channel.extend(extra);
        }
        self.normals.extend(other.normals);
        self.indices.extend(other.indices.into_iter().map(|i| i + base));
        Ok(())
    }
}

/// `len` as the `u32` index of the next vertex, provided `len + extra`
/// vertices stay addressable.
fn index_base(len: usize, extra: usize) -> Option<u32> {
    u32::try_from(len.checked_add(extra)?).ok()?;
    u32::try_from(len).ok()
}

#[inline]
fn lookup<T: Copy>(pool: &[T], index: Option<u32>) -> Option<T> {
    index.and_then(|i| pool.get(i as usize).copied())
}

/// One level of detail: the primitives of one object, in file order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshLod {
    pub primitives: Vec<Primitive>,
}

impl MeshLod {
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.primitives.iter().map(Primitive::triangle_count).sum()
    }

    pub fn vertex_count(&self) -> usize {
        self.primitives.iter().map(|p| p.positions.len()).sum()
    }
}

/// Combines primitives that share a material.
pub trait PrimitiveMerge: Send + Sync {
    fn merge(&self, primitives: Vec<Primitive>) -> Vec<Primitive>;
}

/// Concatenates primitives with the same material handle and attribute
/// layout into the first of them. Order of first appearance is kept.
#[derive(Clone, Copy, Debug, Default)]
pub struct MergeByMaterial;

impl PrimitiveMerge for MergeByMaterial {
    fn merge(&self, primitives: Vec<Primitive>) -> Vec<Primitive> {
        let mut merged: Vec<Primitive> = Vec::with_capacity(primitives.len());
        for primitive in primitives {
            let rejected = match merged
                .iter_mut()
                .find(|m| m.material == primitive.material && m.layout_matches(&primitive))
            {
                Some(target) => target.absorb(primitive).err(),
                None => Some(primitive),
            };
            if let Some(primitive) = rejected {
                merged.push(primitive);
            }
        }
        merged
    }
}
