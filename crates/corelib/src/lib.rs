//! Core types: math re-exports, Transform and the coordinate transform seam.

pub use glam::{EulerRot, Mat4, Quat, Vec2, Vec3, Vec4, vec2, vec3, vec4};

pub mod transform;

pub use transform::{CoordinateTransform, Transform};
