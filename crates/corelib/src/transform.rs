use crate::{EulerRot, Mat4, Quat, Vec3};

/// Maps positions and directions read from a source file into the
/// coordinate system of the consumer.
pub trait CoordinateTransform: Send + Sync {
    fn transform_position(&self, position: Vec3) -> Vec3;

    /// Directions ignore translation. Unit input gives unit output.
    fn transform_vector(&self, vector: Vec3) -> Vec3;
}

/// Rigid transform with uniform or non-uniform scale (Euler XYZ).
#[derive(Clone, Copy, Debug)]
pub struct Transform {
    pub translation: Vec3,
    /// Euler angles in radians (XYZ order).
    pub rotation_euler: Vec3,
    pub scale: Vec3,
}

impl Transform {
    #[inline]
    pub const fn identity() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation_euler: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }

    #[inline]
    pub fn from_trs(translation: Vec3, rotation_euler: Vec3, scale: Vec3) -> Self {
        Self {
            translation,
            rotation_euler,
            scale,
        }
    }

    /// Uniform scale only, e.g. meters to centimeters.
    #[inline]
    pub fn from_scale(scale: f32) -> Self {
        Self {
            scale: Vec3::splat(scale),
            ..Self::identity()
        }
    }

    /// Build matrix = T * R * S (column-major Mat4 per glam).
    #[inline]
    pub fn matrix(&self) -> Mat4 {
        let q = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation_euler.x,
            self.rotation_euler.y,
            self.rotation_euler.z,
        );
        Mat4::from_scale_rotation_translation(self.scale, q, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl CoordinateTransform for Transform {
    fn transform_position(&self, position: Vec3) -> Vec3 {
        self.matrix().transform_point3(position)
    }

    fn transform_vector(&self, vector: Vec3) -> Vec3 {
        // Inverse transpose keeps normals perpendicular under non-uniform scale.
        let normal_matrix = self.matrix().inverse().transpose();
        normal_matrix.transform_vector3(vector).normalize_or_zero()
    }
}
