//! Math utilities and types
//!
//! Provides the fundamental math types used by the scene graph, the camera and
//! the lighting pipeline. All matrices use nalgebra's column-vector convention,
//! so a model-view matrix is `view * model`.

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix3, Matrix4,
    Quaternion,
    Unit,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Transform representing position, rotation, and scale
///
/// This is the local (node-to-parent) transform stored on every scene node.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in parent space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Builder-style uniform scale
    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::new(scale, scale, scale);
        self
    }

    /// Convert to a transformation matrix (translation * rotation * scale)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }
}

/// Transform a position by a 4x4 matrix (w = 1, translation applies)
pub fn transform_point(matrix: &Mat4, point: &Vec3) -> Vec3 {
    let p = matrix * Vec4::new(point.x, point.y, point.z, 1.0);
    Vec3::new(p.x, p.y, p.z)
}

/// Transform a direction by a 4x4 matrix (w = 0, translation excluded)
pub fn transform_direction(matrix: &Mat4, direction: &Vec3) -> Vec3 {
    let d = matrix * Vec4::new(direction.x, direction.y, direction.z, 0.0);
    Vec3::new(d.x, d.y, d.z)
}

/// Math utility functions
pub mod utils {
    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees.to_radians()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transform_matrix_applies_scale_then_rotation_then_translation() {
        let rotation = Quat::from_axis_angle(&Vec3::z_axis(), std::f32::consts::FRAC_PI_2);
        let transform = Transform {
            position: Vec3::new(10.0, 0.0, 0.0),
            rotation,
            scale: Vec3::new(2.0, 2.0, 2.0),
        };

        let moved = transform_point(&transform.to_matrix(), &Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(moved, Vec3::new(10.0, 2.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_direction_ignores_translation() {
        let matrix = Mat4::new_translation(&Vec3::new(5.0, 6.0, 7.0));
        let direction = transform_direction(&matrix, &Vec3::new(0.0, -1.0, 0.0));
        assert_relative_eq!(direction, Vec3::new(0.0, -1.0, 0.0));

        let point = transform_point(&matrix, &Vec3::zeros());
        assert_relative_eq!(point, Vec3::new(5.0, 6.0, 7.0));
    }
}
