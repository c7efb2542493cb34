//! Math utilities and types
//!
//! Provides the math types used by the exporter and the conversion from the
//! source scene's coordinate system into the target renderer's.
//!
//! # Coordinate Systems
//! - Source: left-handed, Y-up (X right, Y up, Z forward into the screen)
//! - Target: right-handed, Z-up (X right, Y forward, Z up)
//!
//! Swapping the Y and Z axes maps one onto the other. The swap has a negative
//! determinant, so triangle winding must be flipped when geometry is written
//! in object space (see `geometry`).

pub use nalgebra::{
    Vector3,
    Matrix3, Matrix4,
    Quaternion,
    Unit,
};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Linear RGB color
pub type Color = Vec3;

/// Transform representing position, rotation, and scale in source space
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position relative to the parent
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

    /// Create a transform from heading/pitch/bank angles in degrees
    ///
    /// Heading rotates about Y, pitch about X and bank about Z, applied in
    /// that order (bank first).
    pub fn from_hpb_degrees(position: Vec3, hpb: Vec3, scale: Vec3) -> Self {
        let heading = Quat::from_axis_angle(&Vec3::y_axis(), utils::deg_to_rad(hpb.x));
        let pitch = Quat::from_axis_angle(&Vec3::x_axis(), utils::deg_to_rad(hpb.y));
        let bank = Quat::from_axis_angle(&Vec3::z_axis(), utils::deg_to_rad(hpb.z));
        Self {
            position,
            rotation: heading * pitch * bank,
            scale,
        }
    }

    /// Convert to a transformation matrix
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * constants::RAD_TO_DEG
    }
}

/// Source-to-target coordinate conversion
pub mod convert {
    use super::{Mat4, Vec3};

    /// Matrix swapping the Y and Z axes
    pub fn axis_swap() -> Mat4 {
        Mat4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Convert a source world matrix into a target-space object transform
    ///
    /// The linear part is left untouched because object-space points are
    /// already multiplied by `unit_scale`; only the translation is scaled.
    pub fn world_matrix(world: &Mat4, unit_scale: f32) -> Mat4 {
        let mut m = axis_swap() * world;
        for row in 0..3 {
            m[(row, 3)] *= unit_scale;
        }
        m
    }

    /// Convert a source world-space position into target space
    pub fn point(p: &Vec3, unit_scale: f32) -> Vec3 {
        Vec3::new(p.x, p.z, p.y) * unit_scale
    }

    /// Convert a source direction into target space
    pub fn direction(v: &Vec3) -> Vec3 {
        Vec3::new(v.x, v.z, v.y)
    }
}
