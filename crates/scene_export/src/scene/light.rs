//! Light and camera node data
//!
//! Light data is generic over how an object-shaped area light refers to its
//! mesh: by [`NodeId`] inside a built graph, by name inside a scene document.

use serde::{Deserialize, Serialize};

use super::NodeId;
use crate::foundation::math::{Color, Vec3};

/// Emitting shape of an area light
///
/// Dimensions are in source units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AreaShape<R = NodeId> {
    /// Flat disc facing local +Z
    Disc {
        /// Disc diameter
        diameter: f32,
    },
    /// Flat rectangle in the local XY plane
    Rectangle {
        /// Extent along local X
        width: f32,
        /// Extent along local Y
        height: f32,
    },
    /// Full sphere
    Sphere {
        /// Sphere diameter
        diameter: f32,
    },
    /// Open cylinder along local +Z
    Cylinder {
        /// Cylinder diameter
        diameter: f32,
        /// Extent along local Z, centred on the origin
        height: f32,
    },
    /// Axis-aligned box
    Cube {
        /// Edge lengths
        size: Vec3,
    },
    /// Upper half of a sphere
    Hemisphere {
        /// Diameter of the full sphere
        diameter: f32,
    },
    /// Surface of another mesh node
    Object {
        /// Mesh whose surface emits
        mesh: R,
    },
}

impl<R> AreaShape<R> {
    /// Replace the mesh reference of an object shape
    pub fn try_map_ref<S, E>(self, f: impl FnOnce(R) -> Result<S, E>) -> Result<AreaShape<S>, E> {
        Ok(match self {
            Self::Disc { diameter } => AreaShape::Disc { diameter },
            Self::Rectangle { width, height } => AreaShape::Rectangle { width, height },
            Self::Sphere { diameter } => AreaShape::Sphere { diameter },
            Self::Cylinder { diameter, height } => AreaShape::Cylinder { diameter, height },
            Self::Cube { size } => AreaShape::Cube { size },
            Self::Hemisphere { diameter } => AreaShape::Hemisphere { diameter },
            Self::Object { mesh } => AreaShape::Object { mesh: f(mesh)? },
        })
    }
}

/// Light source type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LightKind<R = NodeId> {
    /// Omnidirectional light at the node origin
    Point,
    /// Cone along local +Z; angles are full cone angles in degrees
    Spot {
        /// Angle of the fully lit core
        inner_angle: f32,
        /// Angle where the falloff reaches zero
        outer_angle: f32,
    },
    /// Parallel light along local +Z
    Distant,
    /// Emitting surface
    Area(AreaShape<R>),
    /// A light type the target renderer has no equivalent for
    Unsupported(String),
}

/// Light node payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightData<R = NodeId> {
    /// Light type
    pub kind: LightKind<R>,
    /// Linear emission colour
    #[serde(default = "default_light_color")]
    pub color: Color,
    /// Emitted power multiplier
    #[serde(default = "default_brightness")]
    pub brightness: f32,
}

fn default_light_color() -> Color {
    Color::new(1.0, 1.0, 1.0)
}

fn default_brightness() -> f32 {
    1.0
}

impl<R> LightData<R> {
    /// Create a white light of unit brightness
    pub fn new(kind: LightKind<R>) -> Self {
        Self {
            kind,
            color: default_light_color(),
            brightness: default_brightness(),
        }
    }

    /// Set colour and brightness
    pub fn with_emission(mut self, color: Color, brightness: f32) -> Self {
        self.color = color;
        self.brightness = brightness;
        self
    }

    /// Replace the mesh reference of an object-shaped area light
    pub fn try_map_ref<S, E>(self, f: impl FnOnce(R) -> Result<S, E>) -> Result<LightData<S>, E> {
        let kind = match self.kind {
            LightKind::Point => LightKind::Point,
            LightKind::Spot { inner_angle, outer_angle } => LightKind::Spot { inner_angle, outer_angle },
            LightKind::Distant => LightKind::Distant,
            LightKind::Area(shape) => LightKind::Area(shape.try_map_ref(f)?),
            LightKind::Unsupported(name) => LightKind::Unsupported(name),
        };
        Ok(LightData {
            kind,
            color: self.color,
            brightness: self.brightness,
        })
    }
}

/// Camera projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    /// Pinhole or thin-lens camera
    Perspective {
        /// Horizontal field of view in degrees
        fov_degrees: f32,
    },
    /// Parallel projection
    Orthographic {
        /// Visible width in source units
        width: f32,
    },
}

/// Camera node payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraData {
    /// Projection model
    pub projection: Projection,
    /// Thin-lens aperture radius in source units, 0 for a pinhole
    #[serde(default)]
    pub lens_radius: f32,
    /// Focus distance in source units
    #[serde(default)]
    pub focal_distance: Option<f32>,
}

impl CameraData {
    /// Pinhole perspective camera
    pub fn perspective(fov_degrees: f32) -> Self {
        Self {
            projection: Projection::Perspective { fov_degrees },
            lens_radius: 0.0,
            focal_distance: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_ref_resolves_object_shape() {
        let light: LightData<String> = LightData::new(LightKind::Area(AreaShape::Object { mesh: "panel".to_string() }));
        let mapped: Result<LightData<usize>, ()> = light.try_map_ref(|name| Ok(name.len()));
        assert_eq!(mapped.unwrap().kind, LightKind::Area(AreaShape::Object { mesh: 5 }));
    }

    #[test]
    fn test_map_ref_keeps_primitive_shapes() {
        let light: LightData<String> =
            LightData::new(LightKind::Area(AreaShape::Disc { diameter: 10.0 })).with_emission(Color::new(1.0, 0.5, 0.25), 4.0);
        let mapped: LightData<u8> = light.try_map_ref(|_| Err("unused")).unwrap();
        assert_eq!(mapped.kind, LightKind::Area(AreaShape::Disc { diameter: 10.0 }));
        assert_eq!(mapped.brightness, 4.0);
    }

    #[test]
    fn test_light_from_ron() {
        let light: LightData<String> = ron::from_str("(kind: Spot(inner_angle: 20.0, outer_angle: 40.0))").unwrap();
        assert_eq!(light.kind, LightKind::Spot { inner_angle: 20.0, outer_angle: 40.0 });
        assert_eq!(light.color, Color::new(1.0, 1.0, 1.0));
    }
}
