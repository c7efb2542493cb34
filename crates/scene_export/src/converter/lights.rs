//! Light source statements
//!
//! Every light is written inside its own attribute block under the light
//! node's converted world transform. Area lights divide their brightness by
//! the emitting area so that resizing a light keeps its total power.

use super::SceneConverter;
use crate::error::{ExportError, ExportResult};
use crate::foundation::math::{constants::PI, convert, Mat4, Vec3};
use crate::geometry::{DedupedMesh, Polygon, RawMesh};
use crate::params::{ParamError, ParameterSet};
use crate::receiver::SceneReceiver;
use crate::scene::{AreaShape, LightData, LightKind, NodeId, NodeKind, SceneError, SceneGraph};

/// Analytic primitive an area light can be written as
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AreaPrimitive {
    /// `Shape "disk"`
    Disk {
        /// Radius in target units
        radius: f32,
    },
    /// `Shape "sphere"`, optionally cut at `zmin`
    Sphere {
        /// Radius in target units
        radius: f32,
        /// Lower cut plane, `None` for a full sphere
        zmin: Option<f32>,
    },
    /// `Shape "cylinder"`
    Cylinder {
        /// Radius in target units
        radius: f32,
        /// Height in target units, centred on the origin
        height: f32,
    },
}

impl AreaPrimitive {
    /// Emitting surface area
    pub fn area(&self) -> f32 {
        match *self {
            Self::Disk { radius } => PI * radius * radius,
            Self::Sphere { radius, zmin: None } => 4.0 * PI * radius * radius,
            Self::Sphere { radius, zmin: Some(_) } => 2.0 * PI * radius * radius,
            Self::Cylinder { radius, height } => 2.0 * PI * radius * height,
        }
    }

    /// Fill `params` and return the shape type name
    pub fn to_params(&self, params: &mut ParameterSet) -> Result<&'static str, ParamError> {
        match *self {
            Self::Disk { radius } => {
                params.add_float("radius", radius)?;
                Ok("disk")
            }
            Self::Sphere { radius, zmin } => {
                params.add_float("radius", radius)?;
                if let Some(zmin) = zmin {
                    params.add_float("zmin", zmin)?;
                }
                Ok("sphere")
            }
            Self::Cylinder { radius, height } => {
                params.add_float("radius", radius)?;
                params.add_float("zmin", -height * 0.5)?;
                params.add_float("zmax", height * 0.5)?;
                Ok("cylinder")
            }
        }
    }
}

/// Quad mesh of a rectangle in the local XY plane, in source units
pub fn rectangle_mesh(width: f32, height: f32) -> RawMesh {
    let (x, y) = (width * 0.5, height * 0.5);
    RawMesh::new(
        vec![
            Vec3::new(-x, -y, 0.0),
            Vec3::new(x, -y, 0.0),
            Vec3::new(x, y, 0.0),
            Vec3::new(-x, y, 0.0),
        ],
        vec![Polygon::quad(0, 1, 2, 3)],
    )
}

/// Closed box mesh centred on the origin, in source units
pub fn cube_mesh(size: &Vec3) -> RawMesh {
    let h = size * 0.5;
    let points = (0..8)
        .map(|i| {
            Vec3::new(
                if i & 1 == 0 { -h.x } else { h.x },
                if i & 2 == 0 { -h.y } else { h.y },
                if i & 4 == 0 { -h.z } else { h.z },
            )
        })
        .collect();
    let polygons = vec![
        Polygon::quad(0, 2, 3, 1), // -z
        Polygon::quad(4, 5, 7, 6), // +z
        Polygon::quad(0, 1, 5, 4), // -y
        Polygon::quad(2, 6, 7, 3), // +y
        Polygon::quad(0, 4, 6, 2), // -x
        Polygon::quad(1, 3, 7, 5), // +x
    ];
    RawMesh::new(points, polygons)
}

/// Trianglemesh parameters of a processed mesh
pub(super) fn mesh_params(mesh: &DedupedMesh, params: &mut ParameterSet) -> Result<(), ParamError> {
    params.add_triangles("indices", &mesh.triangles)?;
    params.add_points("P", &mesh.points)?;
    if let Some(normals) = &mesh.normals {
        params.add_normals("N", normals)?;
    }
    Ok(())
}

fn emission_params(light: &LightData, gain: f32, params: &mut ParameterSet) -> Result<(), ParamError> {
    params.add_color("L", light.color)?;
    params.add_float("gain", gain)
}

impl SceneConverter {
    /// Write one light node
    pub(super) fn export_light(
        &mut self,
        graph: &SceneGraph,
        id: NodeId,
        light: &LightData,
        world: &Mat4,
        receiver: &mut dyn SceneReceiver,
    ) -> ExportResult<()> {
        let name = &graph.node(id)?.name;
        let type_name = match &light.kind {
            LightKind::Area(shape) => return self.export_area_light(graph, name, light, shape, world, receiver),
            LightKind::Unsupported(kind) => {
                log::warn!("Light '{}' has unsupported type '{}', skipping", name, kind);
                self.stats.skipped += 1;
                return Ok(());
            }
            LightKind::Point => "point",
            LightKind::Spot { .. } => "spot",
            LightKind::Distant => "distant",
        };

        let params = &mut self.params;
        params.clear();
        params.add_point("from", Vec3::zeros())?;
        match light.kind {
            LightKind::Spot { inner_angle, outer_angle } => {
                params.add_point("to", Vec3::z())?;
                params.add_float("coneangle", outer_angle * 0.5)?;
                params.add_float("conedeltaangle", ((outer_angle - inner_angle) * 0.5).max(0.0))?;
            }
            LightKind::Distant => params.add_point("to", Vec3::z())?,
            _ => {}
        }
        emission_params(light, light.brightness, params)?;

        receiver.attribute_begin()?;
        receiver.transform(&convert::world_matrix(world, self.settings.unit_scale))?;
        receiver.light_source(type_name, params)?;
        receiver.attribute_end()?;

        log::debug!("Exported {} light '{}'", type_name, name);
        self.stats.lights += 1;
        Ok(())
    }

    fn export_area_light(
        &mut self,
        graph: &SceneGraph,
        name: &str,
        light: &LightData,
        shape: &AreaShape,
        world: &Mat4,
        receiver: &mut dyn SceneReceiver,
    ) -> ExportResult<()> {
        let scale = self.settings.unit_scale;
        let primitive = match *shape {
            AreaShape::Disc { diameter } => AreaPrimitive::Disk {
                radius: diameter * 0.5 * scale,
            },
            AreaShape::Sphere { diameter } => AreaPrimitive::Sphere {
                radius: diameter * 0.5 * scale,
                zmin: None,
            },
            AreaShape::Hemisphere { diameter } => AreaPrimitive::Sphere {
                radius: diameter * 0.5 * scale,
                zmin: Some(0.0),
            },
            AreaShape::Cylinder { diameter, height } => AreaPrimitive::Cylinder {
                radius: diameter * 0.5 * scale,
                height: height * scale,
            },
            AreaShape::Rectangle { width, height } => {
                return self.export_area_mesh(name, light, &rectangle_mesh(width, height), world, receiver)
            }
            AreaShape::Cube { size } => {
                return self.export_area_mesh(name, light, &cube_mesh(&size), world, receiver)
            }
            AreaShape::Object { mesh } => return self.export_object_area_light(graph, name, light, mesh, receiver),
        };

        let area = primitive.area();
        if !(area > 0.0 && area.is_finite()) {
            log::warn!("Area light '{}' has no emitting area, skipping", name);
            self.stats.skipped += 1;
            return Ok(());
        }

        let params = &mut self.params;
        params.clear();
        emission_params(light, light.brightness / area, params)?;
        receiver.attribute_begin()?;
        receiver.transform(&convert::world_matrix(world, scale))?;
        receiver.area_light_source("area", params)?;
        params.clear();
        let shape_name = primitive.to_params(params)?;
        receiver.shape(shape_name, params)?;
        receiver.attribute_end()?;

        log::debug!("Exported area light '{}' as {} (area {})", name, shape_name, area);
        self.stats.lights += 1;
        Ok(())
    }

    /// Rectangle and box lights, written as triangle meshes
    fn export_area_mesh(
        &mut self,
        name: &str,
        light: &LightData,
        raw: &RawMesh,
        world: &Mat4,
        receiver: &mut dyn SceneReceiver,
    ) -> ExportResult<()> {
        let scale = self.settings.unit_scale;
        let mesh = self.cache.update(raw, false, scale)?;
        let area = mesh.surface_area();
        if !(area > 0.0 && area.is_finite()) {
            log::warn!("Area light '{}' has no emitting area, skipping", name);
            self.stats.skipped += 1;
            return Ok(());
        }

        let params = &mut self.params;
        params.clear();
        emission_params(light, light.brightness / area, params)?;
        receiver.attribute_begin()?;
        receiver.transform(&convert::world_matrix(world, scale))?;
        receiver.area_light_source("area", params)?;
        params.clear();
        mesh_params(mesh, params)?;
        receiver.shape("trianglemesh", params)?;
        receiver.attribute_end()?;

        self.stats.lights += 1;
        self.stats.triangles += mesh.triangle_count();
        Ok(())
    }

    /// Area light emitting from another mesh node's surface
    ///
    /// The mesh is written here under its own transform and left out of the
    /// geometry pass.
    fn export_object_area_light(
        &mut self,
        graph: &SceneGraph,
        name: &str,
        light: &LightData,
        mesh_id: NodeId,
        receiver: &mut dyn SceneReceiver,
    ) -> ExportResult<()> {
        let mesh_node = graph.node(mesh_id)?;
        let NodeKind::Mesh(raw) = &mesh_node.kind else {
            return Err(SceneError::UnknownReference {
                kind: "mesh",
                name: mesh_node.name.clone(),
            }
            .into());
        };
        let scale = self.settings.unit_scale;
        let world = graph.world_matrix(mesh_id)?;

        let mesh = self.cache.update(raw, self.settings.use_normals, scale)?;
        let area = mesh.surface_area();
        if mesh.is_empty() || !(area > 0.0 && area.is_finite()) {
            return Err(ExportError::EmptyAreaLightMesh {
                light: name.to_string(),
                mesh: mesh_node.name.clone(),
            });
        }
        self.area_light_meshes.insert(mesh_id);

        let params = &mut self.params;
        params.clear();
        emission_params(light, light.brightness / area, params)?;
        receiver.attribute_begin()?;
        receiver.transform(&convert::world_matrix(&world, scale))?;
        receiver.area_light_source("area", params)?;
        params.clear();
        mesh_params(mesh, params)?;
        receiver.shape("trianglemesh", params)?;
        receiver.attribute_end()?;

        log::debug!("Exported area light '{}' using mesh '{}'", name, mesh_node.name);
        self.stats.lights += 1;
        self.stats.triangles += mesh.triangle_count();
        Ok(())
    }
}
