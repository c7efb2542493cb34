//! Film, camera and renderer statements

use super::SceneConverter;
use crate::error::{ExportError, ExportResult};
use crate::foundation::math::{convert, utils, Mat4, Point3, Vec3};
use crate::params::{ParamError, ParameterSet};
use crate::receiver::SceneReceiver;
use crate::scene::{CameraData, NodeId, NodeKind, Projection, SceneError, SceneGraph};
use crate::settings::FilmSettings;

/// Eye, target and up vector in target space
pub fn look_at(world: &Mat4, unit_scale: f32) -> (Vec3, Vec3, Vec3) {
    let eye = world.transform_point(&Point3::origin()).coords;
    let forward = world
        .transform_vector(&Vec3::z())
        .try_normalize(f32::EPSILON)
        .unwrap_or_else(Vec3::z);
    let up = world
        .transform_vector(&Vec3::y())
        .try_normalize(f32::EPSILON)
        .unwrap_or_else(Vec3::y);

    let eye = convert::point(&eye, unit_scale);
    (eye, eye + convert::direction(&forward), convert::direction(&up))
}

/// Field of view of the shorter image side, from a horizontal one
pub fn shorter_side_fov(horizontal_degrees: f32, aspect_ratio: f32) -> f32 {
    if aspect_ratio <= 1.0 {
        return horizontal_degrees;
    }
    let half = utils::deg_to_rad(horizontal_degrees) * 0.5;
    utils::rad_to_deg(2.0 * (half.tan() / aspect_ratio).atan())
}

/// Fill `params` for the camera and return its type name
pub fn camera_params(
    camera: &CameraData,
    film: &FilmSettings,
    unit_scale: f32,
    params: &mut ParameterSet,
) -> Result<&'static str, ParamError> {
    let aspect = film.aspect_ratio();
    let type_name = match camera.projection {
        Projection::Perspective { fov_degrees } => {
            params.add_float("fov", shorter_side_fov(fov_degrees, aspect))?;
            "perspective"
        }
        Projection::Orthographic { width } => {
            let half_w = width * unit_scale * 0.5;
            let half_h = half_w / aspect;
            params.add_floats("screenwindow", &[-half_w, half_w, -half_h, half_h])?;
            "orthographic"
        }
    };
    if camera.lens_radius > 0.0 {
        params.add_float("lensradius", camera.lens_radius * unit_scale)?;
    }
    if let Some(distance) = camera.focal_distance {
        params.add_float("focaldistance", distance * unit_scale)?;
    }
    Ok(type_name)
}

impl SceneConverter {
    /// Everything ahead of `WorldBegin`
    pub(super) fn export_globals(
        &mut self,
        graph: &SceneGraph,
        camera: NodeId,
        receiver: &mut dyn SceneReceiver,
    ) -> ExportResult<()> {
        let settings = &self.settings;
        let params = &mut self.params;

        params.clear();
        settings.film.to_params(params)?;
        receiver.film("fleximage", params)?;

        let node = graph.node(camera)?;
        let NodeKind::Camera(data) = &node.kind else {
            return Err(ExportError::Scene(SceneError::NotACamera(node.name.clone())));
        };
        let (eye, target, up) = look_at(&graph.world_matrix(camera)?, settings.unit_scale);
        receiver.look_at(&eye, &target, &up)?;
        params.clear();
        let projection = camera_params(data, &settings.film, settings.unit_scale, params)?;
        receiver.camera(projection, params)?;
        log::debug!("Camera '{}' at {:?}", node.name, eye.as_slice());

        params.clear();
        settings.pixel_filter.to_params(params)?;
        receiver.pixel_filter(settings.pixel_filter.type_name(), params)?;

        params.clear();
        settings.sampler.to_params(params)?;
        receiver.sampler(settings.sampler.type_name(), params)?;

        params.clear();
        settings.integrator.to_params(params)?;
        receiver.surface_integrator(settings.integrator.type_name(), params)?;

        params.clear();
        receiver.accelerator(settings.accelerator.type_name(), params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Transform;
    use crate::params::ParamValues;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_look_at_from_identity() {
        let (eye, target, up) = look_at(&Mat4::identity(), 1.0);
        assert_relative_eq!(eye, Vec3::zeros(), epsilon = EPSILON);
        // Source +Z (forward) becomes target +Y, source +Y (up) becomes target +Z.
        assert_relative_eq!(target, Vec3::new(0.0, 1.0, 0.0), epsilon = EPSILON);
        assert_relative_eq!(up, Vec3::new(0.0, 0.0, 1.0), epsilon = EPSILON);
    }

    #[test]
    fn test_look_at_scales_position_only() {
        let world = Transform::from_hpb_degrees(
            Vec3::new(0.0, 100.0, -500.0),
            Vec3::new(90.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
        )
        .to_matrix();
        let (eye, target, _) = look_at(&world, 0.01);
        assert_relative_eq!(eye, Vec3::new(0.0, -5.0, 1.0), epsilon = EPSILON);
        assert_relative_eq!((target - eye).norm(), 1.0, epsilon = EPSILON);
        assert_relative_eq!(target - eye, Vec3::new(1.0, 0.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_fov_uses_shorter_side() {
        assert_relative_eq!(shorter_side_fov(90.0, 1.0), 90.0, epsilon = EPSILON);
        assert_relative_eq!(shorter_side_fov(60.0, 0.5), 60.0, epsilon = EPSILON);
        // tan(45°) / 2 = 0.5 -> 2 * atan(0.5)
        assert_relative_eq!(shorter_side_fov(90.0, 2.0), 53.130_1, epsilon = 1e-3);
    }

    #[test]
    fn test_thin_lens_parameters_are_scaled() {
        let camera = CameraData {
            projection: Projection::Perspective { fov_degrees: 40.0 },
            lens_radius: 2.0,
            focal_distance: Some(300.0),
        };
        let mut params = ParameterSet::default();
        let type_name = camera_params(&camera, &FilmSettings::default(), 0.01, &mut params).unwrap();

        assert_eq!(type_name, "perspective");
        let names: Vec<_> = params.iter().map(|e| e.name()).collect();
        assert_eq!(names, ["fov", "lensradius", "focaldistance"]);
        match params.get("focaldistance").map(|e| e.values()) {
            Some(ParamValues::Float(v)) => assert_relative_eq!(v[0], 3.0, epsilon = EPSILON),
            other => panic!("unexpected focaldistance {:?}", other),
        }
    }

    #[test]
    fn test_orthographic_screen_window() {
        let camera = CameraData {
            projection: Projection::Orthographic { width: 400.0 },
            lens_radius: 0.0,
            focal_distance: None,
        };
        let mut film = FilmSettings::default();
        film.xresolution = 200;
        film.yresolution = 100;
        let mut params = ParameterSet::default();
        assert_eq!(camera_params(&camera, &film, 0.01, &mut params).unwrap(), "orthographic");
        assert_eq!(
            params.get("screenwindow").map(|e| e.values().clone()),
            Some(ParamValues::Float(vec![-2.0, 2.0, -1.0, 1.0]))
        );
    }
}
