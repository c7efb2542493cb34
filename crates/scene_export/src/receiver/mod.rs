//! Statement receiver interface
//!
//! The converter never writes text itself. It drives a [`SceneReceiver`],
//! one method per statement of the scene-description protocol, and stops at
//! the first error a method returns. [`crate::writer::SceneWriter`] turns the
//! calls into text; [`RecordingReceiver`] keeps them in memory for tests.
//!
//! Parameter sets are lent for the duration of a call only; receivers that
//! keep them must clone.

mod recording;

pub use recording::RecordingReceiver;

use crate::error::ExportResult;
use crate::foundation::math::{Mat4, Vec3};
use crate::params::ParameterSet;

/// Protocol verbs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Image output
    Film,
    /// Camera projection
    Camera,
    /// Camera placement
    LookAt,
    /// Reconstruction filter
    PixelFilter,
    /// Sample generator
    Sampler,
    /// Light transport algorithm
    SurfaceIntegrator,
    /// Intersection acceleration structure
    Accelerator,
    /// Start of scene content
    WorldBegin,
    /// End of scene content
    WorldEnd,
    /// Push graphics state
    AttributeBegin,
    /// Pop graphics state
    AttributeEnd,
    /// Start of a named instance definition
    ObjectBegin,
    /// End of an instance definition
    ObjectEnd,
    /// Light source
    LightSource,
    /// Emission for the following shapes
    AreaLightSource,
    /// Texture definition
    Texture,
    /// Surface material
    Material,
    /// Replace the current transform
    Transform,
    /// Geometry
    Shape,
    /// Light portal geometry
    PortalShape,
}

impl Verb {
    /// Keyword as written in scene files
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Film => "Film",
            Self::Camera => "Camera",
            Self::LookAt => "LookAt",
            Self::PixelFilter => "PixelFilter",
            Self::Sampler => "Sampler",
            Self::SurfaceIntegrator => "SurfaceIntegrator",
            Self::Accelerator => "Accelerator",
            Self::WorldBegin => "WorldBegin",
            Self::WorldEnd => "WorldEnd",
            Self::AttributeBegin => "AttributeBegin",
            Self::AttributeEnd => "AttributeEnd",
            Self::ObjectBegin => "ObjectBegin",
            Self::ObjectEnd => "ObjectEnd",
            Self::LightSource => "LightSource",
            Self::AreaLightSource => "AreaLightSource",
            Self::Texture => "Texture",
            Self::Material => "Material",
            Self::Transform => "Transform",
            Self::Shape => "Shape",
            Self::PortalShape => "PortalShape",
        }
    }

    /// Block delimiters and markers that take no parameters
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            Self::WorldBegin
                | Self::WorldEnd
                | Self::AttributeBegin
                | Self::AttributeEnd
                | Self::ObjectBegin
                | Self::ObjectEnd
        )
    }
}

/// One receiver call captured as data
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Protocol verb
    pub verb: Verb,
    /// Quoted identifiers following the verb (type name, texture name, ...)
    pub ids: Vec<String>,
    /// Named parameters
    pub params: ParameterSet,
    /// Bare numbers: 9 for `LookAt`, 16 column-major for `Transform`
    pub numbers: Vec<f32>,
}

impl Statement {
    /// Statement with identifiers and parameters
    pub fn new(verb: Verb, ids: &[&str], params: &ParameterSet) -> Self {
        Self {
            verb,
            ids: ids.iter().map(|id| (*id).to_string()).collect(),
            params: params.clone(),
            numbers: Vec::new(),
        }
    }

    /// Statement without parameters
    pub fn bare(verb: Verb, ids: &[&str]) -> Self {
        Self::new(verb, ids, &ParameterSet::new(0))
    }

    /// Statement carrying bare numbers
    pub fn numeric(verb: Verb, numbers: &[f32]) -> Self {
        Self {
            numbers: numbers.to_vec(),
            ..Self::bare(verb, &[])
        }
    }

    /// First identifier, usually the type name
    pub fn type_name(&self) -> Option<&str> {
        self.ids.first().map(String::as_str)
    }

    /// Send this statement to another receiver
    pub fn replay(&self, receiver: &mut dyn SceneReceiver) -> ExportResult<()> {
        let id = |i: usize| self.ids.get(i).map_or("", String::as_str);
        let triple = |i: usize| {
            let n = |j: usize| self.numbers.get(i * 3 + j).copied().unwrap_or(0.0);
            Vec3::new(n(0), n(1), n(2))
        };
        match self.verb {
            Verb::Film => receiver.film(id(0), &self.params),
            Verb::Camera => receiver.camera(id(0), &self.params),
            Verb::LookAt => receiver.look_at(&triple(0), &triple(1), &triple(2)),
            Verb::PixelFilter => receiver.pixel_filter(id(0), &self.params),
            Verb::Sampler => receiver.sampler(id(0), &self.params),
            Verb::SurfaceIntegrator => receiver.surface_integrator(id(0), &self.params),
            Verb::Accelerator => receiver.accelerator(id(0), &self.params),
            Verb::WorldBegin => receiver.world_begin(),
            Verb::WorldEnd => receiver.world_end(),
            Verb::AttributeBegin => receiver.attribute_begin(),
            Verb::AttributeEnd => receiver.attribute_end(),
            Verb::ObjectBegin => receiver.object_begin(id(0)),
            Verb::ObjectEnd => receiver.object_end(),
            Verb::LightSource => receiver.light_source(id(0), &self.params),
            Verb::AreaLightSource => receiver.area_light_source(id(0), &self.params),
            Verb::Texture => receiver.texture(id(0), id(1), id(2), &self.params),
            Verb::Material => receiver.material(id(0), &self.params),
            Verb::Transform => {
                let matrix = if self.numbers.len() == 16 {
                    Mat4::from_column_slice(&self.numbers)
                } else {
                    Mat4::identity()
                };
                receiver.transform(&matrix)
            }
            Verb::Shape => receiver.shape(id(0), &self.params),
            Verb::PortalShape => receiver.portal_shape(id(0), &self.params),
        }
    }
}

/// Consumer of scene-description statements
///
/// Calls outside a `start_scene`/`end_scene` session are protocol misuse.
pub trait SceneReceiver {
    /// Open a session, writing `header` as a comment if given
    fn start_scene(&mut self, header: Option<&str>) -> ExportResult<()>;
    /// Close the session and release the output
    fn end_scene(&mut self) -> ExportResult<()>;

    /// `Film`
    fn film(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()>;
    /// `Camera`
    fn camera(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()>;
    /// `LookAt`
    fn look_at(&mut self, from: &Vec3, to: &Vec3, up: &Vec3) -> ExportResult<()>;
    /// `PixelFilter`
    fn pixel_filter(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()>;
    /// `Sampler`
    fn sampler(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()>;
    /// `SurfaceIntegrator`
    fn surface_integrator(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()>;
    /// `Accelerator`
    fn accelerator(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()>;

    /// `WorldBegin`
    fn world_begin(&mut self) -> ExportResult<()>;
    /// `WorldEnd`
    fn world_end(&mut self) -> ExportResult<()>;
    /// `AttributeBegin`
    fn attribute_begin(&mut self) -> ExportResult<()>;
    /// `AttributeEnd`
    fn attribute_end(&mut self) -> ExportResult<()>;
    /// `ObjectBegin`
    fn object_begin(&mut self, name: &str) -> ExportResult<()>;
    /// `ObjectEnd`
    fn object_end(&mut self) -> ExportResult<()>;

    /// `LightSource`
    fn light_source(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()>;
    /// `AreaLightSource`
    fn area_light_source(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()>;
    /// `Texture "<name>" "<value kind>" "<type>"`
    fn texture(&mut self, name: &str, value_kind: &str, type_name: &str, params: &ParameterSet) -> ExportResult<()>;
    /// `Material`
    fn material(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()>;
    /// `Transform`
    fn transform(&mut self, matrix: &Mat4) -> ExportResult<()>;
    /// `Shape`
    fn shape(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()>;
    /// `PortalShape`
    fn portal_shape(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()>;
}
