//! Text serializer for the scene-description protocol
//!
//! [`SceneWriter`] implements [`SceneReceiver`] by formatting each call and
//! writing it to a sink opened per session.
//!
//! ## Layout
//!
//! ```text
//! # Exported by scene_export
//!
//! Film "fleximage"
//!   "integer xresolution" [640]
//!
//! WorldBegin
//!
//! AttributeBegin
//!   Transform [1 0 0 0 0 0 1 0 0 1 0 0 0 0 0 1]
//!   Shape "trianglemesh"
//!     "integer indices" [
//!       0 2 1
//!       0 3 2
//!     ]
//! AttributeEnd
//!
//! WorldEnd
//!
//! ```
//!
//! Statements at nesting level zero are followed by a blank line; block
//! contents are indented two spaces per level.

pub mod format;
mod sink;

pub use sink::{FileSink, MemorySink, SharedBuffer, SinkFactory};

use std::io::Write;

use crate::error::{ExportError, ExportResult};
use crate::foundation::math::{Mat4, Vec3};
use crate::params::ParameterSet;
use crate::receiver::{SceneReceiver, Verb};

/// Receiver that writes scene-description text
pub struct SceneWriter<F: SinkFactory> {
    factory: F,
    sink: Option<F::Sink>,
    depth: usize,
    sessions_opened: usize,
    line: String,
}

impl<F: SinkFactory> SceneWriter<F> {
    /// Create a writer; nothing is opened until `start_scene`
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            sink: None,
            depth: 0,
            sessions_opened: 0,
            line: String::new(),
        }
    }

    /// Whether a session is open
    pub fn is_open(&self) -> bool {
        self.sink.is_some()
    }

    /// Number of sessions opened over the writer's lifetime
    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened
    }

    /// Current block nesting depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The sink factory
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Consume the writer, returning the sink factory
    pub fn into_factory(self) -> F {
        self.factory
    }

    fn close_session(&mut self) -> ExportResult<()> {
        let mut sink = self.sink.take().ok_or(ExportError::SessionNotOpen)?;
        if self.depth != 0 {
            log::warn!("Closing scene output with {} unterminated block(s)", self.depth);
        }
        self.depth = 0;
        sink.flush()?;
        log::debug!("Closed scene output {}", self.factory.describe());
        Ok(())
    }

    fn emit(&mut self, level: usize, blank_after: bool, build: impl FnOnce(&mut String, usize)) -> ExportResult<()> {
        let sink = self.sink.as_mut().ok_or(ExportError::SessionNotOpen)?;
        self.line.clear();
        build(&mut self.line, level);
        if blank_after {
            self.line.push('\n');
        }
        sink.write_all(self.line.as_bytes())?;
        Ok(())
    }

    fn statement(&mut self, verb: Verb, ids: &[&str], params: &ParameterSet) -> ExportResult<()> {
        log::trace!("{} {:?} ({} params)", verb.keyword(), ids, params.len());
        let depth = self.depth;
        self.emit(depth, depth == 0, |out, level| {
            format::write_statement(out, verb.keyword(), ids, params, level);
        })
    }

    fn begin_block(&mut self, verb: Verb, ids: &[&str]) -> ExportResult<()> {
        let depth = self.depth;
        self.emit(depth, false, |out, level| {
            format::write_statement(out, verb.keyword(), ids, &ParameterSet::new(0), level);
        })?;
        self.depth += 1;
        Ok(())
    }

    fn end_block(&mut self, verb: Verb) -> ExportResult<()> {
        if self.sink.is_none() {
            return Err(ExportError::SessionNotOpen);
        }
        if self.depth == 0 {
            return Err(ExportError::UnbalancedBlock(verb.keyword()));
        }
        self.depth -= 1;
        let depth = self.depth;
        self.emit(depth, depth == 0, |out, level| {
            format::write_statement(out, verb.keyword(), &[], &ParameterSet::new(0), level);
        })
    }
}

impl<F: SinkFactory> SceneReceiver for SceneWriter<F> {
    fn start_scene(&mut self, header: Option<&str>) -> ExportResult<()> {
        if self.is_open() {
            log::warn!(
                "Scene output {} is still open, closing it before starting a new session",
                self.factory.describe()
            );
            self.close_session()?;
        }

        let mut sink = self.factory.open()?;
        self.sessions_opened += 1;
        self.depth = 0;
        log::debug!("Opened scene output {}", self.factory.describe());

        if let Some(header) = header {
            for line in header.lines() {
                writeln!(sink, "# {line}")?;
            }
            writeln!(sink)?;
        }
        self.sink = Some(sink);
        Ok(())
    }

    fn end_scene(&mut self) -> ExportResult<()> {
        self.close_session()
    }

    fn film(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()> {
        self.statement(Verb::Film, &[type_name], params)
    }

    fn camera(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()> {
        self.statement(Verb::Camera, &[type_name], params)
    }

    fn look_at(&mut self, from: &Vec3, to: &Vec3, up: &Vec3) -> ExportResult<()> {
        let numbers = [from.x, from.y, from.z, to.x, to.y, to.z, up.x, up.y, up.z];
        let depth = self.depth;
        self.emit(depth, depth == 0, |out, level| {
            format::write_numeric(out, Verb::LookAt.keyword(), &numbers, false, level);
        })
    }

    fn pixel_filter(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()> {
        self.statement(Verb::PixelFilter, &[type_name], params)
    }

    fn sampler(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()> {
        self.statement(Verb::Sampler, &[type_name], params)
    }

    fn surface_integrator(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()> {
        self.statement(Verb::SurfaceIntegrator, &[type_name], params)
    }

    fn accelerator(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()> {
        self.statement(Verb::Accelerator, &[type_name], params)
    }

    fn world_begin(&mut self) -> ExportResult<()> {
        self.statement(Verb::WorldBegin, &[], &ParameterSet::new(0))
    }

    fn world_end(&mut self) -> ExportResult<()> {
        self.statement(Verb::WorldEnd, &[], &ParameterSet::new(0))
    }

    fn attribute_begin(&mut self) -> ExportResult<()> {
        self.begin_block(Verb::AttributeBegin, &[])
    }

    fn attribute_end(&mut self) -> ExportResult<()> {
        self.end_block(Verb::AttributeEnd)
    }

    fn object_begin(&mut self, name: &str) -> ExportResult<()> {
        self.begin_block(Verb::ObjectBegin, &[name])
    }

    fn object_end(&mut self) -> ExportResult<()> {
        self.end_block(Verb::ObjectEnd)
    }

    fn light_source(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()> {
        self.statement(Verb::LightSource, &[type_name], params)
    }

    fn area_light_source(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()> {
        self.statement(Verb::AreaLightSource, &[type_name], params)
    }

    fn texture(&mut self, name: &str, value_kind: &str, type_name: &str, params: &ParameterSet) -> ExportResult<()> {
        self.statement(Verb::Texture, &[name, value_kind, type_name], params)
    }

    fn material(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()> {
        self.statement(Verb::Material, &[type_name], params)
    }

    fn transform(&mut self, matrix: &Mat4) -> ExportResult<()> {
        let depth = self.depth;
        self.emit(depth, depth == 0, |out, level| {
            format::write_numeric(out, Verb::Transform.keyword(), matrix.as_slice(), true, level);
        })
    }

    fn shape(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()> {
        self.statement(Verb::Shape, &[type_name], params)
    }

    fn portal_shape(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()> {
        self.statement(Verb::PortalShape, &[type_name], params)
    }
}
