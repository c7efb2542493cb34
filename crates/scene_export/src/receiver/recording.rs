//! In-memory receiver for headless testing
//!
//! RecordingReceiver keeps every statement it receives so tests can check
//! order and parameters without parsing text. It enforces the session
//! protocol like the writer does and can be told to fail on a given call.

use super::{SceneReceiver, Statement, Verb};
use crate::error::{ExportError, ExportResult};
use crate::foundation::math::{Mat4, Vec3};
use crate::params::ParameterSet;

/// Receiver that records statements
#[derive(Debug, Default)]
pub struct RecordingReceiver {
    statements: Vec<Statement>,
    headers: Vec<Option<String>>,
    open: bool,
    sessions_opened: usize,
    forced_closes: usize,
    calls: usize,
    fail_at: Option<usize>,
}

impl RecordingReceiver {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`-th statement call (0-based, session calls excluded)
    pub fn failing_at(n: usize) -> Self {
        Self {
            fail_at: Some(n),
            ..Self::default()
        }
    }

    /// Statements received in order
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Verbs received in order
    pub fn verbs(&self) -> Vec<Verb> {
        self.statements.iter().map(|s| s.verb).collect()
    }

    /// Statements with the given verb
    pub fn with_verb(&self, verb: Verb) -> impl Iterator<Item = &Statement> {
        self.statements.iter().filter(move |s| s.verb == verb)
    }

    /// Headers passed to `start_scene`, one per session
    pub fn headers(&self) -> &[Option<String>] {
        &self.headers
    }

    /// Whether a session is open
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Number of sessions opened so far
    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened
    }

    /// Sessions closed by a repeated `start_scene`
    pub fn forced_closes(&self) -> usize {
        self.forced_closes
    }

    fn record(&mut self, statement: Statement) -> ExportResult<()> {
        if !self.open {
            return Err(ExportError::SessionNotOpen);
        }
        let call = self.calls;
        self.calls += 1;
        if self.fail_at == Some(call) {
            return Err(ExportError::Receiver(format!(
                "injected failure at {} (call {})",
                statement.verb.keyword(),
                call
            )));
        }
        self.statements.push(statement);
        Ok(())
    }
}

impl SceneReceiver for RecordingReceiver {
    fn start_scene(&mut self, header: Option<&str>) -> ExportResult<()> {
        if self.open {
            log::warn!("Scene session already open, closing it before starting a new one");
            self.forced_closes += 1;
        }
        self.open = true;
        self.sessions_opened += 1;
        self.headers.push(header.map(str::to_string));
        Ok(())
    }

    fn end_scene(&mut self) -> ExportResult<()> {
        if !self.open {
            return Err(ExportError::SessionNotOpen);
        }
        self.open = false;
        Ok(())
    }

    fn film(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()> {
        self.record(Statement::new(Verb::Film, &[type_name], params))
    }

    fn camera(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()> {
        self.record(Statement::new(Verb::Camera, &[type_name], params))
    }

    fn look_at(&mut self, from: &Vec3, to: &Vec3, up: &Vec3) -> ExportResult<()> {
        let numbers = [from.x, from.y, from.z, to.x, to.y, to.z, up.x, up.y, up.z];
        self.record(Statement::numeric(Verb::LookAt, &numbers))
    }

    fn pixel_filter(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()> {
        self.record(Statement::new(Verb::PixelFilter, &[type_name], params))
    }

    fn sampler(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()> {
        self.record(Statement::new(Verb::Sampler, &[type_name], params))
    }

    fn surface_integrator(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()> {
        self.record(Statement::new(Verb::SurfaceIntegrator, &[type_name], params))
    }

    fn accelerator(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()> {
        self.record(Statement::new(Verb::Accelerator, &[type_name], params))
    }

    fn world_begin(&mut self) -> ExportResult<()> {
        self.record(Statement::bare(Verb::WorldBegin, &[]))
    }

    fn world_end(&mut self) -> ExportResult<()> {
        self.record(Statement::bare(Verb::WorldEnd, &[]))
    }

    fn attribute_begin(&mut self) -> ExportResult<()> {
        self.record(Statement::bare(Verb::AttributeBegin, &[]))
    }

    fn attribute_end(&mut self) -> ExportResult<()> {
        self.record(Statement::bare(Verb::AttributeEnd, &[]))
    }

    fn object_begin(&mut self, name: &str) -> ExportResult<()> {
        self.record(Statement::bare(Verb::ObjectBegin, &[name]))
    }

    fn object_end(&mut self) -> ExportResult<()> {
        self.record(Statement::bare(Verb::ObjectEnd, &[]))
    }

    fn light_source(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()> {
        self.record(Statement::new(Verb::LightSource, &[type_name], params))
    }

    fn area_light_source(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()> {
        self.record(Statement::new(Verb::AreaLightSource, &[type_name], params))
    }

    fn texture(&mut self, name: &str, value_kind: &str, type_name: &str, params: &ParameterSet) -> ExportResult<()> {
        self.record(Statement::new(Verb::Texture, &[name, value_kind, type_name], params))
    }

    fn material(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()> {
        self.record(Statement::new(Verb::Material, &[type_name], params))
    }

    fn transform(&mut self, matrix: &Mat4) -> ExportResult<()> {
        self.record(Statement::numeric(Verb::Transform, matrix.as_slice()))
    }

    fn shape(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()> {
        self.record(Statement::new(Verb::Shape, &[type_name], params))
    }

    fn portal_shape(&mut self, type_name: &str, params: &ParameterSet) -> ExportResult<()> {
        self.record(Statement::new(Verb::PortalShape, &[type_name], params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calls_outside_session_are_rejected() {
        let mut recorder = RecordingReceiver::new();
        assert!(matches!(recorder.world_begin(), Err(ExportError::SessionNotOpen)));
        assert!(matches!(recorder.end_scene(), Err(ExportError::SessionNotOpen)));
        assert!(recorder.statements().is_empty());
    }

    #[test]
    fn test_repeated_start_forces_close() {
        let mut recorder = RecordingReceiver::new();
        recorder.start_scene(Some("first")).unwrap();
        recorder.start_scene(Some("second")).unwrap();
        assert!(recorder.is_open());
        assert_eq!(recorder.sessions_opened(), 2);
        assert_eq!(recorder.forced_closes(), 1);
        recorder.end_scene().unwrap();
        assert!(!recorder.is_open());
    }

    #[test]
    fn test_injected_failure() {
        let mut recorder = RecordingReceiver::failing_at(1);
        recorder.start_scene(None).unwrap();
        recorder.world_begin().unwrap();
        assert!(matches!(recorder.attribute_begin(), Err(ExportError::Receiver(_))));
        assert_eq!(recorder.verbs(), [Verb::WorldBegin]);
    }
}
