//! End-to-end conversion tests
//!
//! Scenes are built in code, converted into a [`RecordingReceiver`] or a
//! [`SceneWriter`] over memory, and checked statement by statement.

mod scenarios;

use crate::foundation::math::{Transform, Vec3};
use crate::geometry::{Polygon, RawMesh};
use crate::params::{ParamValues, ParameterSet};
use crate::receiver::{RecordingReceiver, Statement, Verb};
use crate::scene::{CameraData, NodeKind, SceneGraph, SceneNode};
use crate::settings::ExportSettings;

/// Settings with unit scale 1 and no header
fn plain_settings() -> ExportSettings {
    ExportSettings {
        unit_scale: 1.0,
        header: None,
        ..ExportSettings::default()
    }
}

fn camera_node() -> SceneNode {
    SceneNode::new("camera", NodeKind::Camera(CameraData::perspective(50.0)))
        .with_transform(Transform::from_position(Vec3::new(0.0, 0.0, -10.0)).to_matrix())
}

/// Unit square in the XY plane with one flat normal per corner
fn quad_mesh() -> RawMesh {
    RawMesh::new(
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ],
        vec![Polygon::quad(0, 1, 2, 3)],
    )
    .with_normals(vec![Vec3::z(); 4])
}

fn mesh_node(name: &str) -> SceneNode {
    SceneNode::new(name, NodeKind::Mesh(quad_mesh()))
}

/// Graph holding only a camera
fn graph_with_camera() -> SceneGraph {
    let mut graph = SceneGraph::new();
    graph.add_root(camera_node());
    graph
}

fn only<'a>(recorder: &'a RecordingReceiver, verb: Verb) -> &'a Statement {
    let mut found = recorder.with_verb(verb);
    let statement = found.next().unwrap_or_else(|| panic!("no {} statement", verb.keyword()));
    assert!(found.next().is_none(), "more than one {} statement", verb.keyword());
    statement
}

fn float_param(params: &ParameterSet, name: &str) -> f32 {
    match params.get(name).map(|e| e.values()) {
        Some(ParamValues::Float(values)) if values.len() == 1 => values[0],
        other => panic!("parameter {name} is not a single float: {other:?}"),
    }
}
