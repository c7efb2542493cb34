//! Conversion scenarios checked against recorded statements

use std::rc::Rc;

use approx::assert_relative_eq;

use super::*;
use crate::converter::{ConvertState, SceneConverter};
use crate::error::ExportError;
use crate::foundation::math::constants::PI;
use crate::receiver::SceneReceiver;
use crate::scene::{
    AreaShape, Channel, LightData, LightKind, MaterialDef, MaterialKind, NodeFlags, RenderLayer, TextureDef, Visibility,
};

fn convert(graph: &SceneGraph, settings: ExportSettings) -> (RecordingReceiver, crate::converter::ConvertStats) {
    let mut recorder = RecordingReceiver::new();
    let mut converter = SceneConverter::new(settings);
    let stats = converter.convert(graph, &mut recorder).unwrap();
    assert_eq!(converter.state(), ConvertState::Done);
    assert!(!recorder.is_open());
    (recorder, stats)
}

#[test]
fn test_quad_with_flat_normals_exports_two_triangles() {
    let mut graph = graph_with_camera();
    graph.add_root(mesh_node("quad"));

    let (recorder, stats) = convert(&graph, plain_settings());

    let shape = only(&recorder, Verb::Shape);
    assert_eq!(shape.type_name(), Some("trianglemesh"));
    assert_eq!(
        shape.params.get("indices").map(|e| e.values().clone()),
        Some(ParamValues::Index(vec![[0, 2, 1], [0, 3, 2]]))
    );
    assert_eq!(shape.params.get("P").map(|e| e.array_len()), Some(4));
    assert!(shape.params.get("N").is_none());
    assert_eq!(stats.meshes, 1);
    assert_eq!(stats.triangles, 2);
}

#[test]
fn test_disc_area_light_gain_is_divided_by_area() {
    let mut graph = graph_with_camera();
    let light = LightData::new(LightKind::Area(AreaShape::Disc { diameter: 10.0 })).with_emission(Vec3::new(1.0, 1.0, 1.0), 1.0);
    graph.add_root(SceneNode::new("disc", NodeKind::Light(light)));

    let settings = ExportSettings {
        unit_scale: 0.01,
        ..plain_settings()
    };
    let (recorder, stats) = convert(&graph, settings);

    let shape = only(&recorder, Verb::Shape);
    assert_eq!(shape.type_name(), Some("disk"));
    let radius = float_param(&shape.params, "radius");
    assert_relative_eq!(radius, 0.05, epsilon = 1e-6);

    let emission = only(&recorder, Verb::AreaLightSource);
    assert_eq!(emission.type_name(), Some("area"));
    assert_relative_eq!(float_param(&emission.params, "gain"), 1.0 / (PI * 0.05 * 0.05), max_relative = 1e-4);
    assert_eq!(stats.lights, 1);
}

#[test]
fn test_repeated_start_scene_is_force_closed() {
    let mut graph = graph_with_camera();
    graph.add_root(mesh_node("quad"));

    let mut recorder = RecordingReceiver::new();
    recorder.start_scene(Some("stale")).unwrap();
    SceneConverter::new(plain_settings()).convert(&graph, &mut recorder).unwrap();

    assert_eq!(recorder.sessions_opened(), 2);
    assert_eq!(recorder.forced_closes(), 1);
    assert!(!recorder.is_open());
}

#[test]
fn test_control_object_children_are_exported() {
    let mut graph = graph_with_camera();
    let generator = graph.add_root(mesh_node("generator").with_flags(NodeFlags::CONTROL_OBJECT));
    graph.add_child(generator, mesh_node("result")).unwrap();

    let (recorder, stats) = convert(&graph, plain_settings());

    assert_eq!(recorder.with_verb(Verb::Shape).count(), 1);
    assert_eq!(stats.meshes, 1);
    assert_eq!(stats.hidden, 1);
}

#[test]
fn test_hidden_control_object_hides_children() {
    let mut graph = graph_with_camera();
    let generator = graph.add_root(
        mesh_node("generator")
            .with_flags(NodeFlags::CONTROL_OBJECT)
            .with_visibility(Visibility::Off),
    );
    let result = graph.add_child(generator, mesh_node("result")).unwrap();
    graph.add_child(result, mesh_node("forced").with_visibility(Visibility::On)).unwrap();

    let (recorder, stats) = convert(&graph, plain_settings());

    assert_eq!(recorder.with_verb(Verb::Shape).count(), 1);
    assert_eq!(stats.hidden, 2);
}

#[test]
fn test_statement_order() {
    let mut graph = graph_with_camera();
    let texture = Rc::new(TextureDef {
        name: "wood".into(),
        filename: "wood.png".into(),
        gamma: 2.2,
    });
    let material = Rc::new(MaterialDef {
        name: "floor".into(),
        kind: MaterialKind::Matte,
        color: Channel::Texture(texture),
    });
    graph.add_root(mesh_node("floor").with_material(material));
    graph.add_root(SceneNode::new("bulb", NodeKind::Light(LightData::new(LightKind::Point))));

    let (recorder, _) = convert(&graph, plain_settings());

    assert_eq!(
        recorder.verbs(),
        [
            Verb::Film,
            Verb::LookAt,
            Verb::Camera,
            Verb::PixelFilter,
            Verb::Sampler,
            Verb::SurfaceIntegrator,
            Verb::Accelerator,
            Verb::WorldBegin,
            Verb::AttributeBegin,
            Verb::Transform,
            Verb::LightSource,
            Verb::AttributeEnd,
            Verb::Texture,
            Verb::AttributeBegin,
            Verb::Transform,
            Verb::Material,
            Verb::Shape,
            Verb::AttributeEnd,
            Verb::WorldEnd,
        ]
    );
    assert_eq!(only(&recorder, Verb::Texture).ids, ["wood", "color", "imagemap"]);
}

#[test]
fn test_failure_stops_conversion() {
    let mut graph = graph_with_camera();
    graph.add_root(SceneNode::new("bulb", NodeKind::Light(LightData::new(LightKind::Point))));
    graph.add_root(mesh_node("quad"));

    // Calls 0..=7 are the globals and WorldBegin; call 8 opens the light block.
    let mut recorder = RecordingReceiver::failing_at(8);
    let mut converter = SceneConverter::new(plain_settings());
    let err = converter.convert(&graph, &mut recorder).unwrap_err();

    assert!(matches!(err, ExportError::Receiver(_)));
    assert_eq!(converter.state(), ConvertState::Failed);
    assert_eq!(recorder.statements().len(), 8);
    assert_eq!(recorder.verbs().last(), Some(&Verb::WorldBegin));
    assert!(recorder.is_open());
}

#[test]
fn test_missing_camera_fails_before_output() {
    let mut graph = SceneGraph::new();
    graph.add_root(mesh_node("quad"));

    let mut recorder = RecordingReceiver::new();
    let err = SceneConverter::new(plain_settings()).convert(&graph, &mut recorder).unwrap_err();

    assert!(matches!(err, ExportError::NoCamera));
    assert_eq!(recorder.sessions_opened(), 0);
}

#[test]
fn test_unsupported_light_is_skipped() {
    let mut graph = graph_with_camera();
    graph.add_root(SceneNode::new(
        "sky",
        NodeKind::Light(LightData::new(LightKind::Unsupported("photometric".into()))),
    ));

    let (recorder, stats) = convert(&graph, plain_settings());

    assert_eq!(recorder.with_verb(Verb::LightSource).count(), 0);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.lights, 0);
}

#[test]
fn test_zero_size_area_light_is_skipped() {
    let mut graph = graph_with_camera();
    graph.add_root(SceneNode::new(
        "flat",
        NodeKind::Light(LightData::new(LightKind::Area(AreaShape::Sphere { diameter: 0.0 }))),
    ));

    let (recorder, stats) = convert(&graph, plain_settings());

    assert_eq!(recorder.with_verb(Verb::AreaLightSource).count(), 0);
    assert_eq!(stats.skipped, 1);
}

#[test]
fn test_object_area_light_replaces_mesh_geometry() {
    let mut graph = graph_with_camera();
    let panel = graph.add_root(mesh_node("panel"));
    let light = LightData::new(LightKind::Area(AreaShape::Object { mesh: panel })).with_emission(Vec3::new(1.0, 0.9, 0.8), 4.0);
    graph.add_root(SceneNode::new("panel light", NodeKind::Light(light)));

    let (recorder, stats) = convert(&graph, plain_settings());

    assert_eq!(recorder.with_verb(Verb::Material).count(), 0);
    let shape = only(&recorder, Verb::Shape);
    assert_eq!(shape.type_name(), Some("trianglemesh"));
    let emission = only(&recorder, Verb::AreaLightSource);
    assert_relative_eq!(float_param(&emission.params, "gain"), 4.0, epsilon = 1e-5);
    assert_eq!(stats.lights, 1);
    assert_eq!(stats.meshes, 0);
}

#[test]
fn test_object_area_light_with_empty_mesh_fails() {
    let mut graph = graph_with_camera();
    let empty = graph.add_root(SceneNode::new("empty", NodeKind::Mesh(RawMesh::default())));
    graph.add_root(SceneNode::new(
        "lamp",
        NodeKind::Light(LightData::new(LightKind::Area(AreaShape::Object { mesh: empty }))),
    ));

    let mut recorder = RecordingReceiver::new();
    let mut converter = SceneConverter::new(plain_settings());
    let err = converter.convert(&graph, &mut recorder).unwrap_err();

    match err {
        ExportError::EmptyAreaLightMesh { light, mesh } => {
            assert_eq!(light, "lamp");
            assert_eq!(mesh, "empty");
        }
        other => panic!("unexpected error {other}"),
    }
    assert!(!converter.is_area_light_mesh(empty));
    assert_eq!(recorder.with_verb(Verb::WorldEnd).count(), 0);
}

#[test]
fn test_object_area_light_with_degenerate_mesh_fails() {
    let mut graph = graph_with_camera();
    let line = RawMesh::new(
        vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0)],
        vec![Polygon::triangle(0, 1, 2)],
    );
    let sliver = graph.add_root(SceneNode::new("sliver", NodeKind::Mesh(line)));
    graph.add_root(SceneNode::new(
        "lamp",
        NodeKind::Light(LightData::new(LightKind::Area(AreaShape::Object { mesh: sliver }))),
    ));

    let mut recorder = RecordingReceiver::new();
    let mut converter = SceneConverter::new(plain_settings());
    let err = converter.convert(&graph, &mut recorder).unwrap_err();

    assert!(matches!(err, ExportError::EmptyAreaLightMesh { ref mesh, .. } if mesh == "sliver"));
    assert_eq!(converter.state(), ConvertState::Failed);
    assert_eq!(recorder.with_verb(Verb::AreaLightSource).count(), 0);
}

#[test]
fn test_hidden_cameras_are_not_counted() {
    let mut graph = graph_with_camera();
    graph.add_root(camera_node().with_visibility(Visibility::Off));
    graph.add_root(mesh_node("hidden").with_visibility(Visibility::Off));

    let (recorder, stats) = convert(&graph, plain_settings());

    assert_eq!(recorder.with_verb(Verb::Shape).count(), 0);
    assert_eq!(stats.hidden, 1);
}

#[test]
fn test_empty_mesh_is_skipped() {
    let mut graph = graph_with_camera();
    graph.add_root(SceneNode::new("empty", NodeKind::Mesh(RawMesh::default())));
    graph.add_root(mesh_node("quad"));

    let (recorder, stats) = convert(&graph, plain_settings());

    assert_eq!(recorder.with_verb(Verb::Shape).count(), 1);
    assert_eq!(stats.skipped, 1);
}

#[test]
fn test_render_layer_excludes_nodes() {
    let mut graph = graph_with_camera();
    let helpers = graph.add_layer(RenderLayer {
        name: "helpers".into(),
        render: false,
    });
    graph.add_root(mesh_node("guide").with_layer(helpers));
    graph.add_root(mesh_node("quad"));

    let (recorder, stats) = convert(&graph, plain_settings());

    assert_eq!(recorder.with_verb(Verb::Shape).count(), 1);
    assert_eq!(stats.hidden, 1);
}

#[test]
fn test_portal_has_no_material() {
    let mut graph = graph_with_camera();
    graph.add_root(mesh_node("window").with_flags(NodeFlags::PORTAL));

    let (recorder, stats) = convert(&graph, plain_settings());

    assert_eq!(recorder.with_verb(Verb::Material).count(), 0);
    assert_eq!(recorder.with_verb(Verb::Shape).count(), 0);
    assert_eq!(only(&recorder, Verb::PortalShape).type_name(), Some("trianglemesh"));
    assert_eq!(stats.portals, 1);
}

#[test]
fn test_shared_texture_written_once() {
    let mut graph = graph_with_camera();
    let texture = Rc::new(TextureDef {
        name: "tiles".into(),
        filename: "tiles.png".into(),
        gamma: 1.0,
    });
    for (i, kind) in [MaterialKind::Matte, MaterialKind::Mirror].into_iter().enumerate() {
        let material = Rc::new(MaterialDef {
            name: format!("m{i}"),
            kind,
            color: Channel::Texture(Rc::clone(&texture)),
        });
        graph.add_root(mesh_node(&format!("quad{i}")).with_material(material));
    }

    let (recorder, stats) = convert(&graph, plain_settings());

    assert_eq!(recorder.with_verb(Verb::Texture).count(), 1);
    assert_eq!(stats.textures, 1);
    let materials: Vec<_> = recorder.with_verb(Verb::Material).filter_map(Statement::type_name).collect();
    assert_eq!(materials, ["matte", "mirror"]);
}

#[test]
fn test_mesh_transform_is_converted() {
    let mut graph = graph_with_camera();
    graph.add_root(
        mesh_node("moved").with_transform(Transform::from_position(Vec3::new(100.0, 200.0, 300.0)).to_matrix()),
    );
    let settings = ExportSettings {
        unit_scale: 0.01,
        ..plain_settings()
    };

    let (recorder, _) = convert(&graph, settings);

    // The camera has no Transform; the only one belongs to the mesh.
    let transform = only(&recorder, Verb::Transform);
    assert_eq!(transform.numbers.len(), 16);
    assert_relative_eq!(transform.numbers[12], 1.0, epsilon = 1e-5);
    assert_relative_eq!(transform.numbers[13], 3.0, epsilon = 1e-5);
    assert_relative_eq!(transform.numbers[14], 2.0, epsilon = 1e-5);
}

#[test]
fn test_converter_is_reusable() {
    let mut graph = graph_with_camera();
    graph.add_root(mesh_node("quad"));
    let mut converter = SceneConverter::new(plain_settings());

    let mut first = RecordingReceiver::new();
    let mut second = RecordingReceiver::new();
    let a = converter.convert(&graph, &mut first).unwrap();
    let b = converter.convert(&graph, &mut second).unwrap();

    assert_eq!(a, b);
    assert_eq!(first.statements(), second.statements());
}
