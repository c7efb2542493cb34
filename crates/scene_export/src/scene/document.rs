//! Serializable scene description
//!
//! A [`SceneDocument`] is the on-disk form of a scene: a tree of node
//! descriptions where materials, textures, layers and area-light meshes are
//! referenced by name. [`SceneDocument::build`] resolves every reference and
//! produces a [`SceneGraph`].
//!
//! ```ron
//! (
//!     materials: [(name: "red", kind: Matte, color: Some((0.8, 0.1, 0.1)))],
//!     nodes: [
//!         (name: "cam", kind: Camera((projection: Perspective(fov_degrees: 50.0))),
//!          position: (0.0, 100.0, -500.0)),
//!         (name: "box", kind: Mesh((points: [...], polygons: [[0, 1, 2, 3]])),
//!          material: Some("red")),
//!     ],
//! )
//! ```

use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::{
    CameraData, Channel, LightData, MaterialDef, MaterialKind, NodeFlags, NodeId, NodeKind, RenderLayer, SceneError,
    SceneGraph, SceneNode, TextureDef, Visibility,
};
use crate::config::Config;
use crate::foundation::math::{Color, Transform, Vec3};
use crate::geometry::{Polygon, RawMesh};

/// Material description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDesc {
    /// Material name
    pub name: String,
    /// Surface model
    pub kind: MaterialKind,
    /// Constant colour, ignored when `texture` is set
    #[serde(default)]
    pub color: Option<Color>,
    /// Name of a texture driving the colour channel
    #[serde(default)]
    pub texture: Option<String>,
}

/// Polygon mesh description
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeshDesc {
    /// Point positions in object space
    pub points: Vec<Vec3>,
    /// Triangles and quads as 3 or 4 point indices
    pub polygons: Vec<Vec<u32>>,
    /// Per-corner normals, 4 per polygon
    #[serde(default)]
    pub normals: Option<Vec<Vec3>>,
}

/// Node type description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKindDesc {
    /// Polygon object
    Mesh(MeshDesc),
    /// Light; object area lights name their mesh node
    Light(LightData<String>),
    /// Camera
    Camera(CameraData),
    /// Null or group
    Null,
}

/// Node description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDesc {
    /// Node name
    pub name: String,
    /// Node type and payload
    pub kind: NodeKindDesc,
    /// Position relative to the parent
    #[serde(default = "Vec3::zeros")]
    pub position: Vec3,
    /// Heading, pitch and bank in degrees
    #[serde(default = "Vec3::zeros")]
    pub rotation: Vec3,
    /// Scale factors
    #[serde(default = "unit_scale")]
    pub scale: Vec3,
    /// Render-visibility override
    #[serde(default)]
    pub visibility: Visibility,
    /// Node only feeds a generator or deformer
    #[serde(default)]
    pub control_object: bool,
    /// Mesh is a light portal
    #[serde(default)]
    pub portal: bool,
    /// Render layer name
    #[serde(default)]
    pub layer: Option<String>,
    /// Material name
    #[serde(default)]
    pub material: Option<String>,
    /// Child nodes
    #[serde(default)]
    pub children: Vec<NodeDesc>,
}

fn unit_scale() -> Vec3 {
    Vec3::new(1.0, 1.0, 1.0)
}

impl NodeDesc {
    /// Create a description with identity transform and no children
    pub fn new(name: impl Into<String>, kind: NodeKindDesc) -> Self {
        Self {
            name: name.into(),
            kind,
            position: Vec3::zeros(),
            rotation: Vec3::zeros(),
            scale: unit_scale(),
            visibility: Visibility::Inherit,
            control_object: false,
            portal: false,
            layer: None,
            material: None,
            children: Vec::new(),
        }
    }
}

/// Complete scene description
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneDocument {
    /// Image textures
    #[serde(default)]
    pub textures: Vec<TextureDef>,
    /// Materials
    #[serde(default)]
    pub materials: Vec<MaterialDesc>,
    /// Render layers
    #[serde(default)]
    pub layers: Vec<RenderLayer>,
    /// Name of the camera to render from
    #[serde(default)]
    pub active_camera: Option<String>,
    /// Top-level nodes
    #[serde(default)]
    pub nodes: Vec<NodeDesc>,
}

impl Config for SceneDocument {}

/// Name lookups shared by the build passes
struct Resolver {
    materials: HashMap<String, Rc<MaterialDef>>,
    pending_lights: Vec<(NodeId, LightData<String>)>,
}

impl SceneDocument {
    /// Resolve references and build the scene graph
    pub fn build(&self) -> Result<SceneGraph, SceneError> {
        let textures: HashMap<&str, Rc<TextureDef>> = self
            .textures
            .iter()
            .map(|t| (t.name.as_str(), Rc::new(t.clone())))
            .collect();

        let mut resolver = Resolver {
            materials: HashMap::new(),
            pending_lights: Vec::new(),
        };
        for desc in &self.materials {
            let color = match &desc.texture {
                Some(name) => Channel::Texture(
                    textures
                        .get(name.as_str())
                        .cloned()
                        .ok_or_else(|| unknown("texture", name))?,
                ),
                None => Channel::Color(desc.color.unwrap_or_else(|| Color::new(0.8, 0.8, 0.8))),
            };
            let material = MaterialDef {
                name: desc.name.clone(),
                kind: desc.kind,
                color,
            };
            resolver.materials.insert(desc.name.clone(), Rc::new(material));
        }

        let mut graph = SceneGraph::new();
        for layer in &self.layers {
            graph.add_layer(layer.clone());
        }

        for desc in &self.nodes {
            add_node(&mut graph, &mut resolver, None, desc)?;
        }

        // Area lights can name meshes that appear later in the tree.
        for (id, light) in resolver.pending_lights {
            let light = light.try_map_ref(|name| graph.find_by_name(&name).ok_or_else(|| unknown("node", &name)))?;
            graph.node_mut(id)?.kind = NodeKind::Light(light);
        }

        if let Some(name) = &self.active_camera {
            let id = graph.find_by_name(name).ok_or_else(|| unknown("camera", name))?;
            graph.set_active_camera(id)?;
        }

        log::debug!("Built scene graph with {} nodes", graph.len());
        Ok(graph)
    }
}

fn unknown(kind: &'static str, name: &str) -> SceneError {
    SceneError::UnknownReference {
        kind,
        name: name.to_string(),
    }
}

fn add_node(
    graph: &mut SceneGraph,
    resolver: &mut Resolver,
    parent: Option<NodeId>,
    desc: &NodeDesc,
) -> Result<NodeId, SceneError> {
    let mut pending_light = None;
    let kind = match &desc.kind {
        NodeKindDesc::Mesh(mesh) => NodeKind::Mesh(build_mesh(&desc.name, mesh)?),
        NodeKindDesc::Camera(camera) => NodeKind::Camera(camera.clone()),
        NodeKindDesc::Light(light) => {
            pending_light = Some(light.clone());
            NodeKind::Other
        }
        NodeKindDesc::Null => NodeKind::Other,
    };

    let mut flags = NodeFlags::empty();
    flags.set(NodeFlags::CONTROL_OBJECT, desc.control_object);
    flags.set(NodeFlags::PORTAL, desc.portal);

    let transform = Transform::from_hpb_degrees(desc.position, desc.rotation, desc.scale).to_matrix();
    let mut node = SceneNode::new(desc.name.clone(), kind)
        .with_transform(transform)
        .with_visibility(desc.visibility)
        .with_flags(flags);

    if let Some(name) = &desc.layer {
        node = node.with_layer(graph.find_layer(name).ok_or_else(|| unknown("layer", name))?);
    }
    if let Some(name) = &desc.material {
        let material = resolver
            .materials
            .get(name)
            .cloned()
            .ok_or_else(|| unknown("material", name))?;
        node = node.with_material(material);
    }

    let id = match parent {
        Some(parent) => graph.add_child(parent, node)?,
        None => graph.add_root(node),
    };
    if let Some(light) = pending_light {
        resolver.pending_lights.push((id, light));
    }

    for child in &desc.children {
        add_node(graph, resolver, Some(id), child)?;
    }
    Ok(id)
}

fn build_mesh(name: &str, desc: &MeshDesc) -> Result<RawMesh, SceneError> {
    let polygons = desc
        .polygons
        .iter()
        .enumerate()
        .map(|(i, corners)| match corners.as_slice() {
            &[a, b, c] => Ok(Polygon::triangle(a, b, c)),
            &[a, b, c, d] => Ok(Polygon::quad(a, b, c, d)),
            other => Err(SceneError::BadPolygon {
                name: name.to_string(),
                polygon: i,
                corners: other.len(),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mesh = RawMesh::new(desc.points.clone(), polygons);
    Ok(match &desc.normals {
        Some(normals) => mesh.with_normals(normals.clone()),
        None => mesh,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{AreaShape, LightKind};

    const DOCUMENT: &str = r#"(
        textures: [(name: "wood", filename: "wood.png")],
        materials: [
            (name: "floor", kind: Matte, texture: Some("wood")),
            (name: "red", kind: Glossy(roughness: 0.1), color: Some((0.8, 0.1, 0.1))),
        ],
        layers: [(name: "helpers", render: false)],
        active_camera: Some("cam"),
        nodes: [
            (name: "cam", kind: Camera((projection: Perspective(fov_degrees: 50.0))), position: (0.0, 100.0, -500.0)),
            (name: "lamp", kind: Light((kind: Area(Object(mesh: "panel")), brightness: 10.0))),
            (
                name: "group",
                kind: Null,
                children: [
                    (name: "panel", kind: Mesh((points: [(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (1.0, 1.0, 0.0)], polygons: [[0, 1, 2]])), material: Some("red")),
                    (name: "helper", kind: Null, layer: Some("helpers")),
                ],
            ),
        ],
    )"#;

    #[test]
    fn test_build_resolves_references() {
        let document: SceneDocument = ron::from_str(DOCUMENT).unwrap();
        let graph = document.build().unwrap();

        assert_eq!(graph.len(), 5);
        let cam = graph.find_by_name("cam").unwrap();
        assert_eq!(graph.active_camera(), Some(cam));

        let panel = graph.find_by_name("panel").unwrap();
        let lamp = graph.node(graph.find_by_name("lamp").unwrap()).unwrap();
        match &lamp.kind {
            NodeKind::Light(light) => {
                assert_eq!(light.kind, LightKind::Area(AreaShape::Object { mesh: panel }));
                assert_eq!(light.brightness, 10.0);
            }
            other => panic!("expected light, got {}", other.type_name()),
        }

        let material = graph.node(panel).unwrap().material.clone().unwrap();
        assert_eq!(material.name, "red");

        let helper = graph.node(graph.find_by_name("helper").unwrap()).unwrap();
        assert!(!graph.layer_renders(helper.layer));
    }

    #[test]
    fn test_textured_materials_share_texture() {
        let mut document: SceneDocument = ron::from_str(DOCUMENT).unwrap();
        document.materials.push(MaterialDesc {
            name: "floor2".into(),
            kind: MaterialKind::Matte,
            color: None,
            texture: Some("wood".into()),
        });
        for (i, name) in ["floor", "floor2"].iter().enumerate() {
            let mut node = NodeDesc::new(format!("plane{i}"), NodeKindDesc::Null);
            node.material = Some((*name).to_string());
            document.nodes.push(node);
        }
        let graph = document.build().unwrap();

        let texture_of = |name: &str| {
            let node = graph.node(graph.find_by_name(name).unwrap()).unwrap();
            node.material.as_ref().unwrap().color.texture().cloned().unwrap()
        };
        assert!(Rc::ptr_eq(&texture_of("plane0"), &texture_of("plane1")));
    }

    #[test]
    fn test_unknown_material_is_rejected() {
        let mut document = SceneDocument::default();
        let mut node = NodeDesc::new("box", NodeKindDesc::Null);
        node.material = Some("missing".into());
        document.nodes.push(node);

        assert_eq!(
            document.build().err(),
            Some(SceneError::UnknownReference {
                kind: "material",
                name: "missing".into()
            })
        );
    }

    #[test]
    fn test_bad_polygon_is_rejected() {
        let mut document = SceneDocument::default();
        document.nodes.push(NodeDesc::new(
            "strip",
            NodeKindDesc::Mesh(MeshDesc {
                points: vec![Vec3::zeros(); 5],
                polygons: vec![vec![0, 1, 2, 3, 4]],
                normals: None,
            }),
        ));

        assert!(matches!(
            document.build(),
            Err(SceneError::BadPolygon { corners: 5, .. })
        ));
    }
}
