//! In-memory scene graph
//!
//! Stands in for the host application's scene: a tree of named nodes with
//! local transforms, stored in a slot map so node ids stay stable while the
//! tree is built. The converter only reads from it.
//!
//! ## Node model
//!
//! ```text
//! SceneNode
//!   kind        Mesh | Light | Camera | Other
//!   transform   local matrix (source space)
//!   visibility  Inherit | On | Off
//!   flags       CONTROL_OBJECT, PORTAL
//!   layer       optional render layer
//!   material    optional shared material
//! ```

mod document;
mod light;
mod material;

pub use document::{MaterialDesc, MeshDesc, NodeDesc, NodeKindDesc, SceneDocument};
pub use light::{AreaShape, CameraData, LightData, LightKind, Projection};
pub use material::{Channel, MaterialDef, MaterialKind, TextureDef};

use std::rc::Rc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};
use thiserror::Error;

use crate::foundation::math::Mat4;
use crate::geometry::RawMesh;

new_key_type! {
    /// Stable handle to a node in a [`SceneGraph`]
    pub struct NodeId;
}

bitflags! {
    /// Per-node export flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeFlags: u8 {
        /// Generator or deformer input; traversed but never exported
        const CONTROL_OBJECT = 1;
        /// Mesh exported as a light portal instead of renderable geometry
        const PORTAL = 1 << 1;
    }
}

/// Errors raised while building or querying a scene graph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// A node id does not belong to this graph
    #[error("Unknown node id")]
    UnknownNode,

    /// A name-based reference could not be resolved
    #[error("Unknown {kind} '{name}'")]
    UnknownReference {
        /// What was being looked up (node, material, texture, layer)
        kind: &'static str,
        /// The name that failed to resolve
        name: String,
    },

    /// A node used as the active camera is not a camera
    #[error("Node '{0}' is not a camera")]
    NotACamera(String),

    /// A polygon in a scene document has the wrong number of corners
    #[error("Mesh '{name}' polygon {polygon} has {corners} corners (expected 3 or 4)")]
    BadPolygon {
        /// Mesh node name
        name: String,
        /// Polygon position
        polygon: usize,
        /// Number of corners found
        corners: usize,
    },
}

/// Render-visibility override of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Visibility {
    /// Use the parent's effective visibility
    #[default]
    Inherit,
    /// Visible, and visible by default for descendants
    On,
    /// Hidden, and hidden by default for descendants
    Off,
}

impl Visibility {
    /// Resolve against the parent's effective visibility
    pub fn resolve(self, inherited: bool) -> bool {
        match self {
            Self::Inherit => inherited,
            Self::On => true,
            Self::Off => false,
        }
    }
}

/// Type-specific payload of a node
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Polygon object
    Mesh(RawMesh),
    /// Light source
    Light(LightData),
    /// Camera
    Camera(CameraData),
    /// Null, group or any type the exporter ignores
    Other,
}

impl NodeKind {
    /// Short type name for logging
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Mesh(_) => "mesh",
            Self::Light(_) => "light",
            Self::Camera(_) => "camera",
            Self::Other => "other",
        }
    }
}

/// Index of a render layer in its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId(usize);

/// A named layer that can be excluded from rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderLayer {
    /// Layer name
    pub name: String,
    /// Whether members of the layer are rendered
    #[serde(default = "default_true")]
    pub render: bool,
}

fn default_true() -> bool {
    true
}

/// A node of the scene graph
#[derive(Debug, Clone)]
pub struct SceneNode {
    /// Display name
    pub name: String,
    /// Type-specific data
    pub kind: NodeKind,
    /// Transform relative to the parent, in source space
    pub transform: Mat4,
    /// Render-visibility override
    pub visibility: Visibility,
    /// Export flags
    pub flags: NodeFlags,
    /// Render layer membership
    pub layer: Option<LayerId>,
    /// Material assigned to a mesh
    pub material: Option<Rc<MaterialDef>>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SceneNode {
    /// Create a node with identity transform and inherited visibility
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            transform: Mat4::identity(),
            visibility: Visibility::Inherit,
            flags: NodeFlags::empty(),
            layer: None,
            material: None,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Set the local transform
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    /// Set the visibility override
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Set export flags
    pub fn with_flags(mut self, flags: NodeFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Put the node on a render layer
    pub fn with_layer(mut self, layer: LayerId) -> Self {
        self.layer = Some(layer);
        self
    }

    /// Assign a material
    pub fn with_material(mut self, material: Rc<MaterialDef>) -> Self {
        self.material = Some(material);
        self
    }

    /// Whether the node only feeds a generator or deformer
    pub fn is_control_object(&self) -> bool {
        self.flags.contains(NodeFlags::CONTROL_OBJECT)
    }

    /// Parent node, `None` for roots
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child nodes in order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Tree of scene nodes
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, SceneNode>,
    roots: Vec<NodeId>,
    layers: Vec<RenderLayer>,
    active_camera: Option<NodeId>,
}

impl SceneGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level node
    pub fn add_root(&mut self, node: SceneNode) -> NodeId {
        let id = self.nodes.insert(node);
        self.roots.push(id);
        id
    }

    /// Add `node` as the last child of `parent`
    ///
    /// Ids are only checked for liveness in this graph: an id taken from
    /// another graph may name an unrelated node here.
    pub fn add_child(&mut self, parent: NodeId, mut node: SceneNode) -> Result<NodeId, SceneError> {
        if !self.nodes.contains_key(parent) {
            return Err(SceneError::UnknownNode);
        }
        node.parent = Some(parent);
        let id = self.nodes.insert(node);
        self.nodes[parent].children.push(id);
        Ok(id)
    }

    /// Look up a node
    pub fn node(&self, id: NodeId) -> Result<&SceneNode, SceneError> {
        self.nodes.get(id).ok_or(SceneError::UnknownNode)
    }

    /// Mutable access to a node
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut SceneNode, SceneError> {
        self.nodes.get_mut(id).ok_or(SceneError::UnknownNode)
    }

    /// Top-level nodes in order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// First node called `name` in depth-first order
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.depth_first().find(|&id| self.nodes[id].name == name)
    }

    /// All node ids in depth-first pre-order
    pub fn depth_first(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            stack.extend(self.nodes[id].children.iter().rev().copied());
            Some(id)
        })
    }

    /// Register a render layer
    pub fn add_layer(&mut self, layer: RenderLayer) -> LayerId {
        self.layers.push(layer);
        LayerId(self.layers.len() - 1)
    }

    /// Look up a render layer
    pub fn layer(&self, id: LayerId) -> Option<&RenderLayer> {
        self.layers.get(id.0)
    }

    /// Find a layer by name
    pub fn find_layer(&self, name: &str) -> Option<LayerId> {
        self.layers.iter().position(|l| l.name == name).map(LayerId)
    }

    /// Whether nodes on `layer` may be rendered (no layer always renders)
    pub fn layer_renders(&self, layer: Option<LayerId>) -> bool {
        layer
            .and_then(|id| self.layer(id))
            .map_or(true, |l| l.render)
    }

    /// Choose the camera to render from
    pub fn set_active_camera(&mut self, id: NodeId) -> Result<(), SceneError> {
        let node = self.node(id)?;
        if !matches!(node.kind, NodeKind::Camera(_)) {
            return Err(SceneError::NotACamera(node.name.clone()));
        }
        self.active_camera = Some(id);
        Ok(())
    }

    /// Explicitly chosen camera, if any
    pub fn active_camera(&self) -> Option<NodeId> {
        self.active_camera
    }

    /// Accumulated source-space transform of a node
    pub fn world_matrix(&self, id: NodeId) -> Result<Mat4, SceneError> {
        let mut node = self.node(id)?;
        let mut matrix = node.transform;
        while let Some(parent) = node.parent {
            node = self.node(parent)?;
            matrix = node.transform * matrix;
        }
        Ok(matrix)
    }
}
