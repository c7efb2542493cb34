//! Scene conversion
//!
//! [`SceneConverter`] walks a [`SceneGraph`] and drives a [`SceneReceiver`]
//! with the statements describing it. The statement order is fixed:
//!
//! ```text
//! start_scene
//! Film, LookAt, Camera, PixelFilter, Sampler, SurfaceIntegrator, Accelerator
//! WorldBegin
//!   lights      (first traversal)
//!   textures    (used by meshes of the second traversal)
//!   geometry    (second traversal)
//! WorldEnd
//! end_scene
//! ```
//!
//! Both traversals are depth-first in child order and carry a copied
//! [`TraversalState`] down each branch. The first error from any export
//! stops the conversion.

mod camera;
mod lights;
mod material;
mod mesh;

use std::collections::HashSet;

use crate::error::{ExportError, ExportResult};
use crate::foundation::math::Mat4;
use crate::geometry::GeometryCache;
use crate::params::ParameterSet;
use crate::receiver::SceneReceiver;
use crate::scene::{MaterialDef, NodeId, NodeKind, SceneGraph, SceneNode};
use crate::settings::ExportSettings;

/// Progress of a conversion, as last observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertState {
    /// No conversion has run yet
    Idle,
    /// Between nodes
    Traversing,
    /// Current node is visible and exportable
    NodeVisible,
    /// Current node is hidden by itself, an ancestor or its layer
    NodeHidden,
    /// Current node only feeds a generator or deformer
    ControlObjectSkip,
    /// Last conversion finished
    Done,
    /// Last conversion aborted with an error
    Failed,
}

/// Counts reported by a finished conversion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertStats {
    /// Light sources written, area lights included
    pub lights: usize,
    /// Meshes written as shapes
    pub meshes: usize,
    /// Meshes written as portal shapes
    pub portals: usize,
    /// Textures written
    pub textures: usize,
    /// Nodes not exported because of visibility, layers or control flags
    pub hidden: usize,
    /// Nodes dropped with a warning (unsupported, degenerate or empty)
    pub skipped: usize,
    /// Triangles written across all shapes
    pub triangles: usize,
}

/// Inherited per-branch state
#[derive(Debug, Clone, Copy)]
pub struct TraversalState {
    /// Effective render visibility
    pub visible: bool,
    /// Accumulated source-space transform
    pub world: Mat4,
}

impl TraversalState {
    /// State handed to root nodes
    pub fn root() -> Self {
        Self {
            visible: true,
            world: Mat4::identity(),
        }
    }

    /// State of `node` given its parent's state
    pub fn enter(&self, node: &SceneNode) -> Self {
        Self {
            visible: node.visibility.resolve(self.visible),
            world: self.world * node.transform,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Lights,
    Geometry,
}

/// Mesh found during the geometry traversal, exported after textures
struct PendingMesh {
    id: NodeId,
    world: Mat4,
}

/// Converts scene graphs into receiver statements
pub struct SceneConverter {
    settings: ExportSettings,
    cache: GeometryCache,
    area_light_meshes: HashSet<NodeId>,
    params: ParameterSet,
    default_material: MaterialDef,
    state: ConvertState,
    stats: ConvertStats,
}

impl SceneConverter {
    /// Create a converter with the given settings
    pub fn new(settings: ExportSettings) -> Self {
        Self {
            settings,
            cache: GeometryCache::new(),
            area_light_meshes: HashSet::new(),
            params: ParameterSet::default(),
            default_material: MaterialDef::default_matte(),
            state: ConvertState::Idle,
            stats: ConvertStats::default(),
        }
    }

    /// Active settings
    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Current or final state
    pub fn state(&self) -> ConvertState {
        self.state
    }

    /// Meshes consumed as area-light shapes by the current conversion
    pub fn is_area_light_mesh(&self, id: NodeId) -> bool {
        self.area_light_meshes.contains(&id)
    }

    /// Convert `graph`, sending every statement to `receiver`
    ///
    /// On error the receiver may hold partial output; scratch state is reset.
    pub fn convert(&mut self, graph: &SceneGraph, receiver: &mut dyn SceneReceiver) -> ExportResult<ConvertStats> {
        self.stats = ConvertStats::default();
        self.area_light_meshes.clear();
        self.state = ConvertState::Traversing;
        log::info!("Converting scene with {} nodes", graph.len());

        match self.run(graph, receiver) {
            Ok(()) => {
                self.state = ConvertState::Done;
                log::info!(
                    "Exported {} lights, {} meshes, {} portals, {} textures ({} triangles)",
                    self.stats.lights,
                    self.stats.meshes,
                    self.stats.portals,
                    self.stats.textures,
                    self.stats.triangles
                );
                Ok(self.stats)
            }
            Err(err) => {
                self.cache.reset();
                self.area_light_meshes.clear();
                self.state = ConvertState::Failed;
                log::error!("Scene conversion failed: {}", err);
                Err(err)
            }
        }
    }

    fn run(&mut self, graph: &SceneGraph, receiver: &mut dyn SceneReceiver) -> ExportResult<()> {
        let camera = self.find_camera(graph)?;

        receiver.start_scene(self.settings.header.as_deref())?;
        self.export_globals(graph, camera, receiver)?;
        receiver.world_begin()?;

        self.walk(graph, Phase::Lights, |this, id, node, world| {
            if let NodeKind::Light(light) = &node.kind {
                this.export_light(graph, id, light, world, receiver)?;
            }
            Ok(())
        })?;

        let mut pending = Vec::new();
        self.walk(graph, Phase::Geometry, |this, id, node, world| {
            if matches!(node.kind, NodeKind::Mesh(_)) {
                if this.is_area_light_mesh(id) {
                    log::debug!("Mesh '{}' is an area-light shape, not exported as geometry", node.name);
                } else {
                    pending.push(PendingMesh { id, world: *world });
                }
            }
            Ok(())
        })?;

        self.export_textures(graph, &pending, receiver)?;
        for mesh in &pending {
            self.export_mesh(graph, mesh.id, &mesh.world, receiver)?;
        }

        receiver.world_end()?;
        receiver.end_scene()
    }

    /// Depth-first walk calling `visit` for every exportable node
    fn walk<V>(&mut self, graph: &SceneGraph, phase: Phase, mut visit: V) -> ExportResult<()>
    where
        V: FnMut(&mut Self, NodeId, &SceneNode, &Mat4) -> ExportResult<()>,
    {
        let mut stack: Vec<(NodeId, TraversalState)> = graph
            .roots()
            .iter()
            .rev()
            .map(|&id| (id, TraversalState::root()))
            .collect();

        while let Some((id, inherited)) = stack.pop() {
            let node = graph.node(id)?;
            let state = inherited.enter(node);

            let current = if node.is_control_object() {
                ConvertState::ControlObjectSkip
            } else if state.visible && graph.layer_renders(node.layer) {
                ConvertState::NodeVisible
            } else {
                ConvertState::NodeHidden
            };
            self.state = current;

            match current {
                ConvertState::NodeVisible => visit(self, id, node, &state.world)?,
                _ if phase == Phase::Lights && matches!(node.kind, NodeKind::Mesh(_) | NodeKind::Light(_)) => {
                    log::debug!("Skipping {} '{}' ({:?})", node.kind.type_name(), node.name, current);
                    self.stats.hidden += 1;
                }
                _ => {}
            }

            stack.extend(node.children().iter().rev().map(|&child| (child, state)));
            self.state = ConvertState::Traversing;
        }
        Ok(())
    }

    /// The designated camera, else the first camera in depth-first order
    fn find_camera(&self, graph: &SceneGraph) -> ExportResult<NodeId> {
        graph
            .active_camera()
            .or_else(|| {
                graph
                    .depth_first()
                    .find(|&id| matches!(graph.node(id).map(|n| &n.kind), Ok(NodeKind::Camera(_))))
            })
            .ok_or(ExportError::NoCamera)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{CameraData, Visibility};

    #[test]
    fn test_traversal_state_inherits_and_overrides() {
        let root = TraversalState::root();
        let hidden = root.enter(&SceneNode::new("off", NodeKind::Other).with_visibility(Visibility::Off));
        assert!(!hidden.visible);

        let child = hidden.enter(&SceneNode::new("child", NodeKind::Other));
        assert!(!child.visible);

        let forced = hidden.enter(&SceneNode::new("on", NodeKind::Other).with_visibility(Visibility::On));
        assert!(forced.visible);
    }

    #[test]
    fn test_find_camera_prefers_designated() {
        let mut graph = SceneGraph::new();
        let first = graph.add_root(SceneNode::new("first", NodeKind::Camera(CameraData::perspective(45.0))));
        let second = graph.add_root(SceneNode::new("second", NodeKind::Camera(CameraData::perspective(45.0))));
        let converter = SceneConverter::new(ExportSettings::default());

        assert_eq!(converter.find_camera(&graph).unwrap(), first);
        graph.set_active_camera(second).unwrap();
        assert_eq!(converter.find_camera(&graph).unwrap(), second);
    }

    #[test]
    fn test_missing_camera() {
        let graph = SceneGraph::new();
        let converter = SceneConverter::new(ExportSettings::default());
        assert!(matches!(converter.find_camera(&graph), Err(ExportError::NoCamera)));
        assert_eq!(converter.state(), ConvertState::Idle);
    }
}
