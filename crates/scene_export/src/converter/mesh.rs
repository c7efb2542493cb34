//! Geometry statements

use super::lights::mesh_params;
use super::material::material_params;
use super::SceneConverter;
use crate::error::ExportResult;
use crate::foundation::math::{convert, Mat4};
use crate::receiver::SceneReceiver;
use crate::scene::{NodeFlags, NodeId, NodeKind, SceneGraph};

impl SceneConverter {
    /// Write one mesh node as a shape or portal
    pub(super) fn export_mesh(
        &mut self,
        graph: &SceneGraph,
        id: NodeId,
        world: &Mat4,
        receiver: &mut dyn SceneReceiver,
    ) -> ExportResult<()> {
        let node = graph.node(id)?;
        let NodeKind::Mesh(raw) = &node.kind else {
            return Ok(());
        };
        let scale = self.settings.unit_scale;

        let mesh = self.cache.update(raw, self.settings.use_normals, scale)?;
        if mesh.is_empty() {
            log::warn!("Mesh '{}' has no triangles, skipping", node.name);
            self.stats.skipped += 1;
            return Ok(());
        }
        let portal = node.flags.contains(NodeFlags::PORTAL);

        receiver.attribute_begin()?;
        receiver.transform(&convert::world_matrix(world, scale))?;

        let params = &mut self.params;
        if !portal {
            let material = node.material.as_deref().unwrap_or(&self.default_material);
            params.clear();
            let material_type = material_params(material, params)?;
            receiver.material(material_type, params)?;
        }

        params.clear();
        mesh_params(mesh, params)?;
        if portal {
            receiver.portal_shape("trianglemesh", params)?;
            self.stats.portals += 1;
        } else {
            receiver.shape("trianglemesh", params)?;
            self.stats.meshes += 1;
        }
        receiver.attribute_end()?;

        log::debug!(
            "Exported {} '{}' ({} points, {} triangles)",
            if portal { "portal" } else { "mesh" },
            node.name,
            mesh.points.len(),
            mesh.triangle_count()
        );
        self.stats.triangles += mesh.triangle_count();
        Ok(())
    }
}
