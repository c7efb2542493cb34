//! Material and texture statements

use std::collections::HashSet;
use std::rc::Rc;

use super::{PendingMesh, SceneConverter};
use crate::error::ExportResult;
use crate::params::{ParamError, ParameterSet};
use crate::receiver::SceneReceiver;
use crate::scene::{Channel, MaterialDef, MaterialKind, NodeFlags, SceneGraph, TextureDef};

/// Gloss coating reflectance used by glossy materials
const GLOSSY_SPECULAR: f32 = 0.04;

fn add_channel(params: &mut ParameterSet, name: &str, channel: &Channel) -> Result<(), ParamError> {
    match channel {
        Channel::Color(color) => params.add_color(name, *color),
        Channel::Texture(texture) => params.add_texture(name, &texture.name),
    }
}

/// Fill `params` for a material and return its type name
pub fn material_params(material: &MaterialDef, params: &mut ParameterSet) -> Result<&'static str, ParamError> {
    match material.kind {
        MaterialKind::Matte => {
            add_channel(params, "Kd", &material.color)?;
            Ok("matte")
        }
        MaterialKind::Glossy { roughness } => {
            add_channel(params, "Kd", &material.color)?;
            params.add_color("Ks", [GLOSSY_SPECULAR; 3].into())?;
            params.add_float("uroughness", roughness)?;
            params.add_float("vroughness", roughness)?;
            Ok("glossy")
        }
        MaterialKind::Glass { index } => {
            params.add_color("Kr", [1.0; 3].into())?;
            add_channel(params, "Kt", &material.color)?;
            params.add_float("index", index)?;
            Ok("glass")
        }
        MaterialKind::Mirror => {
            add_channel(params, "Kr", &material.color)?;
            Ok("mirror")
        }
    }
}

/// Fill `params` for an image texture
pub fn texture_params(texture: &TextureDef, params: &mut ParameterSet) -> Result<(), ParamError> {
    params.add_string("filename", &texture.filename)?;
    params.add_float("gamma", texture.gamma)
}

impl SceneConverter {
    /// Write each texture used by the pending meshes once, in first-use order
    pub(super) fn export_textures(
        &mut self,
        graph: &SceneGraph,
        pending: &[PendingMesh],
        receiver: &mut dyn SceneReceiver,
    ) -> ExportResult<()> {
        let mut written: HashSet<*const TextureDef> = HashSet::new();
        for mesh in pending {
            let node = graph.node(mesh.id)?;
            if node.flags.contains(NodeFlags::PORTAL) {
                continue;
            }
            let Some(texture) = node.material.as_ref().and_then(|m| m.color.texture()) else {
                continue;
            };
            if !written.insert(Rc::as_ptr(texture)) {
                continue;
            }

            self.params.clear();
            texture_params(texture, &mut self.params)?;
            receiver.texture(&texture.name, "color", "imagemap", &self.params)?;
            log::debug!("Exported texture '{}' ({})", texture.name, texture.filename);
            self.stats.textures += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Color;
    use crate::params::ParamType;

    #[test]
    fn test_default_material_is_grey_matte() {
        let mut params = ParameterSet::default();
        let name = material_params(&MaterialDef::default_matte(), &mut params).unwrap();
        assert_eq!(name, "matte");
        let kd = params.get("Kd").unwrap();
        assert_eq!(kd.param_type(), ParamType::Color);
    }

    #[test]
    fn test_textured_channel_references_texture() {
        let texture = Rc::new(TextureDef {
            name: "wood".into(),
            filename: "wood.png".into(),
            gamma: 2.2,
        });
        let material = MaterialDef {
            name: "floor".into(),
            kind: MaterialKind::Glossy { roughness: 0.2 },
            color: Channel::Texture(texture),
        };
        let mut params = ParameterSet::default();
        assert_eq!(material_params(&material, &mut params).unwrap(), "glossy");

        let kd = params.get("Kd").unwrap();
        assert_eq!(kd.param_type(), ParamType::Texture);
        let names: Vec<_> = params.iter().map(|e| e.name()).collect();
        assert_eq!(names, ["Kd", "Ks", "uroughness", "vroughness"]);
    }

    #[test]
    fn test_glass_uses_transmission_channel() {
        let material = MaterialDef {
            name: "glass".into(),
            kind: MaterialKind::Glass { index: 1.5 },
            color: Channel::Color(Color::new(1.0, 1.0, 1.0)),
        };
        let mut params = ParameterSet::default();
        assert_eq!(material_params(&material, &mut params).unwrap(), "glass");
        assert!(params.get("Kt").is_some());
    }
}
