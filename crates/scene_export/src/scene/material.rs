//! Materials and image textures

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::foundation::math::Color;

/// Image texture shared between materials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureDef {
    /// Name used to reference the texture
    pub name: String,
    /// Image path
    pub filename: String,
    /// Gamma the image was encoded with
    #[serde(default = "default_texture_gamma")]
    pub gamma: f32,
}

fn default_texture_gamma() -> f32 {
    2.2
}

/// Colour input of a material
#[derive(Debug, Clone, PartialEq)]
pub enum Channel {
    /// Constant linear colour
    Color(Color),
    /// Shared image texture
    Texture(Rc<TextureDef>),
}

impl Channel {
    /// Texture behind this channel, if any
    pub fn texture(&self) -> Option<&Rc<TextureDef>> {
        match self {
            Self::Texture(texture) => Some(texture),
            Self::Color(_) => None,
        }
    }
}

/// Surface model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaterialKind {
    /// Lambertian diffuse
    Matte,
    /// Diffuse base with a glossy coating
    Glossy {
        /// Coating roughness in 0..1
        roughness: f32,
    },
    /// Dielectric
    Glass {
        /// Index of refraction
        index: f32,
    },
    /// Perfect specular reflector
    Mirror,
}

/// Material assigned to mesh nodes
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDef {
    /// Material name
    pub name: String,
    /// Surface model
    pub kind: MaterialKind,
    /// Diffuse, transmission or reflection colour depending on `kind`
    pub color: Channel,
}

impl MaterialDef {
    /// Grey matte used for meshes without a material
    pub fn default_matte() -> Self {
        Self {
            name: "default".to_string(),
            kind: MaterialKind::Matte,
            color: Channel::Color(Color::new(0.8, 0.8, 0.8)),
        }
    }
}
