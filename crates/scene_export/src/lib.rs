//! # Scene Export
//!
//! Converts a hierarchical 3D scene into the text scene-description format
//! of a physically based renderer.
//!
//! ## Features
//!
//! - **Scene Conversion**: Visibility-aware traversal of lights, cameras and meshes
//! - **Mesh Compaction**: Point/normal deduplication and triangulation
//! - **Typed Parameters**: Ordered, type-tagged parameter sets
//! - **Text Serialization**: Deterministic output with fixed float precision
//! - **Settings Files**: TOML and RON configuration with defaults
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_export::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let document = SceneDocument::load_from_file("scene.ron")?;
//!     let graph = document.build()?;
//!
//!     let mut converter = SceneConverter::new(ExportSettings::default());
//!     let mut writer = SceneWriter::new(FileSink::new("scene.lxs"));
//!     let stats = converter.convert(&graph, &mut writer)?;
//!     println!("{} triangles written", stats.triangles);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod settings;
pub mod params;
pub mod geometry;
pub mod scene;
pub mod receiver;
pub mod writer;
pub mod converter;

mod error;

pub use error::{ErrorCategory, ExportError, ExportResult};

#[cfg(test)]
mod tests;

/// Common imports for exporter users
pub mod prelude {
    pub use crate::{
        ErrorCategory, ExportError, ExportResult,
        config::{Config, ConfigError},
        converter::{ConvertState, ConvertStats, SceneConverter},
        foundation::math::{Mat4, Transform, Vec3},
        geometry::{DedupedMesh, GeometryCache, Polygon, RawMesh},
        params::{ParamType, ParameterSet},
        receiver::{RecordingReceiver, SceneReceiver, Statement, Verb},
        scene::{NodeFlags, NodeId, NodeKind, SceneDocument, SceneGraph, SceneNode, Visibility},
        settings::ExportSettings,
        writer::{FileSink, MemorySink, SceneWriter, SinkFactory},
    };
}
