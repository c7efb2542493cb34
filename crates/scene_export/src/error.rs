//! Crate-wide error type and failure categories

use thiserror::Error;

use crate::config::ConfigError;
use crate::geometry::GeometryError;
use crate::params::ParamError;
use crate::scene::SceneError;

/// Result type for export operations
pub type ExportResult<T> = Result<T, ExportError>;

/// Errors that abort a scene conversion
#[derive(Error, Debug)]
pub enum ExportError {
    /// Parameter set rejected an entry
    #[error("Parameter error: {0}")]
    Param(#[from] ParamError),

    /// Mesh processing failed
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// Scene graph construction or lookup failed
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Settings could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Output sink failed to open, write or close
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A receiver call arrived while no scene session was open
    #[error("No scene session is open (call start_scene first)")]
    SessionNotOpen,

    /// A block end without a matching begin
    #[error("{0} without a matching begin")]
    UnbalancedBlock(&'static str),

    /// The scene has no camera to render from
    #[error("No camera found in the scene")]
    NoCamera,

    /// An object-shaped area light points at a mesh with no emitting surface
    #[error("Area light '{light}' uses mesh '{mesh}' which has no emitting surface")]
    EmptyAreaLightMesh {
        /// Name of the light node
        light: String,
        /// Name of the referenced mesh node
        mesh: String,
    },

    /// A receiver implementation reported a failure of its own
    #[error("Receiver failed: {0}")]
    Receiver(String),
}

/// User-facing failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Scratch buffer or output allocation failed
    Resource,
    /// Writing, opening or closing the output failed
    Io,
    /// The scene data is incomplete or inconsistent
    MalformedInput,
    /// The exporter API was used incorrectly
    ProtocolMisuse,
}

impl ErrorCategory {
    /// Human-readable message for this category
    pub fn message(self) -> &'static str {
        match self {
            Self::Resource => "Ran out of memory while exporting the scene.",
            Self::Io => "Could not write the scene file.",
            Self::MalformedInput => "The scene contains invalid or incomplete data.",
            Self::ProtocolMisuse => "Internal exporter error: invalid statement or parameter.",
        }
    }
}

impl ExportError {
    /// Classify this error for user-facing reporting
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Param(e) => match e {
                ParamError::CapacityExhausted { .. } => ErrorCategory::Resource,
                _ => ErrorCategory::ProtocolMisuse,
            },
            Self::Geometry(e) => match e {
                GeometryError::Allocation(_) => ErrorCategory::Resource,
                _ => ErrorCategory::MalformedInput,
            },
            Self::Config(ConfigError::Io(_)) | Self::Io(_) | Self::Receiver(_) => ErrorCategory::Io,
            Self::Scene(_) | Self::Config(_) | Self::NoCamera | Self::EmptyAreaLightMesh { .. } => {
                ErrorCategory::MalformedInput
            }
            Self::SessionNotOpen | Self::UnbalancedBlock(_) => ErrorCategory::ProtocolMisuse,
        }
    }
}
