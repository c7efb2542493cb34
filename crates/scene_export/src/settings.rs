//! # Export Settings
//!
//! Global render parameters written ahead of the world block: film,
//! pixel filter, sampler, surface integrator and accelerator choices, plus
//! the unit scale and normal handling used during conversion.
//!
//! Every field has a serde default, so a settings file only needs the keys
//! it changes:
//!
//! ```toml
//! unit_scale = 0.01
//!
//! [film]
//! xresolution = 1280
//! yresolution = 720
//!
//! [sampler]
//! kind = "LowDiscrepancy"
//! pixel_samples = 16
//! ```

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError};
use crate::params::{ParamError, ParameterSet};

/// Film output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilmSettings {
    /// Image width in pixels
    pub xresolution: u32,
    /// Image height in pixels
    pub yresolution: u32,
    /// Display gamma
    pub gamma: f32,
    /// Output image base name
    pub filename: String,
    /// Whether the renderer writes a PNG alongside its native output
    pub write_png: bool,
    /// Samples per pixel after which rendering stops, 0 for unlimited
    pub halt_spp: u32,
}

impl Default for FilmSettings {
    fn default() -> Self {
        Self {
            xresolution: 640,
            yresolution: 480,
            gamma: 2.2,
            filename: "scene".to_string(),
            write_png: true,
            halt_spp: 0,
        }
    }
}

impl FilmSettings {
    /// Width divided by height
    pub fn aspect_ratio(&self) -> f32 {
        self.xresolution as f32 / self.yresolution as f32
    }

    /// Parameters of the `Film "fleximage"` statement
    pub fn to_params(&self, params: &mut ParameterSet) -> Result<(), ParamError> {
        params.add_int("xresolution", clamp_to_i32(self.xresolution))?;
        params.add_int("yresolution", clamp_to_i32(self.yresolution))?;
        params.add_float("gamma", self.gamma)?;
        params.add_string("filename", &self.filename)?;
        params.add_bool("write_png", self.write_png)?;
        if self.halt_spp > 0 {
            params.add_int("haltspp", clamp_to_i32(self.halt_spp))?;
        }
        Ok(())
    }
}

/// Reconstruction filter type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterKind {
    /// Mitchell-Netravali cubic
    #[default]
    Mitchell,
    /// Gaussian
    Gaussian,
    /// Box
    Box,
}

/// Pixel filter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PixelFilterSettings {
    /// Filter type
    pub kind: FilterKind,
    /// Filter radius along X in pixels
    pub x_width: f32,
    /// Filter radius along Y in pixels
    pub y_width: f32,
}

impl Default for PixelFilterSettings {
    fn default() -> Self {
        Self {
            kind: FilterKind::Mitchell,
            x_width: 1.5,
            y_width: 1.5,
        }
    }
}

impl PixelFilterSettings {
    /// Renderer name of the filter
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            FilterKind::Mitchell => "mitchell",
            FilterKind::Gaussian => "gaussian",
            FilterKind::Box => "box",
        }
    }

    /// Parameters of the `PixelFilter` statement
    pub fn to_params(&self, params: &mut ParameterSet) -> Result<(), ParamError> {
        params.add_float("xwidth", self.x_width)?;
        params.add_float("ywidth", self.y_width)
    }
}

/// Sampler type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SamplerKind {
    /// Metropolis light transport mutations
    #[default]
    Metropolis,
    /// Low-discrepancy sequences
    LowDiscrepancy,
    /// Uniform random samples
    Random,
}

/// Sampler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerSettings {
    /// Sampler type
    pub kind: SamplerKind,
    /// Samples per pixel (low-discrepancy and random)
    pub pixel_samples: u32,
    /// Probability of a large mutation (metropolis)
    pub large_mutation_prob: f32,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            kind: SamplerKind::Metropolis,
            pixel_samples: 4,
            large_mutation_prob: 0.4,
        }
    }
}

impl SamplerSettings {
    /// Renderer name of the sampler
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            SamplerKind::Metropolis => "metropolis",
            SamplerKind::LowDiscrepancy => "lowdiscrepancy",
            SamplerKind::Random => "random",
        }
    }

    /// Parameters of the `Sampler` statement
    pub fn to_params(&self, params: &mut ParameterSet) -> Result<(), ParamError> {
        match self.kind {
            SamplerKind::Metropolis => params.add_float("largemutationprob", self.large_mutation_prob),
            SamplerKind::LowDiscrepancy | SamplerKind::Random => {
                params.add_int("pixelsamples", clamp_to_i32(self.pixel_samples))
            }
        }
    }
}

/// Light transport algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IntegratorKind {
    /// Unidirectional path tracing
    Path,
    /// Bidirectional path tracing
    #[default]
    Bidirectional,
    /// Direct lighting only
    DirectLighting,
}

/// Surface integrator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratorSettings {
    /// Integrator type
    pub kind: IntegratorKind,
    /// Maximum path length
    pub max_depth: u32,
}

impl Default for IntegratorSettings {
    fn default() -> Self {
        Self {
            kind: IntegratorKind::Bidirectional,
            max_depth: 10,
        }
    }
}

impl IntegratorSettings {
    /// Renderer name of the integrator
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            IntegratorKind::Path => "path",
            IntegratorKind::Bidirectional => "bidirectional",
            IntegratorKind::DirectLighting => "directlighting",
        }
    }

    /// Parameters of the `SurfaceIntegrator` statement
    pub fn to_params(&self, params: &mut ParameterSet) -> Result<(), ParamError> {
        match self.kind {
            IntegratorKind::Bidirectional => {
                params.add_int("eyedepth", clamp_to_i32(self.max_depth))?;
                params.add_int("lightdepth", clamp_to_i32(self.max_depth))
            }
            IntegratorKind::Path | IntegratorKind::DirectLighting => {
                params.add_int("maxdepth", clamp_to_i32(self.max_depth))
            }
        }
    }
}

/// Ray intersection acceleration structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AcceleratorKind {
    /// Quad bounding volume hierarchy
    #[default]
    Qbvh,
    /// Binary bounding volume hierarchy
    Bvh,
    /// SAH kd-tree
    KdTree,
}

impl AcceleratorKind {
    /// Renderer name of the accelerator
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Qbvh => "qbvh",
            Self::Bvh => "bvh",
            Self::KdTree => "tabreckdtree",
        }
    }
}

/// Global export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Target units per source unit
    pub unit_scale: f32,
    /// Export per-corner normals when they are not trivial
    pub use_normals: bool,
    /// Comment written at the top of the scene file
    pub header: Option<String>,
    /// Accelerator
    pub accelerator: AcceleratorKind,
    /// Film
    pub film: FilmSettings,
    /// Pixel filter
    pub pixel_filter: PixelFilterSettings,
    /// Sampler
    pub sampler: SamplerSettings,
    /// Surface integrator
    pub integrator: IntegratorSettings,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            unit_scale: 0.01,
            use_normals: true,
            header: Some(format!("Exported by scene_export {}", env!("CARGO_PKG_VERSION"))),
            accelerator: AcceleratorKind::default(),
            film: FilmSettings::default(),
            pixel_filter: PixelFilterSettings::default(),
            sampler: SamplerSettings::default(),
            integrator: IntegratorSettings::default(),
        }
    }
}

impl Config for ExportSettings {}

impl ExportSettings {
    /// Reject values the renderer cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.film.xresolution == 0 || self.film.yresolution == 0 {
            return Err(invalid("film.resolution", "must be at least 1x1"));
        }
        if !(self.film.gamma > 0.0) {
            return Err(invalid("film.gamma", "must be positive"));
        }
        if !(self.unit_scale > 0.0) || !self.unit_scale.is_finite() {
            return Err(invalid("unit_scale", "must be a positive finite number"));
        }
        if !(self.pixel_filter.x_width > 0.0 && self.pixel_filter.y_width > 0.0) {
            return Err(invalid("pixel_filter.width", "must be positive"));
        }
        Ok(())
    }

    /// Load settings from a file and validate them
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let settings = Self::load_from_file(path)?;
        settings.validate()?;
        Ok(settings)
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

fn clamp_to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFormat;
    use crate::params::ParamValues;

    #[test]
    fn test_defaults_validate() {
        let settings = ExportSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.film.xresolution, 640);
        assert_eq!(settings.accelerator.type_name(), "qbvh");
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let text = "unit_scale = 1.0\n\n[film]\nxresolution = 1920\n";
        let settings = ExportSettings::from_str_as(text, ConfigFormat::Toml).unwrap();
        assert_eq!(settings.film.xresolution, 1920);
        assert_eq!(settings.film.yresolution, 480);
        assert_eq!(settings.unit_scale, 1.0);
        assert_eq!(settings.sampler, SamplerSettings::default());
    }

    #[test]
    fn test_partial_ron() {
        let text = "(sampler: (kind: LowDiscrepancy, pixel_samples: 16), accelerator: KdTree)";
        let settings = ExportSettings::from_str_as(text, ConfigFormat::Ron).unwrap();
        assert_eq!(settings.sampler.type_name(), "lowdiscrepancy");
        assert_eq!(settings.sampler.pixel_samples, 16);
        assert_eq!(settings.accelerator, AcceleratorKind::KdTree);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = ExportSettings::default();
        settings.film.yresolution = 0;
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid { field: "film.resolution", .. })));

        let mut settings = ExportSettings::default();
        settings.unit_scale = -1.0;
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid { field: "unit_scale", .. })));

        let mut settings = ExportSettings::default();
        settings.film.gamma = f32::NAN;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut settings = ExportSettings::default();
        settings.accelerator = AcceleratorKind::Bvh;
        let text = settings.to_string_as(ConfigFormat::Toml).unwrap();
        assert_eq!(ExportSettings::from_str_as(&text, ConfigFormat::Toml).unwrap(), settings);
    }

    #[test]
    fn test_film_params() {
        let mut film = FilmSettings::default();
        let mut params = ParameterSet::default();
        film.to_params(&mut params).unwrap();
        assert_eq!(params.len(), 5);
        assert!(params.get("haltspp").is_none());

        film.halt_spp = 256;
        params.clear();
        film.to_params(&mut params).unwrap();
        assert_eq!(params.get("haltspp").map(|e| e.values().clone()), Some(ParamValues::Int(vec![256])));
    }

    #[test]
    fn test_bidirectional_depths() {
        let mut params = ParameterSet::default();
        IntegratorSettings::default().to_params(&mut params).unwrap();
        let names: Vec<_> = params.iter().map(|e| e.name().to_string()).collect();
        assert_eq!(names, ["eyedepth", "lightdepth"]);
    }
}
