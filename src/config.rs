//! Configuration loading using Figment.
//!
//! A collection is described by one file (TOML, JSON or YAML, picked by
//! extension) merged with environment overrides prefixed `NEXGEN_`, nested keys
//! separated by `__`:
//!
//! ```text
//! NEXGEN_APPLICATION__LOG_LEVEL=debug
//! NEXGEN_DATA__LOGICAL_OFFSET=20
//! ```
//!
//! # Example
//! ```no_run
//! use nexgen::config::NexgenConfig;
//!
//! let config = NexgenConfig::load_from("config/example_grid.toml")?;
//! config.validate()?;
//! println!("Goniometer axes: {}", config.goniometer.axes.len());
//! # Ok::<(), nexgen::error::NexgenError>(())
//! ```

use crate::error::{AppResult, NexgenError};
use crate::geometry::{
    frame::matrix_from_basis, Axis, CoordinateFrame, DetectorModule, OriginMode, TransformationType,
    Vector3, ROOT,
};
use crate::scan::{ScanDirection, ScanOptions};
use crate::validation;
use crate::vds::{
    split_sources, DataFileTemplate, DataType, FrameShape, VirtualSourceSpec, MAX_FRAMES_PER_DATASET,
};
use figment::{
    providers::{Env, Format, Json, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "NEXGEN_";

/// Top-level configuration of one collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NexgenConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Sample positioning chain
    pub goniometer: GoniometerConfig,
    /// Detector positioning chain and module
    #[serde(default)]
    pub detector: DetectorConfig,
    /// Convention the configured vectors are expressed in
    #[serde(default)]
    pub coord_system: Option<CoordSystemConfig>,
    /// Data sources of the logical frame array
    #[serde(default)]
    pub data: Option<DataConfig>,
    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

/// One axis as written in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisConfig {
    /// Axis name, unique across both chains
    pub name: String,
    /// Parent axis name, or "." for the root
    #[serde(default = "default_depends_on")]
    pub depends_on: String,
    /// Rotation or translation
    pub transformation_type: TransformationType,
    /// Direction in the configured coordinate convention
    pub vector: Vector3,
    /// Position of the first frame (deg or mm)
    #[serde(default)]
    pub start_pos: f64,
    /// Step between frames
    #[serde(default)]
    pub increment: f64,
    /// Number of frames; set only on scanning axes
    #[serde(default)]
    pub num_steps: Option<usize>,
    /// Translation applied before the transformation
    #[serde(default)]
    pub offset: Vector3,
}

impl AxisConfig {
    /// Geometry axis described by this entry.
    pub fn to_axis(&self) -> Axis {
        Axis {
            name: self.name.clone(),
            transformation_type: self.transformation_type,
            vector: self.vector,
            depends_on: self.depends_on.clone(),
            start: self.start_pos,
            increment: self.increment,
            num_steps: self.num_steps,
            offset: self.offset,
        }
    }

    fn validate(&self, chain: &str) -> AppResult<()> {
        let fail = |reason: &str| {
            NexgenError::Configuration(format!("{} axis '{}': {}", chain, self.name, reason))
        };
        validation::is_not_empty(&self.name).map_err(fail)?;
        validation::is_not_empty(&self.depends_on).map_err(fail)?;
        validation::is_finite_vector(&self.vector).map_err(fail)?;
        validation::is_nonzero_vector(&self.vector).map_err(fail)?;
        validation::is_finite_vector(&self.offset).map_err(fail)?;
        validation::is_finite(self.start_pos).map_err(fail)?;
        validation::is_finite(self.increment).map_err(fail)?;
        Ok(())
    }
}

/// Kind of goniometer scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScanType {
    /// At most one scanning axis.
    #[default]
    Rotation,
    /// Two scanning axes forming a 2D grid.
    Grid,
}

/// Goniometer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoniometerConfig {
    /// Sample chain, in any order
    pub axes: Vec<AxisConfig>,
    /// Axis expected to scan; checked against the declared scan axes.
    #[serde(default)]
    pub scan_axis: Option<String>,
    /// Rotation or grid
    #[serde(default)]
    pub scan_type: ScanType,
    /// Reverse the fast axis on odd rows of a grid scan.
    #[serde(default)]
    pub snaked_scan: bool,
    /// Sign applied to the scanning axes' increments
    #[serde(default)]
    pub scan_direction: ScanDirection,
}

impl GoniometerConfig {
    /// Scan options carried by this section.
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            snaked: self.snaked_scan,
            direction: self.scan_direction,
        }
    }
}

/// Detector configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Detector positioning chain
    #[serde(default)]
    pub axes: Vec<AxisConfig>,
    /// Module geometry; adds a `module_offset` axis
    #[serde(default)]
    pub module: Option<DetectorModule>,
    /// How the module offset is written.
    #[serde(default)]
    pub origin_mode: OriginMode,
}

/// Coordinate system convention of the configured vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Convention {
    /// NeXus McStas frame, no conversion.
    #[default]
    McStas,
    /// imgCIF frame, x and z flipped.
    ImgCif,
    /// Basis vectors given in `vectors`.
    Custom,
}

/// Coordinate system section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordSystemConfig {
    /// Convention the axis vectors are written in
    #[serde(default)]
    pub convention: Convention,
    /// Basis vectors `[x, y, z]` of a custom frame, expressed in McStas.
    #[serde(default)]
    pub vectors: Option<[Vector3; 3]>,
}

impl CoordSystemConfig {
    /// Frame the configured vectors are converted from.
    pub fn frame(&self) -> AppResult<CoordinateFrame> {
        match self.convention {
            Convention::McStas => Ok(CoordinateFrame::McStas),
            Convention::ImgCif => Ok(CoordinateFrame::ImgCif),
            Convention::Custom => {
                let [x, y, z] = self.vectors.ok_or_else(|| {
                    NexgenError::Configuration(
                        "custom coordinate system requires 'vectors'".to_string(),
                    )
                })?;
                Ok(CoordinateFrame::Custom(matrix_from_basis(x, y, z)))
            }
        }
    }
}

/// One explicitly declared data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Data file path
    pub path: String,
    /// Frames the file holds
    pub frame_count: usize,
    /// Logical index of the file's first frame
    #[serde(default)]
    pub starting_logical_index: usize,
    /// Overrides the section's frame shape.
    #[serde(default)]
    pub frame_shape: Option<FrameShape>,
    /// Overrides the dtype derived from the section's bit depth.
    #[serde(default)]
    pub dtype: Option<DataType>,
}

/// Data files derived from a master file name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// `.nxs`, `*master*.h5` or `*meta*.h5` file the data files are named after.
    pub filename_template: PathBuf,
    /// Frames written; defaults to the scan length.
    #[serde(default)]
    pub num_frames: Option<usize>,
    /// Frames per data file
    #[serde(default = "default_max_frames_per_file")]
    pub max_frames_per_file: usize,
}

/// Data section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Length of the logical array; defaults to the scan length less
    /// `logical_offset`.
    #[serde(default)]
    pub total_frames: Option<usize>,
    /// Source frames skipped before logical frame 0
    #[serde(default)]
    pub logical_offset: usize,
    /// Detector bit depth, selects the element type
    #[serde(default)]
    pub bit_depth: Option<u32>,
    /// Frame shape shared by all sources
    pub frame_shape: FrameShape,
    /// Explicit data files; exclusive with `split`
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    /// Data files derived from a template; exclusive with `sources`
    #[serde(default)]
    pub split: Option<SplitConfig>,
}

impl DataConfig {
    /// Element type of every source unless overridden.
    pub fn dtype(&self) -> DataType {
        self.bit_depth.map(DataType::from_bit_depth).unwrap_or(DataType::U16)
    }

    /// Declared sources, or the split data files of a collection of
    /// `scan_frames` frames.
    pub fn source_specs(&self, scan_frames: usize) -> AppResult<Vec<VirtualSourceSpec>> {
        if let Some(split) = &self.split {
            let template = DataFileTemplate::from_master(&split.filename_template)?;
            return Ok(split_sources(
                &template,
                split.num_frames.unwrap_or(scan_frames),
                self.frame_shape,
                self.dtype(),
                split.max_frames_per_file,
            )?);
        }
        Ok(self
            .sources
            .iter()
            .map(|src| {
                VirtualSourceSpec::new(
                    src.path.clone(),
                    src.frame_count,
                    src.frame_shape.unwrap_or(self.frame_shape),
                    src.dtype.unwrap_or_else(|| self.dtype()),
                    src.starting_logical_index,
                )
            })
            .collect())
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// File the encoder writes
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
    /// Value unbacked logical frames read as
    #[serde(default = "default_fill_value")]
    pub fill_value: i64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            fill_value: default_fill_value(),
        }
    }
}

// Default value functions
fn default_name() -> String {
    "nexgen".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_depends_on() -> String {
    ROOT.to_string()
}

fn default_max_frames_per_file() -> usize {
    MAX_FRAMES_PER_DATASET
}

fn default_output_path() -> PathBuf {
    PathBuf::from("nexgen_manifest.json")
}

fn default_fill_value() -> i64 {
    crate::encoder::DEFAULT_FILL_VALUE
}

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const VALID_LOG_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

impl NexgenConfig {
    /// Load configuration from a file and `NEXGEN_` environment variables.
    ///
    /// The file format follows the extension: `.toml`, `.json`, `.yaml` or `.yml`.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(NexgenError::Configuration(format!(
                "configuration file '{}' not found",
                path.display()
            )));
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let figment = match ext.as_str() {
            "toml" => Figment::new().merge(Toml::file(path)),
            "json" => Figment::new().merge(Json::file(path)),
            "yaml" | "yml" => Figment::new().merge(Yaml::file(path)),
            other => {
                return Err(NexgenError::Configuration(format!(
                    "unsupported configuration format '{}' for '{}'",
                    other,
                    path.display()
                )))
            }
        };
        Ok(figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?)
    }

    /// Parse configuration from a TOML string, without environment overrides.
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        Ok(Figment::new().merge(Toml::string(content)).extract()?)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        let app = &self.application;
        if !VALID_LOG_LEVELS.contains(&app.log_level.to_lowercase().as_str()) {
            return Err(NexgenError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                app.log_level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }
        if !VALID_LOG_FORMATS.contains(&app.log_format.to_lowercase().as_str()) {
            return Err(NexgenError::Configuration(format!(
                "Invalid log_format '{}'. Must be one of: {}",
                app.log_format,
                VALID_LOG_FORMATS.join(", ")
            )));
        }

        let gonio = &self.goniometer;
        if gonio.axes.is_empty() {
            return Err(NexgenError::Configuration(
                "goniometer must declare at least one axis".to_string(),
            ));
        }
        for axis in &gonio.axes {
            axis.validate("goniometer")?;
        }
        for axis in &self.detector.axes {
            axis.validate("detector")?;
        }

        let scanning: Vec<&str> = gonio
            .axes
            .iter()
            .filter(|ax| ax.num_steps.is_some())
            .map(|ax| ax.name.as_str())
            .collect();
        // Step counts and more than two scanning axes are reported by the
        // scan engine as `ScanError`s.
        match (gonio.scan_type, scanning.len()) {
            (ScanType::Rotation, 0 | 1) | (ScanType::Grid, 2) => {}
            (_, n) if n > 2 => {}
            (scan_type, n) => {
                return Err(NexgenError::Configuration(format!(
                    "scan_type '{:?}' does not match {} scanning axes [{}]",
                    scan_type,
                    n,
                    scanning.join(", ")
                )))
            }
        }
        if let Some(scan_axis) = &gonio.scan_axis {
            if !gonio.axes.iter().any(|ax| &ax.name == scan_axis) {
                return Err(NexgenError::Configuration(format!(
                    "scan_axis '{}' is not a goniometer axis",
                    scan_axis
                )));
            }
        }

        if let Some(module) = &self.detector.module {
            for (label, v) in [("fast_axis", &module.fast_axis), ("slow_axis", &module.slow_axis)] {
                validation::is_nonzero_vector(v).map_err(|e| {
                    NexgenError::Configuration(format!("detector module {}: {}", label, e))
                })?;
            }
            if module.pixel_size.iter().any(|p| !(p.is_finite() && *p > 0.0)) {
                return Err(NexgenError::Configuration(format!(
                    "detector module pixel_size {:?} must be positive",
                    module.pixel_size
                )));
            }
        }

        if let Some(coord) = &self.coord_system {
            coord.frame()?;
        }

        if let Some(data) = &self.data {
            if data.frame_shape.rows == 0 || data.frame_shape.cols == 0 {
                return Err(NexgenError::Configuration(format!(
                    "data frame_shape {} must be non-empty",
                    data.frame_shape
                )));
            }
            if let Some(bits) = data.bit_depth {
                validation::is_in_range(bits, 1..=64).map_err(|e| {
                    NexgenError::Configuration(format!("data bit_depth {}: {}", bits, e))
                })?;
            }
            match (&data.split, data.sources.is_empty()) {
                (Some(_), false) => {
                    return Err(NexgenError::Configuration(
                        "data section declares both 'sources' and 'split'".to_string(),
                    ))
                }
                (None, true) => {
                    return Err(NexgenError::Configuration(
                        "data section declares neither 'sources' nor 'split'".to_string(),
                    ))
                }
                _ => {}
            }
            for src in &data.sources {
                validation::is_valid_path(&src.path).map_err(|e| {
                    NexgenError::Configuration(format!("data source '{}': {}", src.path, e))
                })?;
            }
        }

        Ok(())
    }

    /// Frame the configured vectors are expressed in.
    pub fn coordinate_frame(&self) -> AppResult<CoordinateFrame> {
        self.coord_system
            .as_ref()
            .map_or(Ok(CoordinateFrame::McStas), CoordSystemConfig::frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [[goniometer.axes]]
        name = "omega"
        transformation_type = "rotation"
        vector = [0.0, 0.0, -1.0]
        increment = 0.1
        num_steps = 10
    "#;

    #[test]
    fn defaults_fill_missing_sections() {
        let config = NexgenConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.application.log_level, "info");
        assert_eq!(config.goniometer.axes[0].depends_on, ".");
        assert_eq!(config.goniometer.scan_type, ScanType::Rotation);
        assert_eq!(config.output.fill_value, -1);
        assert!(config.data.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn axis_config_maps_start_pos() {
        let config = NexgenConfig::from_toml_str(MINIMAL).unwrap();
        let axis = config.goniometer.axes[0].to_axis();
        assert_eq!(axis.start, 0.0);
        assert_eq!(axis.num_steps, Some(10));
        assert!(axis.is_root_child());
    }

    #[test]
    fn rejects_grid_with_single_scan_axis() {
        let mut config = NexgenConfig::from_toml_str(MINIMAL).unwrap();
        config.goniometer.scan_type = ScanType::Grid;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("does not match 1 scanning axes"));
    }

    #[test]
    fn scan_step_checks_are_left_to_scan_engine() {
        let mut config = NexgenConfig::from_toml_str(MINIMAL).unwrap();
        config.goniometer.axes[0].num_steps = Some(0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn custom_frame_requires_vectors() {
        let coord = CoordSystemConfig {
            convention: Convention::Custom,
            vectors: None,
        };
        assert!(coord.frame().is_err());
    }

    #[test]
    fn bit_depth_selects_dtype() {
        let data = DataConfig {
            total_frames: None,
            logical_offset: 0,
            bit_depth: Some(32),
            frame_shape: FrameShape::new(4, 4),
            sources: vec![SourceConfig {
                path: "a.h5".to_string(),
                frame_count: 10,
                starting_logical_index: 0,
                frame_shape: None,
                dtype: None,
            }],
            split: None,
        };
        let specs = data.source_specs(10).unwrap();
        assert_eq!(specs[0].dtype, DataType::U32);
        assert_eq!(specs[0].frame_shape, FrameShape::new(4, 4));
    }
}
