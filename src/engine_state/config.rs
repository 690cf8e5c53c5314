//! # Engine Configuration
//!
//! Everything the engine can be tuned with, loaded from JSON. Missing fields
//! take their defaults, so `{}` is a valid configuration.
//!
//! ```json
//! {
//!     "seed": 20134,
//!     "chunk_size": { "x": 16, "y": 256, "z": 16 },
//!     "region_magnitude": { "x": 12, "y": 1, "z": 12 },
//!     "initial_edits": [{ "x": 5, "y": 70, "z": 5, "block": "glass" }]
//! }
//! ```

use std::path::{Path, PathBuf};

use cgmath::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::voxels::block::block_type::BlockType;
use super::voxels::chunk::ChunkDimensions;

/// Errors produced while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("unknown block name `{0}`")]
    UnknownBlock(String),
}

/// Number of chunks the active region spans on each axis.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionMagnitude {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl RegionMagnitude {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        RegionMagnitude { x, y, z }
    }

    pub fn as_vector(&self) -> Vector3<i32> {
        Vector3::new(self.x, self.y, self.z)
    }
}

impl Default for RegionMagnitude {
    fn default() -> Self {
        RegionMagnitude::new(12, 1, 12)
    }
}

/// A block placed when the engine starts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditSpec {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    /// Block name, e.g. `"glass"` or `"red_flower"`.
    pub block: String,
}

impl EditSpec {
    pub fn resolve(&self) -> Result<(Point3<i32>, BlockType), ConfigError> {
        let block = BlockType::from_name(&self.block)
            .ok_or_else(|| ConfigError::UnknownBlock(self.block.clone()))?;
        Ok((Point3::new(self.x, self.y, self.z), block))
    }
}

/// Engine configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// World seed shared by every noise and the decoration RNG.
    pub seed: i32,
    /// Absolute y below which empty terrain fills with water.
    pub water_level: i32,
    pub chunk_size: ChunkDimensions,
    pub region_magnitude: RegionMagnitude,
    /// Chunks loaded (or dispatched to workers) per frame.
    pub load_budget: usize,
    /// Chunk rebuilds and transparent re-sorts per frame.
    pub mesh_budget: usize,
    /// Generation workers; zero generates on the calling thread.
    pub worker_threads: usize,
    /// Keep face lists after upload so re-sorting only rewrites indices.
    pub persist_face_lists: bool,
    /// Distance in blocks the viewer may move before transparent faces are
    /// re-sorted.
    pub resort_distance: f32,
    pub wireframe: bool,
    /// Frames simulated by the headless runner.
    pub ticks: u32,
    /// Viewer start position for the headless runner.
    pub viewer_start: [f32; 3],
    /// Blocks the headless viewer walks along +X per frame.
    pub walk_speed: f32,
    pub initial_edits: Vec<EditSpec>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            seed: 20134,
            water_level: 64,
            chunk_size: ChunkDimensions::DEFAULT,
            region_magnitude: RegionMagnitude::default(),
            load_budget: 4,
            mesh_budget: 4,
            worker_threads: 0,
            persist_face_lists: true,
            resort_distance: 4.0,
            wireframe: false,
            ticks: 120,
            viewer_start: [8.0, 80.0, 8.0],
            walk_speed: 2.0,
            initial_edits: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Checks value ranges and resolves every initial edit's block name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let size = self.chunk_size;
        if size.x == 0 || size.y == 0 || size.z == 0 {
            return Err(ConfigError::Invalid(format!(
                "chunk_size must be non-zero on every axis, got {size:?}"
            )));
        }
        let magnitude = self.region_magnitude;
        if magnitude.x < 1 || magnitude.y < 1 || magnitude.z < 1 {
            return Err(ConfigError::Invalid(format!(
                "region_magnitude must be at least 1 on every axis, got {magnitude:?}"
            )));
        }
        if self.water_level < 1 {
            return Err(ConfigError::Invalid(format!(
                "water_level must be positive, got {}",
                self.water_level
            )));
        }
        if !self.resort_distance.is_finite() || self.resort_distance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "resort_distance must be a non-negative number, got {}",
                self.resort_distance
            )));
        }
        if self.load_budget == 0 || self.mesh_budget == 0 {
            return Err(ConfigError::Invalid(
                "load_budget and mesh_budget must be at least 1".to_string(),
            ));
        }
        for edit in &self.initial_edits {
            edit.resolve()?;
        }
        Ok(())
    }

    /// The initial edits with their block names resolved.
    pub fn resolved_edits(&self) -> Result<Vec<(Point3<i32>, BlockType)>, ConfigError> {
        self.initial_edits.iter().map(EditSpec::resolve).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.chunk_size, ChunkDimensions::new(16, 256, 16));
        assert_eq!(config.region_magnitude, RegionMagnitude::new(12, 1, 12));
        assert_eq!(config.seed, 20134);
        assert!(config.persist_face_lists);
    }

    #[test]
    fn test_partial_json_overrides() {
        let config = EngineConfig::from_json_str(
            r#"{
                "seed": 7,
                "chunk_size": { "x": 8, "y": 128, "z": 8 },
                "region_magnitude": { "x": 4, "y": 1, "z": 4 },
                "initial_edits": [{ "x": 1, "y": 2, "z": 3, "block": "glass" }]
            }"#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.chunk_size, ChunkDimensions::new(8, 128, 8));
        assert_eq!(config.load_budget, 4);
        assert_eq!(
            config.resolved_edits().unwrap(),
            vec![(Point3::new(1, 2, 3), BlockType::Glass)]
        );
    }

    #[test]
    fn test_unknown_block_rejected() {
        let error = EngineConfig::from_json_str(
            r#"{ "initial_edits": [{ "x": 0, "y": 0, "z": 0, "block": "unobtainium" }] }"#,
        )
        .unwrap_err();
        assert!(matches!(error, ConfigError::UnknownBlock(name) if name == "unobtainium"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let error =
            EngineConfig::from_json_str(r#"{ "region_magnitude": { "x": 0, "y": 1, "z": 1 } }"#)
                .unwrap_err();
        assert!(matches!(error, ConfigError::Invalid(_)));

        let error = EngineConfig::from_json_str(r#"{ "mesh_budget": 0 }"#).unwrap_err();
        assert!(matches!(error, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let error = EngineConfig::from_json_str("{ seed: ").unwrap_err();
        assert!(matches!(error, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let error = EngineConfig::from_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(error, ConfigError::Io { .. }));
    }
}
