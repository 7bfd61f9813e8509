//! JSON configuration and report helpers for marker detection.

use crate::{DetectError, DetectorParams, Marker, MarkerDetector};
use quadmark_core::{gl, CameraModel};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum IoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Detection run description: input image, calibration and parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectConfig {
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub camera: CameraModel,
    #[serde(default)]
    pub params: DetectorParams,
    #[serde(default)]
    pub output_path: Option<String>,
}

impl DetectConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Output report path, if one is configured.
    pub fn output_path(&self) -> Option<PathBuf> {
        self.output_path.as_ref().map(PathBuf::from)
    }

    /// Build a detector from this config.
    pub fn build_detector(&self) -> Result<MarkerDetector, DetectError> {
        MarkerDetector::new(self.camera, self.params.clone())
    }
}

/// A detected marker together with its renderer hand-off matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerReport {
    #[serde(flatten)]
    pub marker: Marker,
    /// Column-major OpenGL model-view matrix.
    pub gl_model_view: [f32; 16],
}

impl From<Marker> for MarkerReport {
    fn from(marker: Marker) -> Self {
        let gl_model_view = marker.gl_model_view();
        Self {
            marker,
            gl_model_view,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectReport {
    #[serde(default)]
    pub image_path: Option<String>,
    pub width: usize,
    pub height: usize,
    pub camera: CameraModel,
    /// Column-major OpenGL projection matching `camera` and the image size.
    pub gl_projection: [f32; 16],
    #[serde(default)]
    pub markers: Vec<MarkerReport>,
    #[serde(default)]
    pub error: Option<String>,
}

impl DetectReport {
    /// Build an empty report for an image of the given size.
    pub fn new(cfg: &DetectConfig, width: usize, height: usize) -> Self {
        let projection = gl::projection(
            &cfg.camera,
            width as f64,
            height as f64,
            gl::DEFAULT_NEAR,
            gl::DEFAULT_FAR,
        );
        Self {
            image_path: cfg.image_path.clone(),
            width,
            height,
            camera: cfg.camera,
            gl_projection: gl::to_column_major(&projection),
            markers: Vec::new(),
            error: None,
        }
    }

    /// Populate report fields from a successful detection.
    pub fn set_markers(&mut self, markers: Vec<Marker>) {
        self.markers = markers.into_iter().map(MarkerReport::from).collect();
        self.error = None;
    }

    /// Record a detection error.
    pub fn set_error(&mut self, err: impl std::fmt::Display) {
        self.error = Some(err.to_string());
    }

    /// Load a report from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
