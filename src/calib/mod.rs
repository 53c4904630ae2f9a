//! Calibration and parameter data for the projector pose pipeline.
//!
//! Three calibration tables (camera intrinsics, projector intrinsics, fixed
//! camera-to-projector extrinsic) plus two parameter sets (tracker tuning,
//! scene/projection setup). Everything is loaded once at setup and treated
//! as immutable afterwards. Missing or unreadable files are non-fatal: the
//! built-in defaults survive alongside a warning, and the pipeline starts
//! anyway.
//!
//! File formats follow the device's calibration tooling: the calibration
//! tables are plain whitespace-separated floats in row-major order, the
//! parameter files are `-key value` token streams with `//` line comments.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use nalgebra::Matrix3;
use tracing::{debug, info, warn};

use crate::geometry::Pose;

pub const CAMERA_CALIBRATION_FILE: &str = "CameraCalibration.txt";
pub const PROJECTOR_CALIBRATION_FILE: &str = "ProjectorCalibration.txt";
pub const RELATIVE_ORIENTATION_FILE: &str = "RelativeOrientationCamProj.txt";
pub const TRACKER_PARAMS_FILE: &str = "trackerParameters.txt";
pub const SCENE_PARAMS_FILE: &str = "sceneParameters.txt";

/// Camera intrinsics, projector intrinsics and the fixed camera-to-projector
/// extrinsic. Read-only after setup.
#[derive(Debug, Clone)]
pub struct CalibrationStore {
    pub camera_k: Matrix3<f32>,
    pub projector_k: Matrix3<f32>,
    pub cam_to_proj: Pose,
}

impl Default for CalibrationStore {
    fn default() -> Self {
        Self {
            // Factory calibration for the stock camera module; overridden by
            // the calibration file when present.
            camera_k: Matrix3::new(
                277.8069, 0.0, 161.273, 0.0, 278.9756, 119.5077, 0.0, 0.0, 1.0,
            ),
            projector_k: Matrix3::new(
                277.8069, 0.0, 161.273, 0.0, 278.9756, 119.5077, 0.0, 0.0, 1.0,
            ),
            cam_to_proj: Pose::identity(),
        }
    }
}

impl CalibrationStore {
    /// Load the three calibration tables from `dir`, keeping defaults for
    /// whichever files are missing.
    pub fn load_or_default(dir: &Path) -> Self {
        let mut store = Self::default();

        match read_floats(&dir.join(CAMERA_CALIBRATION_FILE), 9) {
            Ok(v) => store.camera_k = matrix3_from_row_major(&v),
            Err(e) => warn!("camera calibration not loaded, keeping defaults: {e:#}"),
        }
        match read_floats(&dir.join(PROJECTOR_CALIBRATION_FILE), 9) {
            Ok(v) => store.projector_k = matrix3_from_row_major(&v),
            Err(e) => warn!("projector calibration not loaded, keeping defaults: {e:#}"),
        }
        match read_floats(&dir.join(RELATIVE_ORIENTATION_FILE), 12) {
            Ok(v) => {
                let mut c = [0.0_f32; 12];
                c.copy_from_slice(&v[..12]);
                store.cam_to_proj = Pose::from_components(&c);
            }
            Err(e) => warn!("camera-projector extrinsic not loaded, keeping identity: {e:#}"),
        }

        info!(
            fx = store.camera_k[(0, 0)],
            fy = store.camera_k[(1, 1)],
            cx = store.camera_k[(0, 2)],
            cy = store.camera_k[(1, 2)],
            "camera intrinsics"
        );
        info!(
            fx = store.projector_k[(0, 0)],
            fy = store.projector_k[(1, 1)],
            cx = store.projector_k[(0, 2)],
            cy = store.projector_k[(1, 2)],
            "projector intrinsics"
        );
        store
    }

    /// Shift the projector principal point so image coordinates are centered
    /// at the image origin. Applied exactly once at setup.
    pub fn recenter_projector_principal_point(&mut self, proj_w: u32, proj_h: u32) {
        self.projector_k[(0, 2)] -= 0.5 * proj_w as f32;
        self.projector_k[(1, 2)] -= 0.5 * proj_h as f32;
    }
}

/// Tuning knobs for the external feature tracker, plus the calibrated
/// pointer y offset.
#[derive(Debug, Clone)]
pub struct TrackerParams {
    pub harris_threshold: u32,
    pub harris_sensitivity: f32,
    pub nonmax_window_size: u16,
    pub feature_match_radius: i32,
    pub feature_match_inlier_ratio1: f32,
    pub feature_match_inlier_ratio2: f32,
    pub features_minimum: i32,
    pub extend_workspace: bool,
    /// Calibrated y offset subtracted from the pointer estimate.
    pub projector_y_coord: i32,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            harris_threshold: 100,
            harris_sensitivity: 0.04,
            nonmax_window_size: 5,
            feature_match_radius: 16,
            feature_match_inlier_ratio1: 0.7,
            feature_match_inlier_ratio2: 0.8,
            features_minimum: 20,
            extend_workspace: false,
            projector_y_coord: 0,
        }
    }
}

/// Smoothing policy: filter enable and the two blend weights.
#[derive(Debug, Clone)]
pub struct SmoothingParams {
    pub enable_filter: bool,
    /// Blend weight while tracking-and-moving: favors responsiveness.
    pub alpha_moving: f32,
    /// Blend weight for every other tracked status: favors stability.
    pub alpha_stable: f32,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            enable_filter: true,
            alpha_moving: 0.95,
            alpha_stable: 0.25,
        }
    }
}

/// Projection surface and virtual object placement.
#[derive(Debug, Clone)]
pub struct SceneParams {
    pub proj_w: u32,
    pub proj_h: u32,
    pub obj_x: f32,
    pub obj_y: f32,
    pub obj_z: f32,
    pub obj_scale: f32,
    /// Axial displacement of the projector center, in world units. Positive
    /// moves the projector toward the world origin.
    pub projector_displacement: f32,
    /// Camera frames to skip before pose processing starts.
    pub initial_delay: u32,
}

impl Default for SceneParams {
    fn default() -> Self {
        Self {
            proj_w: 854,
            proj_h: 480,
            obj_x: 0.0,
            obj_y: 0.0,
            obj_z: 0.0,
            obj_scale: 1.0,
            projector_displacement: 0.0,
            initial_delay: 35,
        }
    }
}

/// Everything the engine needs at construction time.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub calibration: CalibrationStore,
    pub tracker: TrackerParams,
    pub smoothing: SmoothingParams,
    pub scene: SceneParams,
}

impl EngineConfig {
    /// Load calibration and parameter files from `dir`; every missing piece
    /// degrades to its default with a warning.
    pub fn load_or_default(dir: &Path) -> Self {
        let mut config = Self {
            calibration: CalibrationStore::load_or_default(dir),
            ..Self::default()
        };
        if let Err(e) = load_tracker_params(
            &dir.join(TRACKER_PARAMS_FILE),
            &mut config.tracker,
            &mut config.smoothing,
        ) {
            warn!("tracker parameters not loaded, keeping defaults: {e:#}");
        }
        if let Err(e) = load_scene_params(&dir.join(SCENE_PARAMS_FILE), &mut config.scene) {
            warn!("scene parameters not loaded, keeping defaults: {e:#}");
        }
        info!(
            enable_filter = config.smoothing.enable_filter,
            alpha_moving = config.smoothing.alpha_moving,
            alpha_stable = config.smoothing.alpha_stable,
            obj_scale = config.scene.obj_scale,
            displacement = config.scene.projector_displacement,
            "engine configuration"
        );
        config
    }
}

/// Update tracker and smoothing parameters from a `-key value` file.
pub fn load_tracker_params(
    path: &Path,
    tracker: &mut TrackerParams,
    smoothing: &mut SmoothingParams,
) -> Result<()> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_param_tokens(&text, |key, value| match key {
        "harrisThreshold" => set(&mut tracker.harris_threshold, key, value),
        "harrisSensitivity" => set(&mut tracker.harris_sensitivity, key, value),
        "nonmaxWindowSize" => set(&mut tracker.nonmax_window_size, key, value),
        "featureMatchRadius" => set(&mut tracker.feature_match_radius, key, value),
        "featureMatchInlierRatio1" => set(&mut tracker.feature_match_inlier_ratio1, key, value),
        "featureMatchInlierRatio2" => set(&mut tracker.feature_match_inlier_ratio2, key, value),
        "featuresMinimum" => set(&mut tracker.features_minimum, key, value),
        "extendWorkspace" => set_flag(&mut tracker.extend_workspace, key, value),
        "projectorYCoord" => set(&mut tracker.projector_y_coord, key, value),
        "enableFilter" => set_flag(&mut smoothing.enable_filter, key, value),
        "alpha1" => set(&mut smoothing.alpha_moving, key, value),
        "alpha2" => set(&mut smoothing.alpha_stable, key, value),
        _ => debug!("ignoring unknown tracker parameter -{key}"),
    });
    Ok(())
}

/// Update scene parameters from a `-key value` file.
pub fn load_scene_params(path: &Path, scene: &mut SceneParams) -> Result<()> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_param_tokens(&text, |key, value| match key {
        "projW" => set(&mut scene.proj_w, key, value),
        "projH" => set(&mut scene.proj_h, key, value),
        "objX" => set(&mut scene.obj_x, key, value),
        "objY" => set(&mut scene.obj_y, key, value),
        "objZ" => set(&mut scene.obj_z, key, value),
        "objScale" => set(&mut scene.obj_scale, key, value),
        "projectorDisplacement" => set(&mut scene.projector_displacement, key, value),
        "initialDelay" => set(&mut scene.initial_delay, key, value),
        _ => debug!("ignoring unknown scene parameter -{key}"),
    });
    Ok(())
}

fn parse_param_tokens(text: &str, mut apply: impl FnMut(&str, &str)) {
    for line in text.lines() {
        let line = line.split("//").next().unwrap_or("");
        let mut tokens = line.split_whitespace();
        while let Some(token) = tokens.next() {
            let Some(key) = token.strip_prefix('-') else {
                continue;
            };
            // Keys are alphabetic; a leading dash on a digit is a negative
            // number that lost its key, not a key.
            if key.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
                continue;
            }
            match tokens.next() {
                Some(value) => apply(key, value),
                None => warn!("parameter -{key} has no value"),
            }
        }
    }
}

fn set<T: FromStr>(slot: &mut T, key: &str, value: &str) {
    match value.parse::<T>() {
        Ok(v) => *slot = v,
        Err(_) => warn!("ignoring unparsable value '{value}' for -{key}"),
    }
}

/// Flags are written as 0/1 integers in the parameter files.
fn set_flag(slot: &mut bool, key: &str, value: &str) {
    match value.parse::<i32>() {
        Ok(v) => *slot = v != 0,
        Err(_) => warn!("ignoring unparsable value '{value}' for -{key}"),
    }
}

fn read_floats(path: &Path, expected: usize) -> Result<Vec<f32>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let values = text
        .split_whitespace()
        .map(|tok| {
            tok.parse::<f32>()
                .with_context(|| format!("parsing '{tok}' in {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;
    if values.len() < expected {
        bail!(
            "{} holds {} values, expected {}",
            path.display(),
            values.len(),
            expected
        );
    }
    Ok(values)
}

fn matrix3_from_row_major(v: &[f32]) -> Matrix3<f32> {
    Matrix3::new(v[0], v[1], v[2], v[3], v[4], v[5], v[6], v[7], v[8])
}
