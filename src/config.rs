// config.rs — every tunable of the guidance pipeline in one place.
//
// Defaults match the combined-experiment setup; any field can be overridden
// from a JSON file passed with --config.

use serde::Deserialize;
use std::f64::consts::PI;
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GuidanceConfig {
    // ── Vision detector ──
    pub detection_confidence_threshold: f64,
    /// A change in relative_x larger than this marks a genuinely new detector
    /// result (as opposed to a repeat of the last message).
    pub detection_epsilon: f64,
    /// How long the detector takes to process one image [s].
    pub camera_processing_time: f64,
    /// Pose tracker sample period [s].
    pub pose_sample_period: f64,

    // ── Observation assembly ──
    pub include_absolute_chaser_position: bool,
    pub normalize_observation: bool,
    pub observation_mean: Vec<f64>,
    pub observation_half_range: Vec<f64>,

    // ── Docking offsets (body frame) ──
    pub docking_offset_x: f64,
    pub docking_offset_y: f64,
    pub docking_offset_angle: f64,

    // ── Safety ──
    /// Per-axis velocity limit [vx, vy, omega] beyond which same-sign
    /// accelerations are zeroed.
    pub velocity_limit: [f64; 3],

    // ── Debug override ──
    pub debug_constant_acceleration: bool,
    pub constant_ax: f64,
    pub constant_ay: f64,
    pub constant_alpha: f64,

    // ── Transport ──
    pub read_timeout_secs: f64,
    pub connect_retry_secs: f64,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            detection_confidence_threshold: 0.8,
            detection_epsilon: 0.001,
            camera_processing_time: 0.7,
            pose_sample_period: 0.5,
            include_absolute_chaser_position: true,
            normalize_observation: true,
            // [rel_x, rel_y, rel_angle, red_x, red_y, red_theta,
            //  red_vx, red_vy, red_omega, black_omega] on a 3.5 x 2.4 m table
            observation_mean: vec![0.0, 0.0, PI, 1.75, 1.2, PI, 0.0, 0.0, 0.0, 0.0],
            observation_half_range: vec![2.0, 2.0, PI, 1.75, 1.2, PI, 0.2, 0.2, 0.4, 0.4],
            docking_offset_x: 0.0,
            docking_offset_y: 0.0,
            docking_offset_angle: 0.0,
            velocity_limit: [0.2, 0.2, 0.4],
            debug_constant_acceleration: false,
            constant_ax: 0.0,
            constant_ay: 0.0,
            constant_alpha: 0.0,
            read_timeout_secs: 2.0,
            connect_retry_secs: 1.0,
        }
    }
}

impl GuidanceConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: GuidanceConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Depth of the pose history ring: how many tracker ticks fit into one
    /// detector processing interval.
    pub fn history_depth(&self) -> usize {
        (self.camera_processing_time / self.pose_sample_period).ceil().max(1.0) as usize
    }

    /// Length of the observation vector under the current composition.
    pub fn observation_len(&self) -> usize {
        if self.include_absolute_chaser_position { 10 } else { 8 }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.pose_sample_period <= 0.0 || self.camera_processing_time <= 0.0 {
            anyhow::bail!("camera_processing_time and pose_sample_period must be positive");
        }
        let n = self.observation_len();
        if self.normalize_observation
            && (self.observation_mean.len() != n || self.observation_half_range.len() != n)
        {
            anyhow::bail!(
                "normalization vectors must have length {} (got mean: {}, half_range: {})",
                n,
                self.observation_mean.len(),
                self.observation_half_range.len()
            );
        }
        if self.normalize_observation && self.observation_half_range.iter().any(|&r| r <= 0.0) {
            anyhow::bail!("observation_half_range entries must be positive");
        }
        Ok(())
    }
}
