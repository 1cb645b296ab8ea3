// estimator.rs — latency-compensated target state estimation.
//
// The vision detector describes the world as it was ~0.7 s ago. To keep the
// target from appearing to move whenever the chaser moves between detector
// results, the estimator latches an inertial estimate of the target's pose
// on each genuinely new detection and holds it constant until the next one.
// The per-tick relative pose is then recomputed against the chaser's current
// pose, so it correctly tracks the chaser's own motion.
//
// Everything here is pure per-tick computation over one FusedSnapshot; no
// I/O, no clocks. The control worker drives it live, the replay binary
// drives it from recorded logs.

use nalgebra::Vector2;

use crate::config::GuidanceConfig;
use crate::frames::{body_to_inertial, inertial_to_body, wrap_2pi};
use crate::pose_history::PoseHistoryBuffer;
use crate::types::{FusedSnapshot, PlanarPose};

// ─── Events ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub enum GuidanceEvent {
    /// A new detector result arrived and the inertial target estimate was
    /// re-latched. `anchor` is the chaser pose the detection was referenced to.
    TargetLatched { x: f64, y: f64, angle: f64, anchor: PlanarPose },
}

// ─── Output ──────────────────────────────────────────────────────────────────

/// Body-frame relative pose of the target, offset-corrected, as of this tick.
#[derive(Clone, Copy, Debug)]
pub struct RelativeState {
    pub x: f64,
    pub y: f64,
    pub angle: f64,
    /// True when the vision path produced this state; false when it fell back
    /// to the directly measured reference body.
    pub from_vision: bool,
}

// ─── The estimator ───────────────────────────────────────────────────────────

pub struct TargetStateEstimator {
    confidence_threshold: f64,
    detection_epsilon: f64,
    offset: PlanarPose,

    // Inertial target estimate, held constant between detection edges
    latched: PlanarPose,
    // Chaser pose at the assumed capture instant of the next pending image
    anchor: PlanarPose,
    // Edge detector on the raw detector output (x only, preserved behavior)
    prev_relative_x: f64,
}

impl TargetStateEstimator {
    pub fn new(config: &GuidanceConfig) -> Self {
        TargetStateEstimator {
            confidence_threshold: config.detection_confidence_threshold,
            detection_epsilon: config.detection_epsilon,
            offset: PlanarPose {
                x: config.docking_offset_x,
                y: config.docking_offset_y,
                theta: config.docking_offset_angle,
            },
            latched: PlanarPose::default(),
            anchor: PlanarPose::default(),
            prev_relative_x: 0.0,
        }
    }

    /// The current inertial target estimate, for logging.
    pub fn latched_inertial(&self) -> PlanarPose {
        self.latched
    }

    /// Run one tick. `history` is the chaser's pose ring owned by the control
    /// worker; it is consulted only on ticks without a detection, to keep the
    /// capture anchor a plausible recent-past pose.
    pub fn step(
        &mut self,
        snapshot: &FusedSnapshot,
        history: &mut PoseHistoryBuffer,
    ) -> (RelativeState, Vec<GuidanceEvent>) {
        let mut events = Vec::new();
        let red = &snapshot.red;
        let vision = &snapshot.vision;

        let relative = if vision.sees_target(self.confidence_threshold) {
            // A repeated message carries the same relative_x; only an actual
            // change marks a new detector result worth re-latching on.
            if (self.prev_relative_x - vision.relative_x).abs() > self.detection_epsilon {
                let relative_body = Vector2::new(vision.relative_x, vision.relative_y);
                let relative_inertial = body_to_inertial(self.anchor.theta, relative_body);
                self.latched = PlanarPose {
                    x: self.anchor.x + relative_inertial.x,
                    y: self.anchor.y + relative_inertial.y,
                    theta: self.anchor.theta + vision.relative_angle,
                };
                // A fresh image is assumed captured right now; its result will
                // arrive one processing interval later and be referenced here.
                self.anchor = red.planar();
                self.prev_relative_x = vision.relative_x;
                events.push(GuidanceEvent::TargetLatched {
                    x: self.latched.x,
                    y: self.latched.y,
                    angle: self.latched.theta,
                    anchor: self.anchor,
                });
            }

            // Recompute the relative pose against the chaser's *current*
            // position every tick, so it tracks our own motion between
            // detector updates instead of freezing.
            let relative_inertial = Vector2::new(self.latched.x - red.x, self.latched.y - red.y);
            let relative_body = inertial_to_body(red.theta, relative_inertial);
            RelativeState {
                x: relative_body.x - self.offset.x,
                y: relative_body.y - self.offset.y,
                angle: wrap_2pi(self.latched.theta - red.theta - self.offset.theta),
                from_vision: true,
            }
        } else {
            // No detection: the reference body's pose arrives at full rate
            // with no processing delay, so use it directly.
            let black = &snapshot.black;
            let relative_inertial = Vector2::new(black.x - red.x, black.y - red.y);
            let relative_body = inertial_to_body(red.theta, relative_inertial);

            // Keep the anchor synthesized from one processing interval ago,
            // so a resuming detection references a plausible recent pose.
            self.anchor = history.recall_oldest_and_replace(red.planar());

            RelativeState {
                x: relative_body.x - self.offset.x,
                y: relative_body.y - self.offset.y,
                angle: wrap_2pi(black.theta - red.theta - self.offset.theta),
                from_vision: false,
            }
        };

        (relative, events)
    }
}

// ─── Observation assembly ────────────────────────────────────────────────────

/// Assemble the policy input in its fixed field order.
pub fn build_observation(
    relative: &RelativeState,
    snapshot: &FusedSnapshot,
    include_absolute_chaser_position: bool,
) -> Vec<f64> {
    let red = &snapshot.red;
    let mut observation = vec![relative.x, relative.y, relative.angle];
    if include_absolute_chaser_position {
        observation.extend([red.x, red.y]);
    }
    observation.extend([red.theta, red.vx, red.vy, red.omega, snapshot.black.omega]);
    observation
}

/// In-place linear normalization against fixed per-field mean/half-range.
pub fn normalize_observation(observation: &mut [f64], mean: &[f64], half_range: &[f64]) {
    for ((value, m), r) in observation.iter_mut().zip(mean).zip(half_range) {
        *value = (*value - m) / r;
    }
}
