use serde::{Deserialize, Serialize};

/// One pose-tracker sample for a single body, in the inertial (table) frame.
/// `theta` is absolute heading, `omega` its rate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseSample {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
    pub vx: f64,
    pub vy: f64,
    pub omega: f64,
}

impl PoseSample {
    pub fn planar(&self) -> PlanarPose {
        PlanarPose { x: self.x, y: self.y, theta: self.theta }
    }
}

/// Position-only pose. Used for the capture anchor and the history ring.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanarPose {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

/// One vision-detector result, expressed in the chaser's body frame at the
/// moment the source image was captured (~0.7 s before the result arrives).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VisionObservation {
    pub relative_x: f64,
    pub relative_y: f64,
    pub relative_angle: f64,
    pub confidence: f64,
}

impl VisionObservation {
    pub fn sees_target(&self, threshold: f64) -> bool {
        self.confidence > threshold
    }
}

/// The unit carried by the mailbox: the union of the latest known value of
/// every sensor class, as of one ingestion tick. Older snapshots are
/// overwritten, never queued.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FusedSnapshot {
    pub timestamp: f64,
    pub red: PoseSample,
    pub black: PoseSample,
    pub vision: VisionObservation,
}
