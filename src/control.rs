// control.rs — the per-snapshot guidance loop.
//
// The tick itself is a pure function over one snapshot so the replay binary
// can re-run recorded data through it; `ControlWorker` is the thin I/O shell
// that busy-polls the mailbox and puts the result on the wire.

use nalgebra::Vector2;
use std::io::Write;
use std::sync::Arc;

use crate::config::GuidanceConfig;
use crate::data_log::TickRecord;
use crate::estimator::{
    build_observation, normalize_observation, GuidanceEvent, RelativeState, TargetStateEstimator,
};
use crate::frames::body_to_inertial;
use crate::lifecycle::StopFlag;
use crate::mailbox::Mailbox;
use crate::policy::Policy;
use crate::pose_history::PoseHistoryBuffer;
use crate::protocol::encode_command;
use crate::safety::clamp_runaway;
use crate::types::FusedSnapshot;

pub struct TickOutput {
    /// Final inertial-frame command after rotation, override and clamping.
    pub action: [f64; 3],
    /// The (possibly normalized) vector that went into the policy.
    pub observation: Vec<f64>,
    pub relative: RelativeState,
    pub events: Vec<GuidanceEvent>,
}

/// Run one control tick over `snapshot`.
pub fn control_tick(
    estimator: &mut TargetStateEstimator,
    history: &mut PoseHistoryBuffer,
    policy: &dyn Policy,
    config: &GuidanceConfig,
    snapshot: &FusedSnapshot,
) -> TickOutput {
    let (relative, events) = estimator.step(snapshot, history);

    let mut observation =
        build_observation(&relative, snapshot, config.include_absolute_chaser_position);
    if config.normalize_observation {
        normalize_observation(
            &mut observation,
            &config.observation_mean,
            &config.observation_half_range,
        );
    }

    // Policy output is linear acceleration in the body frame plus an angular
    // acceleration; the vehicle wants the linear part in the inertial frame.
    let raw = policy.infer(&observation);
    let linear = body_to_inertial(snapshot.red.theta, Vector2::new(raw[0], raw[1]));
    let mut action = [linear.x, linear.y, raw[2]];

    if config.debug_constant_acceleration {
        action = [config.constant_ax, config.constant_ay, config.constant_alpha];
    }

    // Runaway guard applies to the debug constants too
    let velocity = [snapshot.red.vx, snapshot.red.vy, snapshot.red.omega];
    let action = clamp_runaway(action, velocity, config.velocity_limit);

    TickOutput { action, observation, relative, events }
}

pub struct ControlWorker<W: Write> {
    writer: W,
    mailbox: Arc<Mailbox<FusedSnapshot>>,
    stop: StopFlag,
    policy: Box<dyn Policy>,
    config: GuidanceConfig,
    estimator: TargetStateEstimator,
    history: PoseHistoryBuffer,
}

impl<W: Write> ControlWorker<W> {
    pub fn new(
        writer: W,
        mailbox: Arc<Mailbox<FusedSnapshot>>,
        stop: StopFlag,
        policy: Box<dyn Policy>,
        config: GuidanceConfig,
    ) -> Self {
        let estimator = TargetStateEstimator::new(&config);
        let history = PoseHistoryBuffer::new(config.history_depth());
        ControlWorker { writer, mailbox, stop, policy, config, estimator, history }
    }

    /// Loop until the stop flag is set; returns the accumulated tick records
    /// for the shutdown flush.
    pub fn run(mut self) -> Vec<TickRecord> {
        log::info!("control worker running");
        let mut records = Vec::new();
        let mut ticks: u64 = 0;

        while !self.stop.is_set() {
            // Busy-poll: the controller must react within one sensor period,
            // so an empty slot means retry immediately, never block.
            let Some(snapshot) = self.mailbox.try_take() else {
                std::hint::spin_loop();
                continue;
            };

            let output = control_tick(
                &mut self.estimator,
                &mut self.history,
                self.policy.as_ref(),
                &self.config,
                &snapshot,
            );

            for event in &output.events {
                match event {
                    GuidanceEvent::TargetLatched { x, y, angle, .. } => {
                        log::info!("target latched at ({x:.3}, {y:.3}, {angle:.3})");
                    }
                }
            }

            let wire = encode_command(&output.action);
            if let Err(e) = self.writer.write_all(wire.as_bytes()) {
                log::warn!("command write failed: {e}");
            }

            ticks += 1;
            if ticks % 2000 == 0 {
                log::info!("tick {ticks}: action {:?} (inertial frame)", output.action);
            }

            // timestamp <= 0 means the experiment has not started yet
            if snapshot.timestamp > 0.0 {
                records.push(TickRecord {
                    time: snapshot.timestamp,
                    action: output.action,
                    red: snapshot.red,
                    black: snapshot.black,
                    vision: snapshot.vision,
                    target_inertial: self.estimator.latched_inertial(),
                });
            }
        }

        log::info!("control worker stopped after {ticks} ticks");
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PoseSample, VisionObservation};
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::f64::consts::PI;
    use std::sync::Mutex;
    use std::time::Duration;

    struct FixedPolicy([f64; 3]);

    impl Policy for FixedPolicy {
        fn infer(&self, _observation: &[f64]) -> [f64; 3] {
            self.0
        }
    }

    struct ProbePolicy(RefCell<Vec<f64>>);

    impl Policy for ProbePolicy {
        fn infer(&self, observation: &[f64]) -> [f64; 3] {
            *self.0.borrow_mut() = observation.to_vec();
            [0.0; 3]
        }
    }

    fn plain_config() -> GuidanceConfig {
        GuidanceConfig { normalize_observation: false, ..Default::default() }
    }

    fn snapshot_at(red: PoseSample) -> FusedSnapshot {
        FusedSnapshot {
            timestamp: 1.0,
            red,
            black: PoseSample { x: 1.0, y: 1.0, ..Default::default() },
            vision: VisionObservation::default(),
        }
    }

    #[test]
    fn test_action_rotated_into_inertial_frame() {
        let config = plain_config();
        let mut estimator = TargetStateEstimator::new(&config);
        let mut history = PoseHistoryBuffer::new(config.history_depth());
        let policy = FixedPolicy([1.0, 0.0, 0.1]);

        // Chaser facing +y: a body-frame +x command is an inertial +y push
        let snap = snapshot_at(PoseSample { theta: PI / 2.0, ..Default::default() });
        let output = control_tick(&mut estimator, &mut history, &policy, &config, &snap);
        assert_relative_eq!(output.action[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(output.action[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(output.action[2], 0.1);
    }

    #[test]
    fn test_debug_override_still_clamped() {
        let config = GuidanceConfig {
            debug_constant_acceleration: true,
            constant_ax: 1.0,
            constant_ay: 1.0,
            constant_alpha: 1.0,
            velocity_limit: [2.0, 2.0, 2.0],
            normalize_observation: false,
            ..Default::default()
        };
        let mut estimator = TargetStateEstimator::new(&config);
        let mut history = PoseHistoryBuffer::new(config.history_depth());
        let policy = FixedPolicy([9.0, 9.0, 9.0]);

        let snap = snapshot_at(PoseSample { vx: 2.5, ..Default::default() });
        let output = control_tick(&mut estimator, &mut history, &policy, &config, &snap);
        // Override replaces the policy output, then the runaway guard zeroes
        // the axis whose velocity is already past the limit
        assert_eq!(output.action, [0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_normalization_reaches_policy() {
        let config = GuidanceConfig {
            normalize_observation: true,
            observation_mean: vec![0.0; 10],
            observation_half_range: vec![2.0; 10],
            ..Default::default()
        };
        let mut estimator = TargetStateEstimator::new(&config);
        let mut history = PoseHistoryBuffer::new(config.history_depth());
        let policy = ProbePolicy(RefCell::new(Vec::new()));

        // No detection: relative pose is black - red = (1, 1), halved by the
        // normalization range
        let snap = snapshot_at(PoseSample::default());
        control_tick(&mut estimator, &mut history, &policy, &config, &snap);
        let seen = policy.0.borrow();
        assert_eq!(seen.len(), 10);
        assert_relative_eq!(seen[0], 0.5);
        assert_relative_eq!(seen[1], 0.5);
    }

    #[derive(Clone)]
    struct SharedWriter(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn run_worker_once(snapshot: FusedSnapshot) -> (Vec<TickRecord>, Vec<u8>) {
        let mailbox = Arc::new(Mailbox::new());
        mailbox.publish(snapshot);
        let stop = StopFlag::new();
        let sink = SharedWriter(Arc::new(Mutex::new(Vec::new())));
        let worker = ControlWorker::new(
            sink.clone(),
            mailbox,
            stop.clone(),
            Box::new(FixedPolicy([0.5, 0.0, 0.0])),
            plain_config(),
        );
        let handle = std::thread::spawn(move || worker.run());
        std::thread::sleep(Duration::from_millis(30));
        stop.set();
        let records = handle.join().unwrap();
        let written = sink.0.lock().unwrap().clone();
        (records, written)
    }

    #[test]
    fn test_worker_transmits_and_records() {
        let (records, written) = run_worker_once(snapshot_at(PoseSample::default()));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].time, 1.0);

        let wire = String::from_utf8(written).unwrap();
        assert_eq!(wire.lines().count(), 3);
        assert_eq!(wire.lines().next().unwrap().parse::<f64>().unwrap(), 0.5);
    }

    #[test]
    fn test_prestart_ticks_not_recorded() {
        let mut snap = snapshot_at(PoseSample::default());
        snap.timestamp = 0.0;
        let (records, written) = run_worker_once(snap);
        // Commands still go out before the experiment clock starts, but
        // nothing is logged
        assert!(records.is_empty());
        assert!(!written.is_empty());
    }
}
