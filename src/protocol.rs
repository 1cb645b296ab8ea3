// protocol.rs — text wire format shared with the repeater process.
//
// Inbound records are newline-delimited decimal text. A leading "SPOTNet"
// tag line marks a vision record (4 numeric lines follow); anything else is
// a dual-pose record of 13 numeric lines (timestamp + red x6 + black x6).
// Outbound commands are 3 newline-terminated lines: accel_x, accel_y, alpha.

use crate::types::{PoseSample, VisionObservation};

pub const VISION_TAG: &str = "SPOTNet";

const VISION_FIELDS: usize = 4;
const POSE_FIELDS: usize = 13;

/// Every inbound packet decodes to exactly one of these.
#[derive(Clone, Debug, PartialEq)]
pub enum WireRecord {
    Vision(VisionObservation),
    DualPose { timestamp: f64, red: PoseSample, black: PoseSample },
    Malformed(String),
}

/// Decode one packet's worth of text. Never fails: undecodable input comes
/// back as `Malformed` with a reason for the log.
pub fn decode_packet(text: &str) -> WireRecord {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();

    if lines.first().map(|l| l.trim()) == Some(VISION_TAG) {
        match parse_fields(&lines[1..], VISION_FIELDS) {
            Ok(f) => WireRecord::Vision(VisionObservation {
                relative_x: f[0],
                relative_y: f[1],
                relative_angle: f[2],
                confidence: f[3],
            }),
            Err(reason) => WireRecord::Malformed(format!("vision record: {reason}")),
        }
    } else {
        match parse_fields(&lines, POSE_FIELDS) {
            Ok(f) => WireRecord::DualPose {
                timestamp: f[0],
                red: PoseSample { x: f[1], y: f[2], theta: f[3], vx: f[4], vy: f[5], omega: f[6] },
                black: PoseSample {
                    x: f[7],
                    y: f[8],
                    theta: f[9],
                    vx: f[10],
                    vy: f[11],
                    omega: f[12],
                },
            },
            Err(reason) => WireRecord::Malformed(format!("pose record: {reason}")),
        }
    }
}

/// Encode one acceleration command for the wire.
pub fn encode_command(action: &[f64; 3]) -> String {
    format!("{}\n{}\n{}\n", action[0], action[1], action[2])
}

fn parse_fields(lines: &[&str], expected: usize) -> Result<Vec<f64>, String> {
    if lines.len() != expected {
        return Err(format!("expected {} fields, got {}", expected, lines.len()));
    }
    lines
        .iter()
        .map(|l| {
            l.trim()
                .parse::<f64>()
                .map_err(|_| format!("non-numeric field {:?}", l.trim()))
        })
        .collect()
}
