// ingest.rs — wire packets in, fused snapshots out.
//
// One worker, one loop: read a packet (bounded by the socket read timeout so
// the stop flag is observed promptly), decode it, fold it into the retained
// per-class cache, publish the union. A packet that only updates one sensor
// class must not blank out the other class's most recent values.

use std::io::{ErrorKind, Read};
use std::sync::Arc;

use crate::lifecycle::StopFlag;
use crate::mailbox::Mailbox;
use crate::protocol::{decode_packet, WireRecord};
use crate::types::FusedSnapshot;

pub struct IngestionWorker<R: Read> {
    reader: R,
    mailbox: Arc<Mailbox<FusedSnapshot>>,
    stop: StopFlag,
    // Union of the latest successfully decoded value of each field class
    latest: FusedSnapshot,
}

impl<R: Read> IngestionWorker<R> {
    pub fn new(reader: R, mailbox: Arc<Mailbox<FusedSnapshot>>, stop: StopFlag) -> Self {
        IngestionWorker { reader, mailbox, stop, latest: FusedSnapshot::default() }
    }

    pub fn run(mut self) {
        log::info!("ingestion worker running");
        let mut buf = [0u8; 4096];

        while !self.stop.is_set() {
            let n = match self.reader.read(&mut buf) {
                Ok(0) => {
                    log::error!("transport closed by peer, ingestion stopping");
                    break;
                }
                Ok(n) => n,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    // No data yet; go around and re-check the stop flag
                    log::debug!("socket read timeout");
                    continue;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::error!("transport read failed: {e}, ingestion stopping");
                    break;
                }
            };

            let text = String::from_utf8_lossy(&buf[..n]);
            match decode_packet(&text) {
                WireRecord::Vision(vision) => {
                    log::debug!("vision record, confidence {:.2}", vision.confidence);
                    self.latest.vision = vision;
                }
                WireRecord::DualPose { timestamp, red, black } => {
                    log::debug!("pose record, t = {timestamp:.1}");
                    self.latest.timestamp = timestamp;
                    self.latest.red = red;
                    self.latest.black = black;
                }
                WireRecord::Malformed(reason) => {
                    log::warn!("bad packet, skipping: {reason}");
                    continue;
                }
            }

            self.mailbox.publish(self.latest);
        }

        log::info!("ingestion worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Hands out one scripted packet per read, then sets the stop flag and
    /// reports timeouts, so `run()` terminates deterministically.
    struct ScriptedReader {
        packets: VecDeque<&'static str>,
        stop: StopFlag,
        eof_at_end: bool,
    }

    impl ScriptedReader {
        fn new(packets: &[&'static str], stop: StopFlag) -> Self {
            ScriptedReader { packets: packets.iter().copied().collect(), stop, eof_at_end: false }
        }
    }

    impl Read for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.packets.pop_front() {
                Some(packet) => {
                    buf[..packet.len()].copy_from_slice(packet.as_bytes());
                    Ok(packet.len())
                }
                None if self.eof_at_end => Ok(0),
                None => {
                    self.stop.set();
                    Err(std::io::Error::new(ErrorKind::TimedOut, "no more data"))
                }
            }
        }
    }

    const POSE_PACKET: &str = "15.0\n3.0\n1.0\n0.1\n0.01\n0.02\n0.03\n1.0\n1.0\n0.2\n0.0\n0.0\n0.04\n";
    const VISION_PACKET: &str = "SPOTNet\n2.0\n0.5\n-0.1\n0.92\n";

    #[test]
    fn test_publish_carries_union_of_classes() {
        let stop = StopFlag::new();
        let mailbox = Arc::new(Mailbox::new());
        let reader = ScriptedReader::new(&[POSE_PACKET, VISION_PACKET], stop.clone());

        IngestionWorker::new(reader, mailbox.clone(), stop).run();

        let snapshot = mailbox.try_take().expect("snapshot published");
        // The vision-only packet must not blank out the pose fields
        assert_eq!(snapshot.timestamp, 15.0);
        assert_eq!(snapshot.red.x, 3.0);
        assert_eq!(snapshot.black.omega, 0.04);
        assert_eq!(snapshot.vision.relative_x, 2.0);
        assert_eq!(snapshot.vision.confidence, 0.92);
    }

    #[test]
    fn test_pose_only_leaves_vision_zeroed() {
        let stop = StopFlag::new();
        let mailbox = Arc::new(Mailbox::new());
        let reader = ScriptedReader::new(&[POSE_PACKET], stop.clone());

        IngestionWorker::new(reader, mailbox.clone(), stop).run();

        let snapshot = mailbox.try_take().expect("snapshot published");
        assert_eq!(snapshot.red.x, 3.0);
        assert_eq!(snapshot.vision.confidence, 0.0);
    }

    #[test]
    fn test_malformed_packet_skipped_not_fatal() {
        let stop = StopFlag::new();
        let mailbox = Arc::new(Mailbox::new());
        let reader =
            ScriptedReader::new(&["SPOTNet\ngarbage\n", POSE_PACKET], stop.clone());

        IngestionWorker::new(reader, mailbox.clone(), stop).run();

        // The bad packet published nothing; the good one still got through
        let snapshot = mailbox.try_take().expect("snapshot published");
        assert_eq!(snapshot.timestamp, 15.0);
        assert_eq!(snapshot.vision.confidence, 0.0);
    }

    #[test]
    fn test_eof_terminates_worker() {
        let stop = StopFlag::new();
        let mailbox = Arc::new(Mailbox::new());
        let mut reader = ScriptedReader::new(&[VISION_PACKET], stop.clone());
        reader.eof_at_end = true;

        // Must return (EOF breaks the loop) even though stop was never set
        IngestionWorker::new(reader, mailbox.clone(), stop.clone()).run();
        assert!(!stop.is_set());
        assert!(mailbox.try_take().is_some());
    }
}
