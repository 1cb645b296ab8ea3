// transport.rs — client side of the repeater socket.
//
// The repeater may come up after us, so connection failures are retried
// indefinitely with a delay; the loop still honors the stop flag so a
// shutdown during startup doesn't hang. The connected stream gets a bounded
// read timeout, which is what lets the ingestion worker notice cancellation.

use std::io;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::thread;
use std::time::Duration;

use crate::lifecycle::StopFlag;

/// Connect to the repeater, retrying until it appears or `stop` is set
/// (returns `Ok(None)` when cancelled).
pub fn connect_with_retry(
    path: &Path,
    retry_delay: Duration,
    read_timeout: Duration,
    stop: &StopFlag,
) -> io::Result<Option<UnixStream>> {
    loop {
        if stop.is_set() {
            return Ok(None);
        }
        match UnixStream::connect(path) {
            Ok(stream) => {
                stream.set_read_timeout(Some(read_timeout))?;
                log::info!("connected to repeater at {}", path.display());
                return Ok(Some(stream));
            }
            Err(e) => {
                log::warn!(
                    "connection to {} failed ({e}), retrying in {:.1} s",
                    path.display(),
                    retry_delay.as_secs_f64()
                );
                thread::sleep(retry_delay);
            }
        }
    }
}
