//! Upstream connection lifecycle
//!
//! Owns the TCP connection to the transponder: establishes it, watches
//! it, and replaces it when it dies. One sequential loop owns the
//! stream, the reassembly buffer and the notification dedup flags, so no
//! locking is needed anywhere in the data path.
//!
//! # Connected-loop ordering
//!
//! Each iteration runs the liveness probe first (at most once per
//! interval) and short-circuits on a dead verdict — it never also
//! attempts the read in the same iteration. The bounded wait for data is
//! deliberately shorter than the probe interval so a silent peer still
//! gets health-checked promptly.
//!
//! # Failure handling
//!
//! Every transport failure — connect refused, probe verdict, wait error,
//! read error, orderly close — funnels into the same path: drop the
//! stream, notify at most once per loss episode, retry forever on a
//! fixed delay. Nothing here is fatal; the process leaves this loop only
//! when the running flag clears.

use crate::events::{EventSink, Severity};
use crate::filter;
use crate::forwarder::UdpForwarder;
use crate::framer::SentenceFramer;
use crate::liveness::{self, KeepaliveParams, Readiness, Verdict};
use std::io::Read;
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Read chunk size for the upstream stream
const READ_CHUNK: usize = 1024;

/// Granularity of interruptible sleeps, for shutdown responsiveness
const SLEEP_SLICE: Duration = Duration::from_millis(250);

/// Timing knobs for the supervisor loop.
///
/// Defaults are the production values; tests shrink them to keep
/// reconnect scenarios fast.
#[derive(Debug, Clone)]
pub struct Tunables {
    /// Delay between reconnect attempts (fixed, no growth, no cap)
    pub reconnect_delay: Duration,
    /// Minimum interval between liveness probes while connected
    pub liveness_interval: Duration,
    /// Bounded wait for readability per loop iteration; must stay below
    /// `liveness_interval`
    pub data_wait: Duration,
    /// Read/write timeout on the stream so no blocking call can hang
    /// past this bound
    pub io_timeout: Duration,
    /// Kernel keepalive schedule
    pub keepalive: KeepaliveParams,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(10),
            liveness_interval: Duration::from_secs(5),
            data_wait: Duration::from_secs(2),
            io_timeout: Duration::from_secs(10),
            keepalive: KeepaliveParams::default(),
        }
    }
}

/// Connection lifecycle supervisor
pub struct Supervisor<S: EventSink> {
    upstream: String,
    forwarder: UdpForwarder,
    sink: S,
    tunables: Tunables,
    running: Arc<AtomicBool>,
    framer: SentenceFramer,
    /// A connection has existed at some point in this process lifetime
    ever_connected: bool,
    /// The current loss episode has already been notified
    loss_reported: bool,
}

impl<S: EventSink> Supervisor<S> {
    pub fn new(
        upstream: String,
        forwarder: UdpForwarder,
        sink: S,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            upstream,
            forwarder,
            sink,
            tunables: Tunables::default(),
            running,
            framer: SentenceFramer::new(),
            ever_connected: false,
            loss_reported: false,
        }
    }

    pub fn with_tunables(mut self, tunables: Tunables) -> Self {
        self.tunables = tunables;
        self
    }

    /// Supervisory loop: connect, serve, reconnect — until shutdown.
    pub fn run(&mut self) {
        while self.running.load(Ordering::Relaxed) {
            match self.connect() {
                Ok(stream) => {
                    // Stale partial data from a dead connection must
                    // never be stitched to data from a new one
                    self.framer.reset();
                    self.announce_connected();
                    self.serve(stream);
                    // stream dropped here: the handle is closed on every
                    // exit path before a new one can exist
                }
                Err(e) => {
                    log::warn!("Connect to {} failed: {}", self.upstream, e);
                    self.announce_connect_failed();
                    self.pause(self.tunables.reconnect_delay);
                }
            }
        }
        log::info!("Supervisor stopped");
    }

    /// Open and prepare a fresh upstream connection.
    fn connect(&self) -> std::io::Result<TcpStream> {
        log::info!("Connecting to {}", self.upstream);
        let stream = TcpStream::connect(self.upstream.as_str())?;
        liveness::configure_keepalive(&stream, &self.tunables.keepalive)?;
        stream.set_read_timeout(Some(self.tunables.io_timeout))?;
        stream.set_write_timeout(Some(self.tunables.io_timeout))?;
        log::info!(
            "Connected to {} (local {})",
            self.upstream,
            stream.local_addr()?
        );
        Ok(stream)
    }

    /// Connected loop. Returns when the connection dies or shutdown is
    /// requested; the caller drops the stream either way.
    fn serve(&mut self, mut stream: TcpStream) {
        let mut last_probe = Instant::now();
        let mut chunk = [0u8; READ_CHUNK];

        while self.running.load(Ordering::Relaxed) {
            // Health first; a dead verdict ends the iteration before any
            // read is attempted
            if last_probe.elapsed() >= self.tunables.liveness_interval {
                last_probe = Instant::now();
                if let Verdict::Dead(reason) = liveness::probe(&stream) {
                    self.report_lost(reason);
                    return;
                }
            }

            match liveness::wait_readable(&stream, self.tunables.data_wait) {
                Ok(Readiness::TimedOut) => continue,
                Ok(Readiness::Ready) => {}
                Err(e) => {
                    self.report_lost(&format!("wait failed: {}", e));
                    return;
                }
            }

            match stream.read(&mut chunk) {
                Ok(0) => {
                    self.report_lost("closed by peer");
                    return;
                }
                Ok(n) => self.pump(&chunk[..n]),
                Err(e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut
                        || e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => {
                    self.report_lost(&format!("read failed: {}", e));
                    return;
                }
            }
        }
    }

    /// Push one read chunk through reassembly, filtering and forwarding.
    fn pump(&mut self, bytes: &[u8]) {
        for sentence in self.framer.feed(bytes) {
            if filter::is_vessel_report(&sentence) {
                log::debug!("Forwarding: {}", String::from_utf8_lossy(&sentence));
                self.forwarder.send(&sentence);
            } else if !sentence.is_empty() {
                log::trace!("Dropped: {}", String::from_utf8_lossy(&sentence));
            }
        }
    }

    fn announce_connected(&mut self) {
        if self.ever_connected || self.loss_reported {
            self.sink.notify(
                "Connection restored",
                &format!("Receiving from {} again", self.upstream),
                Severity::Normal,
            );
        } else {
            self.sink.notify(
                "Forwarding started",
                &format!("Receiving from {}", self.upstream),
                Severity::Normal,
            );
        }
        self.ever_connected = true;
        self.loss_reported = false;
    }

    fn announce_connect_failed(&mut self) {
        // One notification per loss episode; stays quiet until the next
        // successful connect re-arms it
        if self.ever_connected && !self.loss_reported {
            self.sink.notify(
                "Reconnect failed",
                &format!("Cannot reach {}", self.upstream),
                Severity::Critical,
            );
            self.loss_reported = true;
        }
    }

    fn report_lost(&mut self, reason: &str) {
        log::warn!("Connection to {} lost: {}", self.upstream, reason);
        if !self.loss_reported {
            self.sink.notify(
                "Connection lost",
                &format!("{}: {}", self.upstream, reason),
                Severity::Critical,
            );
            self.loss_reported = true;
        }
    }

    /// Interruptible sleep between reconnect attempts.
    fn pause(&self, total: Duration) {
        let deadline = Instant::now() + total;
        while self.running.load(Ordering::Relaxed) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}
