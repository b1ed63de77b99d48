use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    sync::mpsc::{self, Receiver, Sender, TryRecvError},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use glam::DVec2;
use log::{log_enabled, warn, Level};

use crate::{config::TELEMETRY_POLL_INTERVAL_MS, utils::allocator::BallId};

/// Simple scoped timer for profiling critical sections.
pub struct ScopedTimer<'a> {
    label: &'a str,
    start: Instant,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(label: &'a str) -> Self {
        if log_enabled!(Level::Trace) {
            log::trace!("⏱️ start {label}");
        }
        Self {
            label,
            start: Instant::now(),
        }
    }
}

impl<'a> Drop for ScopedTimer<'a> {
    fn drop(&mut self) {
        if log_enabled!(Level::Trace) {
            let elapsed = self.start.elapsed();
            log::trace!("⏱️ end {} ({} µs)", self.label, elapsed.as_micros());
        }
    }
}

/// Registers a warning when a stepping cycle held the registry lock longer
/// than one frame.
pub fn warn_if_cycle_budget_exceeded(held: Duration, frame_time_ms: u64) {
    let held_ms = held.as_secs_f64() * 1000.0;
    if held_ms > frame_time_ms as f64 {
        warn!(
            "Stepping cycle exceeded frame budget: {:.2} ms > {} ms",
            held_ms, frame_time_ms
        );
    }
}

/// One telemetry record, captured per ball per stepping cycle.
#[derive(Debug, Clone)]
pub struct TelemetrySample {
    pub ball_id: BallId,
    pub position: DVec2,
    pub velocity: DVec2,
    pub timestamp: DateTime<Utc>,
}

impl TelemetrySample {
    /// `ballId,posX,posY,velX,velY,isoTimestamp`
    pub fn csv_line(&self) -> String {
        format!(
            "{},{},{},{},{},{}",
            self.ball_id.index(),
            self.position.x,
            self.position.y,
            self.velocity.x,
            self.velocity.y,
            self.timestamp.to_rfc3339(),
        )
    }
}

/// Append-only CSV sink fed by the stepping loops.
///
/// Samples are queued through a channel and drained by a dedicated writer
/// thread at a fixed polling interval, independent of the simulation cadence.
/// Telemetry is diagnostics only: write failures are logged and dropped,
/// never surfaced to the simulation.
pub struct TelemetryLogger {
    sender: Sender<TelemetrySample>,
    handle: JoinHandle<()>,
}

impl TelemetryLogger {
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::create(path)?;
        let (sender, receiver) = mpsc::channel();
        let handle = thread::spawn(move || write_worker(file, receiver));
        Ok(Self { sender, handle })
    }

    /// Producer handle for a stepping loop.
    pub fn sender(&self) -> Sender<TelemetrySample> {
        self.sender.clone()
    }

    /// Drains outstanding samples and joins the writer thread. All producer
    /// handles must be dropped first, otherwise this blocks until they are.
    pub fn shutdown(self) {
        let TelemetryLogger { sender, handle } = self;
        drop(sender);
        if handle.join().is_err() {
            warn!("telemetry writer thread panicked");
        }
    }
}

fn write_worker(file: File, receiver: Receiver<TelemetrySample>) {
    let mut writer = BufWriter::new(file);
    loop {
        let mut disconnected = false;
        loop {
            match receiver.try_recv() {
                Ok(sample) => {
                    if writeln!(writer, "{}", sample.csv_line()).is_err() {
                        warn!("telemetry write failed; sample dropped");
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }
        if writer.flush().is_err() {
            warn!("telemetry flush failed");
        }
        if disconnected {
            return;
        }
        thread::sleep(Duration::from_millis(TELEMETRY_POLL_INTERVAL_MS));
    }
}
