//! Global configuration constants for the carom engine.

/// Default frame duration in milliseconds (one scheduling quantum per ball).
pub const DEFAULT_FRAME_TIME_MS: u64 = 20;

/// Default side length of the square table.
pub const DEFAULT_TABLE_SIZE: f64 = 100.0;

/// Default ball diameter.
pub const DEFAULT_BALL_DIAMETER: f64 = 10.0;

/// Default ball speed, in table units per frame.
pub const DEFAULT_BALL_SPEED: f64 = 2.0;

/// Polling interval of the telemetry writer thread, independent of the
/// simulation cadence.
pub const TELEMETRY_POLL_INTERVAL_MS: u64 = 70;
