use thiserror::Error;

/// Errors surfaced at the engine boundary.
///
/// Numeric edge cases inside the predictor (zero-length normals, zero
/// relative velocity) are handled by documented policy and never reach this
/// type.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine was disposed; no further call will succeed.
    #[error("engine has been disposed")]
    Disposed,

    /// `start` was called while the simulation was already running.
    #[error("simulation is already started")]
    AlreadyStarted,

    /// `start` was called with an unusable ball count.
    #[error("invalid ball count: {0}")]
    InvalidBallCount(usize),

    /// A construction parameter failed validation.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// The telemetry sink could not be created.
    #[error("telemetry sink error")]
    Telemetry(#[from] std::io::Error),
}
