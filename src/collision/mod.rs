//! Discrete-event collision prediction.

pub mod prediction;

pub use prediction::{predict_next, time_of_impact};
