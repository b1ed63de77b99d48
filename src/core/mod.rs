pub mod ball;
pub mod types;
