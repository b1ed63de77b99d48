pub mod allocator;
pub mod logging;
