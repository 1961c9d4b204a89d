//! Configuration for the compliance check engine
//!
//! Security limits are compile-time constants; operator preferences are read
//! from `CCE_*` environment variables and clamped to those limits.

pub mod constants;
pub mod runtime;

pub use constants::compile_time;
pub use runtime::{LoggingPreferences, TransportPreferences};
