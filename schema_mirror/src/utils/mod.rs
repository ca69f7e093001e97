//! Utilities for schema_mirror

pub mod logging;

pub use logging::init_logging;
