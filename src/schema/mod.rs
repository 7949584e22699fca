//! Schema module - Configuration, genome and seed types for reactor planning.

mod config;
mod evolution;
mod seed;

pub use config::*;
pub use evolution::*;
pub use seed::*;
