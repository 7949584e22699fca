//! Compute module - Reactor simulation and layout search.

mod blueprint;
mod catalog;
mod component;
mod reactor;
mod simulator;

pub mod evolution;

pub use blueprint::*;
pub use catalog::*;
pub use component::*;
pub use reactor::*;
pub use simulator::*;
