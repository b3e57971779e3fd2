//! Core types and constants for the scene location engine

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;
