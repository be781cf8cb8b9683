//! Core types and constants for the plant-care command protocol

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;
