//! Utilities
pub mod fmt;
pub mod stats;
pub mod torch;
