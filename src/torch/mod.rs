//! Torch components
pub mod curiosity;
pub mod initializers;
pub mod modules;
pub mod optimizers;

pub use curiosity::{Icm, IcmConfig, IcmUpdater};
pub use modules::{Activation, Module};
pub use optimizers::{AdamConfig, SgdConfig};
