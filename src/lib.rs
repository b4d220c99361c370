//! Intrinsic curiosity for reinforcement learning from visual observations.
//!
//! An [`Icm`] encodes observations with a small convolutional network, predicts the action of
//! each transition from the features of its two states (inverse dynamics), and predicts the
//! features of the next state from the current features and action (forward dynamics).
//! The forward prediction error is an intrinsic reward that favours poorly-predicted transitions.
//!
//! ```no_run
//! use curiosity::IcmConfig;
//! use curiosity::torch::{AdamConfig, IcmUpdater};
//! use tch::{Device, Kind, Tensor};
//!
//! let icm = IcmConfig::default().build()?;
//! let mut updater = IcmUpdater::new(&icm, &AdamConfig::default())?;
//!
//! let obs = Tensor::rand(&[8, 4, 42, 42], (Kind::Float, Device::Cpu));
//! let next_obs = Tensor::rand(&[8, 4, 42, 42], (Kind::Float, Device::Cpu));
//! let actions = Tensor::randint(4, &[8], (Kind::Int64, Device::Cpu));
//!
//! let bonus = icm.intrinsic_reward(&obs, &next_obs, &actions)?;
//! let step = updater.update(&icm, &obs, &next_obs, &actions, &mut ())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
#![warn(clippy::cast_lossless)]
#![warn(clippy::doc_markdown)]
#![warn(clippy::explicit_iter_loop)]
#![warn(clippy::missing_const_for_fn)] // has some false positives
#![warn(clippy::needless_borrow)]
#![warn(clippy::needless_pass_by_value)]
#![warn(clippy::redundant_closure_for_method_calls)]
#![warn(clippy::use_self)] // also triggered by macro expansions
mod error;
pub mod logging;
pub mod torch;
pub mod utils;

pub use error::CuriosityError;
pub use logging::StatsLogger;
pub use torch::curiosity::{
    BuildIcmError, CuriosityStep, ErrorKind, Icm, IcmConfig, IcmError, IcmOutput, RewardAndLosses,
};
