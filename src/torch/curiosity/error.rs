//! Curiosity module errors
use tch::{Kind, TchError};
use thiserror::Error;

/// Coarse classification of curiosity errors.
///
/// Lets a training loop decide between skipping a step and aborting
/// without matching on every error variant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Tensor shapes, element kinds or batch sizes do not match the module configuration.
    ShapeMismatch,
    /// An action is outside of `[0, n_actions)` or is not an integer.
    InvalidAction,
    /// NaN or infinity in a loss or reward.
    NumericInstability,
    /// The module configuration is invalid.
    InvalidConfig,
    /// Error raised by the tensor backend.
    Backend,
}

impl ErrorKind {
    /// Whether the training loop can skip the current batch and continue.
    pub const fn is_recoverable(self) -> bool {
        matches!(self, Self::NumericInstability)
    }
}

/// Error building an [`Icm`](super::Icm) from its configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildIcmError {
    #[error(
        "configured feature_dims {configured} does not match the encoder output width {derived} \
         for input dims {input_dims:?}"
    )]
    FeatureDimsMismatch {
        configured: usize,
        derived: usize,
        input_dims: [usize; 3],
    },
    #[error("input dims {input_dims:?} must all be non-zero")]
    EmptyInputDims { input_dims: [usize; 3] },
    #[error("input dims {input_dims:?} are too small for the encoder")]
    InputTooSmall { input_dims: [usize; 3] },
    #[error("the encoder must have at least one layer with at least one channel")]
    EmptyEncoder,
    #[error("the action space must have at least one action")]
    ZeroActions,
    #[error("beta must be in [0, 1], got {0}")]
    InvalidBeta(f64),
    #[error("alpha must be finite and non-negative, got {0}")]
    InvalidAlpha(f64),
}

impl BuildIcmError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::FeatureDimsMismatch { .. } => ErrorKind::ShapeMismatch,
            _ => ErrorKind::InvalidConfig,
        }
    }
}

/// Error evaluating an [`Icm`](super::Icm) on a batch of transitions.
#[derive(Debug, Error)]
pub enum IcmError {
    #[error("{name} has shape {actual:?} but expected {expected:?}")]
    ShapeMismatch {
        name: &'static str,
        /// Expected shape; `-1` marks a free (batch) dimension.
        expected: Vec<i64>,
        actual: Vec<i64>,
    },
    #[error("{name} has kind {actual:?} but the encoder parameters have kind {expected:?}")]
    ObservationKind {
        name: &'static str,
        expected: Kind,
        actual: Kind,
    },
    #[error(
        "batch sizes differ: {obs} observations, {next_obs} next observations, {actions} actions"
    )]
    BatchSizeMismatch {
        obs: i64,
        next_obs: i64,
        actions: i64,
    },
    #[error("empty batch")]
    EmptyBatch,
    #[error("action {action} at batch index {index} is not in [0, {n_actions})")]
    InvalidAction {
        index: usize,
        action: i64,
        n_actions: usize,
    },
    #[error("actions must have an integer kind, got {0:?}")]
    ActionKind(Kind),
    #[error("{quantity} is NaN or infinite")]
    NumericInstability { quantity: &'static str },
    #[error(transparent)]
    Torch(#[from] TchError),
}

impl IcmError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ShapeMismatch { .. }
            | Self::ObservationKind { .. }
            | Self::BatchSizeMismatch { .. }
            | Self::EmptyBatch => ErrorKind::ShapeMismatch,
            Self::InvalidAction { .. } | Self::ActionKind(_) => ErrorKind::InvalidAction,
            Self::NumericInstability { .. } => ErrorKind::NumericInstability,
            Self::Torch(_) => ErrorKind::Backend,
        }
    }
}
