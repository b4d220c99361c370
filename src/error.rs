//! Error type
use crate::logging::LogError;
use crate::torch::curiosity::{BuildIcmError, ErrorKind, IcmError};
use crate::torch::optimizers::OptimizerStepError;
use tch::TchError;
use thiserror::Error;

/// Error from the curiosity crate.
#[derive(Error, Debug)]
pub enum CuriosityError {
    #[error("error building curiosity module")]
    BuildIcm(#[from] BuildIcmError),
    #[error(transparent)]
    Icm(#[from] IcmError),
    #[error("error in optimizer step")]
    Optimizer(#[from] OptimizerStepError),
    #[error("error logging statistics")]
    Log(#[from] LogError),
    #[error(transparent)]
    Torch(#[from] TchError),
}

impl CuriosityError {
    /// Classification of the error; `None` for errors outside of the curiosity computation.
    pub const fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::BuildIcm(err) => Some(err.kind()),
            Self::Icm(err) => Some(err.kind()),
            Self::Optimizer(OptimizerStepError::NaNLoss) => Some(ErrorKind::NumericInstability),
            Self::Optimizer(OptimizerStepError::Torch(_)) | Self::Torch(_) => {
                Some(ErrorKind::Backend)
            }
            Self::Log(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_loss_is_numeric_instability() {
        let err = CuriosityError::from(OptimizerStepError::NaNLoss);
        assert_eq!(err.kind(), Some(ErrorKind::NumericInstability));
    }

    #[test]
    fn wraps_build_error() {
        let err: CuriosityError = BuildIcmError::ZeroActions.into();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidConfig));
        assert!(matches!(
            err,
            CuriosityError::BuildIcm(BuildIcmError::ZeroActions)
        ));
    }
}
