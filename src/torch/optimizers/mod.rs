//! Optimizers
//!
//! The curiosity module never updates its own parameters.
//! These optimizers are built by the training loop from the module's trainable variables.
mod coptimizer;

pub use coptimizer::{AdamConfig, SgdConfig};

use tch::{TchError, Tensor};
use thiserror::Error;

/// Base optimizer interface
pub trait BaseOptimizer {
    /// Zero out the gradients of all optimized tensors
    fn zero_grad(&mut self) -> Result<(), OptimizerStepError>;
}

/// Optimizer that minimizes a loss tensor using a single gradient evaluation per step.
pub trait OnceOptimizer: BaseOptimizer {
    /// Perform a loss minimization step (parameter update).
    ///
    /// Uses the existing gradients stored with the parameter tensors.
    fn step_once(&mut self) -> Result<(), OptimizerStepError>;

    /// Zero the gradients, back-propagate `loss`, and perform an optimization step.
    ///
    /// A non-finite loss is rejected before any gradient is computed
    /// so the parameters are left unchanged.
    fn backward_step_once(&mut self, loss: &Tensor) -> Result<(), OptimizerStepError> {
        if !bool::from(loss.isfinite().all()) {
            return Err(OptimizerStepError::NaNLoss);
        }
        self.zero_grad()?;
        loss.f_backward()?;
        self.step_once()
    }
}

/// Build an optimizer
pub trait BuildOptimizer {
    type Optimizer: OnceOptimizer;

    /// Build an optimizer for the given trainable variables.
    fn build_optimizer<'a, I>(&self, variables: I) -> Result<Self::Optimizer, TchError>
    where
        I: IntoIterator<Item = &'a Tensor>;
}

/// Error performing an optimization step.
#[derive(Debug, Error)]
pub enum OptimizerStepError {
    #[error("loss is NaN or infinite")]
    NaNLoss,
    #[error(transparent)]
    Torch(#[from] TchError),
}

#[cfg(test)]
mod testing {
    use super::*;
    use tch::{Device, Kind};

    pub fn check_optimizes_quadratic<OC: BuildOptimizer>(
        optimizer_config: &OC,
        num_steps: u64,
        tolerance: f64,
    ) {
        // Minimize f(x) = 1/2*x'Mx + b'x
        // with M = [1  -1]  b = [ 2]
        //          [-1  2]      [-3]
        //
        // which is minimized at x = [-1  1]'
        let m = Tensor::of_slice(&[1.0_f32, -1.0, -1.0, 2.0]).reshape(&[2, 2]);
        let b = Tensor::of_slice(&[2.0_f32, -3.0]);

        let x = Tensor::zeros(&[2], (Kind::Float, Device::Cpu)).set_requires_grad(true);
        let mut optimizer = optimizer_config.build_optimizer([&x]).unwrap();

        for _ in 0..num_steps {
            let loss = m.mv(&x).dot(&x) / 2 + b.dot(&x);
            optimizer.backward_step_once(&loss).unwrap();
        }

        let expected = Tensor::of_slice(&[-1.0_f32, 1.0]);
        let error = (&x - &expected).norm().double_value(&[]);
        assert!(error < tolerance, "expected: {:?}, actual: {:?}", expected, x);
    }
}
