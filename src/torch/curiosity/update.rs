//! Curiosity module training step
use super::{Icm, IcmError, RewardAndLosses};
use crate::logging::{Id, StatsLogger};
use crate::torch::modules::Module;
use crate::torch::optimizers::{BuildOptimizer, OnceOptimizer};
use crate::CuriosityError;
use log::warn;
use tch::{Kind, TchError, Tensor};

/// Summary of one [`IcmUpdater::update`] step.
#[derive(Debug)]
pub struct CuriosityStep {
    /// Per-transition intrinsic reward `[B]` computed before the parameter update.
    pub intrinsic_reward: Tensor,
    pub inverse_loss: f64,
    pub forward_loss: f64,
}

/// Trains an [`Icm`] with a single optimizer over all of its parameters.
#[derive(Debug)]
pub struct IcmUpdater<O> {
    optimizer: O,
    skipped_steps: u64,
}

impl<O: OnceOptimizer> IcmUpdater<O> {
    /// Create an updater optimizing the trainable variables of `icm`.
    pub fn new<OC>(icm: &Icm, optimizer_config: &OC) -> Result<Self, TchError>
    where
        OC: BuildOptimizer<Optimizer = O>,
    {
        Ok(Self {
            optimizer: optimizer_config.build_optimizer(icm.trainable_variables())?,
            skipped_steps: 0,
        })
    }

    /// Number of steps skipped because of a non-finite loss.
    pub const fn skipped_steps(&self) -> u64 {
        self.skipped_steps
    }

    /// Minimize `inverse_loss + forward_loss` on a batch of transitions.
    ///
    /// Statistics are logged to `logger` under the `icm` namespace.
    /// If the losses or reward are not finite the optimizer step is skipped and the
    /// [`IcmError::NumericInstability`] error is returned.
    ///
    /// `icm` must be the module this updater was created from, or a
    /// [`shallow_clone`](Module::shallow_clone) of it. The optimizer only steps those
    /// parameters; gradients computed for any other module are never applied.
    pub fn update<L: StatsLogger + ?Sized>(
        &mut self,
        icm: &Icm,
        observations: &Tensor,
        next_observations: &Tensor,
        actions: &Tensor,
        logger: &mut L,
    ) -> Result<CuriosityStep, CuriosityError> {
        logger.group_start();
        let result = self.try_update(icm, observations, next_observations, actions, logger);
        if let Err(CuriosityError::Icm(err @ IcmError::NumericInstability { .. })) = &result {
            self.skipped_steps += 1;
            warn!("skipped curiosity update: {}", err);
            if let Err(log_err) = logger.log_counter(Id::from("skipped_steps").with_prefix("icm"), 1)
            {
                warn!("{}", log_err);
            }
        }
        logger.group_end();
        result
    }

    fn try_update<L: StatsLogger + ?Sized>(
        &mut self,
        icm: &Icm,
        observations: &Tensor,
        next_observations: &Tensor,
        actions: &Tensor,
        logger: &mut L,
    ) -> Result<CuriosityStep, CuriosityError> {
        let losses = icm.compute_reward_and_losses(observations, next_observations, actions)?;
        self.optimizer.backward_step_once(&losses.total_loss())?;

        let RewardAndLosses {
            intrinsic_reward,
            inverse_loss,
            forward_loss,
        } = losses;
        let step = CuriosityStep {
            inverse_loss: inverse_loss.double_value(&[]),
            forward_loss: forward_loss.double_value(&[]),
            intrinsic_reward,
        };
        log_step(&step, logger);
        Ok(step)
    }
}

fn log_step<L: StatsLogger + ?Sized>(step: &CuriosityStep, logger: &mut L) {
    let values = [
        ("inverse_loss", step.inverse_loss),
        ("forward_loss", step.forward_loss),
        (
            "intrinsic_reward_mean",
            step.intrinsic_reward.mean(Kind::Float).double_value(&[]),
        ),
        (
            "intrinsic_reward_max",
            step.intrinsic_reward.max().double_value(&[]),
        ),
    ];
    for (name, value) in values {
        if let Err(err) = logger.log_scalar(Id::from(name).with_prefix("icm"), value) {
            warn!("{}", err);
        }
    }
}
