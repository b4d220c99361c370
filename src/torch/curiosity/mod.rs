//! Intrinsic curiosity module
//!
//! Computes an exploration bonus from how badly a learned forward model predicts the features of
//! the next observation. Observation features come from a convolutional encoder shared with an
//! inverse dynamics model, which shapes the feature space towards action-relevant information.
//!
//! ```text
//! obs      --[encoder]--------------> feature ---+--[inverse]--> action logits
//! next_obs --[encoder, detached]----> target  ---+
//! (feature, action) --[forward]-----> predicted target
//! ```
mod encoder;
mod error;
mod forward;
mod inverse;
mod update;

pub use encoder::{EncodeMode, EncoderConfig, FeatureEncoder};
pub use error::{BuildIcmError, ErrorKind, IcmError};
pub use forward::ForwardDynamics;
pub use inverse::InverseDynamics;
pub use update::{CuriosityStep, IcmUpdater};

use crate::torch::modules::{prefixed, Activation, MlpConfig, Module};
use crate::utils::torch::DeviceDef;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tch::{Device, Kind, Reduction, Tensor};

/// Configuration of an [`Icm`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IcmConfig {
    /// Shape `[channels, height, width]` of a single stacked observation.
    pub input_dims: [usize; 3],
    /// Number of discrete actions.
    pub n_actions: usize,
    /// Scale of the intrinsic reward.
    pub alpha: f64,
    /// Weight of the forward loss; the inverse loss is weighted by `1 - beta`.
    pub beta: f64,
    /// Encoder output width. Must match the width derived from `encoder` and `input_dims`.
    pub feature_dims: usize,
    pub encoder: EncoderConfig,
    /// Inverse dynamics head layers
    pub inverse: MlpConfig,
    /// Forward dynamics head layers
    pub forward: MlpConfig,
    /// Device on which the parameters are created.
    #[serde(with = "DeviceDef")]
    pub device: Device,
}

impl Default for IcmConfig {
    fn default() -> Self {
        let head = MlpConfig {
            hidden_sizes: vec![256],
            activation: Activation::Identity,
            output_activation: Activation::Identity,
            ..MlpConfig::default()
        };
        Self {
            input_dims: [4, 42, 42],
            n_actions: 4,
            alpha: 0.1,
            beta: 0.2,
            feature_dims: 288,
            encoder: EncoderConfig::default(),
            inverse: head.clone(),
            forward: head,
            device: Device::Cpu,
        }
    }
}

impl IcmConfig {
    /// Build a module with freshly initialized parameters.
    pub fn build(&self) -> Result<Icm, BuildIcmError> {
        self.validate()?;

        let mismatch = |derived| BuildIcmError::FeatureDimsMismatch {
            configured: self.feature_dims,
            derived,
            input_dims: self.input_dims,
        };
        let derived = self
            .encoder
            .feature_dim(self.input_dims)
            .ok_or(BuildIcmError::InputTooSmall {
                input_dims: self.input_dims,
            })?;
        if derived != self.feature_dims {
            return Err(mismatch(derived));
        }

        let encoder = self
            .encoder
            .build_encoder(self.input_dims, self.device)
            .ok_or(BuildIcmError::InputTooSmall {
                input_dims: self.input_dims,
            })?;

        // Confirm the derived width against the actual encoder output.
        let [c, h, w] = self.input_dims;
        let blank = Tensor::zeros(
            &[1, c as i64, h as i64, w as i64],
            (encoder.kind(), self.device),
        );
        let actual = encoder.encode(&blank, EncodeMode::Detached).size()[1] as usize;
        if actual != self.feature_dims {
            return Err(mismatch(actual));
        }

        info!(
            "built curiosity module: input {:?}, {} features, {} actions",
            self.input_dims, self.feature_dims, self.n_actions
        );
        Ok(Icm {
            inverse: InverseDynamics::new(
                self.feature_dims,
                self.n_actions,
                self.device,
                &self.inverse,
            ),
            forward: ForwardDynamics::new(self.feature_dims, self.device, &self.forward),
            encoder,
            n_actions: self.n_actions,
            alpha: self.alpha,
            beta: self.beta,
        })
    }

    fn validate(&self) -> Result<(), BuildIcmError> {
        if self.input_dims.contains(&0) {
            return Err(BuildIcmError::EmptyInputDims {
                input_dims: self.input_dims,
            });
        }
        if self.n_actions == 0 {
            return Err(BuildIcmError::ZeroActions);
        }
        if !(0.0..=1.0).contains(&self.beta) {
            return Err(BuildIcmError::InvalidBeta(self.beta));
        }
        if !(self.alpha.is_finite() && self.alpha >= 0.0) {
            return Err(BuildIcmError::InvalidAlpha(self.alpha));
        }
        if self.encoder.num_layers == 0 || self.encoder.channels == 0 {
            return Err(BuildIcmError::EmptyEncoder);
        }
        Ok(())
    }
}

/// Intermediate values of an [`Icm`] evaluation.
#[derive(Debug)]
pub struct IcmOutput {
    /// Next observation features `[B, F]`. Constant with respect to the parameters.
    pub target_feature: Tensor,
    /// Inverse model action logits `[B, n_actions]`.
    pub action_logits: Tensor,
    /// Forward model prediction of `target_feature`, `[B, F]`.
    pub predicted_next_feature: Tensor,
}

/// Intrinsic reward and training losses for a batch of transitions.
#[derive(Debug)]
pub struct RewardAndLosses {
    /// Per-transition intrinsic reward `[B]`, non-negative and detached from the graph.
    pub intrinsic_reward: Tensor,
    /// `(1 - beta)` times the action cross entropy. Scalar.
    pub inverse_loss: Tensor,
    /// `beta` times the feature prediction mean squared error. Scalar.
    pub forward_loss: Tensor,
}

impl RewardAndLosses {
    /// Sum of the inverse and forward losses.
    pub fn total_loss(&self) -> Tensor {
        &self.inverse_loss + &self.forward_loss
    }
}

/// Intrinsic curiosity module.
///
/// Owns exactly one encoder and the two prediction heads.
/// Evaluation never modifies the parameters; they are updated by an optimizer built from
/// [`Module::trainable_variables`] (see [`IcmUpdater`]).
///
/// Serializing an `Icm` captures the full parameter set as a checkpoint.
/// Deserialized parameters are placed on the CPU.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Icm {
    encoder: FeatureEncoder,
    inverse: InverseDynamics,
    forward: ForwardDynamics,
    n_actions: usize,
    alpha: f64,
    beta: f64,
}

impl Icm {
    pub const fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub const fn inverse_dynamics(&self) -> &InverseDynamics {
        &self.inverse
    }

    pub const fn forward_dynamics(&self) -> &ForwardDynamics {
        &self.forward
    }

    pub const fn n_actions(&self) -> usize {
        self.n_actions
    }

    pub const fn alpha(&self) -> f64 {
        self.alpha
    }

    pub const fn beta(&self) -> f64 {
        self.beta
    }

    pub const fn feature_dim(&self) -> usize {
        self.encoder.feature_dim()
    }

    /// Evaluate the encoder and both heads on a batch of transitions.
    ///
    /// # Args
    /// * `observations`      - Shape `[B, C, H, W]`, same kind as the parameters.
    /// * `next_observations` - Shape `[B, C, H, W]`, same kind as the parameters.
    /// * `actions`           - Integer actions in `[0, n_actions)`, shape `[B]`.
    pub fn evaluate(
        &self,
        observations: &Tensor,
        next_observations: &Tensor,
        actions: &Tensor,
    ) -> Result<IcmOutput, IcmError> {
        self.check_batch(observations, next_observations, actions)?;

        let feature = self.encoder.encode(observations, EncodeMode::Differentiable);
        let target_feature = self.encoder.encode(next_observations, EncodeMode::Detached);
        let action_logits = self.inverse.predict_action(&feature, &target_feature);
        let predicted_next_feature = self.forward.predict_next_feature(&feature, actions);
        Ok(IcmOutput {
            target_feature,
            action_logits,
            predicted_next_feature,
        })
    }

    /// Intrinsic reward and training losses for a batch of transitions.
    ///
    /// Takes the same arguments as [`Icm::evaluate`].
    /// Fails with [`IcmError::NumericInstability`] if any result is NaN or infinite.
    pub fn compute_reward_and_losses(
        &self,
        observations: &Tensor,
        next_observations: &Tensor,
        actions: &Tensor,
    ) -> Result<RewardAndLosses, IcmError> {
        let IcmOutput {
            target_feature,
            action_logits,
            predicted_next_feature,
        } = self.evaluate(observations, next_observations, actions)?;

        let inverse_loss =
            action_logits.cross_entropy_for_logits(&actions.to_kind(Kind::Int64)) * (1.0 - self.beta);
        let forward_loss =
            predicted_next_feature.mse_loss(&target_feature, Reduction::Mean) * self.beta;
        let intrinsic_reward = (predicted_next_feature.detach() - &target_feature)
            .square()
            .mean_dim(&[-1], false, predicted_next_feature.kind())
            * (0.5 * self.alpha);

        let result = RewardAndLosses {
            intrinsic_reward,
            inverse_loss,
            forward_loss,
        };
        self.check_finite(&result)?;
        Ok(result)
    }

    /// Per-transition intrinsic reward `[B]` without building a gradient graph.
    pub fn intrinsic_reward(
        &self,
        observations: &Tensor,
        next_observations: &Tensor,
        actions: &Tensor,
    ) -> Result<Tensor, IcmError> {
        tch::no_grad(|| {
            self.compute_reward_and_losses(observations, next_observations, actions)
                .map(|result| result.intrinsic_reward)
        })
    }

    /// Check that the reward and losses are free of NaN and infinity.
    pub fn check_finite(&self, result: &RewardAndLosses) -> Result<(), IcmError> {
        for (quantity, tensor) in [
            ("inverse_loss", &result.inverse_loss),
            ("forward_loss", &result.forward_loss),
            ("intrinsic_reward", &result.intrinsic_reward),
        ] {
            if !bool::from(tensor.isfinite().all()) {
                warn!("curiosity {} is NaN or infinite", quantity);
                return Err(IcmError::NumericInstability { quantity });
            }
        }
        Ok(())
    }

    /// Check the shapes, kinds, and values of a batch of transitions.
    fn check_batch(
        &self,
        observations: &Tensor,
        next_observations: &Tensor,
        actions: &Tensor,
    ) -> Result<(), IcmError> {
        self.check_observation("observations", observations)?;
        self.check_observation("next_observations", next_observations)?;
        let action_shape = actions.size();
        if action_shape.len() != 1 {
            return Err(IcmError::ShapeMismatch {
                name: "actions",
                expected: vec![-1],
                actual: action_shape,
            });
        }

        let batch_size = observations.size()[0];
        let next_batch_size = next_observations.size()[0];
        if batch_size != next_batch_size || batch_size != action_shape[0] {
            return Err(IcmError::BatchSizeMismatch {
                obs: batch_size,
                next_obs: next_batch_size,
                actions: action_shape[0],
            });
        }
        if batch_size == 0 {
            return Err(IcmError::EmptyBatch);
        }

        match actions.kind() {
            Kind::Uint8 | Kind::Int8 | Kind::Int16 | Kind::Int | Kind::Int64 => {}
            kind => return Err(IcmError::ActionKind(kind)),
        }
        // Compare as Int64; n_actions may not fit in the action kind.
        let actions = actions.to_kind(Kind::Int64);
        let invalid = actions
            .lt(0)
            .logical_or(&actions.ge(self.n_actions as i64));
        if bool::from(invalid.any()) {
            let index = invalid.nonzero().int64_value(&[0, 0]);
            return Err(IcmError::InvalidAction {
                index: index as usize,
                action: actions.int64_value(&[index]),
                n_actions: self.n_actions,
            });
        }
        Ok(())
    }

    fn check_observation(&self, name: &'static str, tensor: &Tensor) -> Result<(), IcmError> {
        let expected_kind = self.encoder.kind();
        if tensor.kind() != expected_kind {
            return Err(IcmError::ObservationKind {
                name,
                expected: expected_kind,
                actual: tensor.kind(),
            });
        }

        let shape = tensor.size();
        let expected: Vec<i64> = [-1]
            .into_iter()
            .chain(self.encoder.input_dims().iter().map(|&d| d as i64))
            .collect();
        let matches = shape.len() == expected.len()
            && shape.iter().zip(&expected).skip(1).all(|(a, b)| a == b);
        if matches {
            Ok(())
        } else {
            Err(IcmError::ShapeMismatch {
                name,
                expected,
                actual: shape,
            })
        }
    }
}

impl Module for Icm {
    fn shallow_clone(&self) -> Self {
        Self {
            encoder: self.encoder.shallow_clone(),
            inverse: self.inverse.shallow_clone(),
            forward: self.forward.shallow_clone(),
            ..*self
        }
    }

    fn clone_to_device(&self, device: Device) -> Self {
        Self {
            encoder: self.encoder.clone_to_device(device),
            inverse: self.inverse.clone_to_device(device),
            forward: self.forward.clone_to_device(device),
            ..*self
        }
    }

    fn variables(&self) -> Box<dyn Iterator<Item = &Tensor> + '_> {
        Box::new(
            self.encoder
                .variables()
                .chain(self.inverse.variables())
                .chain(self.forward.variables()),
        )
    }

    fn named_variables(&self) -> Vec<(String, &Tensor)> {
        prefixed("encoder", self.encoder.named_variables())
            .chain(prefixed("inverse", self.inverse.named_variables()))
            .chain(prefixed("forward", self.forward.named_variables()))
            .collect()
    }
}
