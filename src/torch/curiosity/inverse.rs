//! Inverse dynamics head
use crate::torch::modules::{BuildModule, FeedForwardModule, MlpConfig, Mlp, Module};
use serde::{Deserialize, Serialize};
use tch::{Device, Tensor};

/// Predicts the action that caused a transition from the features of its two states.
///
/// Maps the concatenated `[B, 2F]` feature pair to `[B, n_actions]` unnormalized logits.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct InverseDynamics {
    mlp: Mlp,
}

impl InverseDynamics {
    pub fn new(feature_dim: usize, n_actions: usize, device: Device, config: &MlpConfig) -> Self {
        Self {
            mlp: config.build_module(2 * feature_dim, n_actions, device),
        }
    }

    pub fn feature_dim(&self) -> usize {
        self.mlp.in_dim() / 2
    }

    pub fn n_actions(&self) -> usize {
        self.mlp.out_dim()
    }

    /// Action logits `[B, n_actions]` for a transition `feature -> next_feature`.
    pub fn predict_action(&self, feature: &Tensor, next_feature: &Tensor) -> Tensor {
        self.mlp.forward(&Tensor::cat(&[feature, next_feature], -1))
    }
}

impl Module for InverseDynamics {
    fn shallow_clone(&self) -> Self {
        Self {
            mlp: self.mlp.shallow_clone(),
        }
    }

    fn clone_to_device(&self, device: Device) -> Self {
        Self {
            mlp: self.mlp.clone_to_device(device),
        }
    }

    fn variables(&self) -> Box<dyn Iterator<Item = &Tensor> + '_> {
        self.mlp.variables()
    }

    fn named_variables(&self) -> Vec<(String, &Tensor)> {
        self.mlp.named_variables()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::torch::modules::{Activation, LinearConfig};
    use rstest::rstest;
    use tch::Kind;

    fn head_config() -> MlpConfig {
        MlpConfig {
            hidden_sizes: vec![256],
            activation: Activation::Identity,
            ..MlpConfig::default()
        }
    }

    #[rstest]
    #[case(1, 1)]
    #[case(8, 4)]
    #[case(64, 18)]
    fn logits_shape(#[case] batch_size: i64, #[case] n_actions: usize) {
        let head = InverseDynamics::new(288, n_actions, Device::Cpu, &head_config());
        let feature = Tensor::rand(&[batch_size, 288], (Kind::Float, Device::Cpu));
        let next_feature = Tensor::rand(&[batch_size, 288], (Kind::Float, Device::Cpu));
        let logits = head.predict_action(&feature, &next_feature);
        assert_eq!(logits.size(), [batch_size, n_actions as i64]);
    }

    #[test]
    fn dims() {
        let head = InverseDynamics::new(32, 6, Device::Cpu, &head_config());
        assert_eq!(head.feature_dim(), 32);
        assert_eq!(head.n_actions(), 6);
    }

    #[test]
    fn zero_weights_give_uniform_logits() {
        let config = MlpConfig {
            linear_config: LinearConfig::zeros(),
            ..head_config()
        };
        let head = InverseDynamics::new(8, 3, Device::Cpu, &config);
        let feature = Tensor::rand(&[2, 8], (Kind::Float, Device::Cpu));
        let logits = head.predict_action(&feature, &feature);
        assert_eq!(logits, Tensor::zeros(&[2, 3], (Kind::Float, Device::Cpu)));
    }

    #[test]
    fn order_of_features_matters() {
        let head = InverseDynamics::new(4, 2, Device::Cpu, &head_config());
        let a = Tensor::rand(&[1, 4], (Kind::Float, Device::Cpu));
        let b = Tensor::rand(&[1, 4], (Kind::Float, Device::Cpu)) + 1.0;
        assert_ne!(head.predict_action(&a, &b), head.predict_action(&b, &a));
    }
}
