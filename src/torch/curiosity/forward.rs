//! Forward dynamics head
use crate::torch::modules::{BuildModule, FeedForwardModule, MlpConfig, Mlp, Module};
use serde::{Deserialize, Serialize};
use tch::{Device, Tensor};

/// Predicts the feature of the next state from the current feature and the action taken.
///
/// The action enters as a single raw scalar appended to the feature vector, not as a one-hot
/// vector. For large discrete action spaces this imposes an ordinal distance between
/// unrelated actions.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct ForwardDynamics {
    mlp: Mlp,
}

impl ForwardDynamics {
    pub fn new(feature_dim: usize, device: Device, config: &MlpConfig) -> Self {
        Self {
            mlp: config.build_module(feature_dim + 1, feature_dim, device),
        }
    }

    pub fn feature_dim(&self) -> usize {
        self.mlp.out_dim()
    }

    /// Predicted next feature `[B, F]` given `feature` `[B, F]` and `actions` `[B]`.
    ///
    /// Actions of any numeric kind are converted to the kind of `feature`.
    pub fn predict_next_feature(&self, feature: &Tensor, actions: &Tensor) -> Tensor {
        let actions = actions.reshape(&[-1, 1]).to_kind(feature.kind());
        self.mlp.forward(&Tensor::cat(&[feature, &actions], -1))
    }
}

impl Module for ForwardDynamics {
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
    use crate::torch::modules::Activation;
    use rstest::rstest;
    use tch::Kind;

    fn head() -> ForwardDynamics {
        let config = MlpConfig {
            hidden_sizes: vec![256],
            activation: Activation::Identity,
            ..MlpConfig::default()
        };
        ForwardDynamics::new(288, Device::Cpu, &config)
    }

    #[rstest]
    #[case(1)]
    #[case(8)]
    #[case(64)]
    fn prediction_shape(#[case] batch_size: i64) {
        let feature = Tensor::rand(&[batch_size, 288], (Kind::Float, Device::Cpu));
        let actions = Tensor::zeros(&[batch_size], (Kind::Int64, Device::Cpu));
        let prediction = head().predict_next_feature(&feature, &actions);
        assert_eq!(prediction.size(), [batch_size, 288]);
    }

    #[test]
    fn action_is_an_input() {
        let head = head();
        let feature = Tensor::rand(&[1, 288], (Kind::Float, Device::Cpu));
        let a0 = Tensor::of_slice(&[0_i64]);
        let a1 = Tensor::of_slice(&[1_i64]);
        assert_ne!(
            head.predict_next_feature(&feature, &a0),
            head.predict_next_feature(&feature, &a1)
        );
    }

    #[test]
    fn integer_and_float_actions_agree() {
        let head = head();
        let feature = Tensor::rand(&[2, 288], (Kind::Float, Device::Cpu));
        let int_actions = Tensor::of_slice(&[2_i64, 3]);
        let float_actions = Tensor::of_slice(&[2.0_f32, 3.0]);
        assert_eq!(
            head.predict_next_feature(&feature, &int_actions),
            head.predict_next_feature(&feature, &float_actions)
        );
    }
}
