//! Multi-layer perceptron
use super::super::{prefixed, BuildModule, FeedForwardModule, Module};
use super::{Activation, Linear, LinearConfig};
use serde::{Deserialize, Serialize};
use std::iter;
use tch::{Device, Tensor};

/// Configuration for the [`Mlp`] module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlpConfig {
    /// Sizes of the hidden layers
    pub hidden_sizes: Vec<usize>,
    /// Activation function between hidden layers.
    pub activation: Activation,
    /// Activation function on the output.
    pub output_activation: Activation,
    /// Configuration for the linear layers
    pub linear_config: LinearConfig,
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self {
            hidden_sizes: vec![128],
            activation: Activation::Relu,
            output_activation: Activation::Identity,
            linear_config: LinearConfig::default(),
        }
    }
}

impl BuildModule for MlpConfig {
    type Module = Mlp;

    fn build_module(&self, in_dim: usize, out_dim: usize, device: Device) -> Self::Module {
        Mlp::new(in_dim, out_dim, device, self)
    }
}

/// Multi-layer perceptron
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Mlp {
    layers: Vec<Linear>,
    activation: Activation,
    output_activation: Activation,
}

impl Mlp {
    pub fn new(in_dim: usize, out_dim: usize, device: Device, config: &MlpConfig) -> Self {
        let in_dims = iter::once(&in_dim).chain(&config.hidden_sizes);
        let out_dims = config.hidden_sizes.iter().chain(iter::once(&out_dim));

        let layers = in_dims
            .zip(out_dims)
            .map(|(&in_, &out_)| Linear::new(in_, out_, device, &config.linear_config))
            .collect();

        Self {
            layers,
            activation: config.activation,
            output_activation: config.output_activation,
        }
    }

    /// Number of input features.
    pub fn in_dim(&self) -> usize {
        self.layers.first().map_or(0, Linear::in_dim)
    }

    /// Number of output features.
    pub fn out_dim(&self) -> usize {
        self.layers.last().map_or(0, Linear::out_dim)
    }
}

impl Module for Mlp {
    fn shallow_clone(&self) -> Self {
        Self {
            layers: self.layers.iter().map(Linear::shallow_clone).collect(),
            ..*self
        }
    }

    fn clone_to_device(&self, device: Device) -> Self {
        Self {
            layers: self
                .layers
                .iter()
                .map(|layer| layer.clone_to_device(device))
                .collect(),
            ..*self
        }
    }

    fn variables(&self) -> Box<dyn Iterator<Item = &Tensor> + '_> {
        Box::new(self.layers.iter().flat_map(|layer| layer.variables()))
    }

    fn named_variables(&self) -> Vec<(String, &Tensor)> {
        self.layers
            .iter()
            .enumerate()
            .flat_map(|(i, layer)| prefixed(&format!("layer_{}", i), layer.named_variables()))
            .collect()
    }
}

impl FeedForwardModule for Mlp {
    fn forward(&self, input: &Tensor) -> Tensor {
        let mut iter_layers = self.layers.iter();
        // There is always at least one layer: the output layer is built even with no hidden sizes.
        let mut hidden = match iter_layers.next() {
            Some(layer) => layer.forward(input),
            None => input.shallow_clone(),
        };
        for layer in iter_layers {
            hidden = layer.forward(&self.activation.forward_owned(hidden));
        }
        self.output_activation.forward_owned(hidden)
    }
}

#[cfg(test)]
mod tests {
    use super::super::super::testing;
    use super::*;
    use rstest::{fixture, rstest};
    use tch::Kind;

    #[fixture]
    fn default_module() -> (Mlp, usize, usize) {
        let in_dim = 3;
        let out_dim = 2;
        let module = MlpConfig::default().build_module(in_dim, out_dim, Device::Cpu);
        (module, in_dim, out_dim)
    }

    #[rstest]
    fn default_module_forward_batch(default_module: (Mlp, usize, usize)) {
        let (default_mlp, in_dim, out_dim) = default_module;
        testing::check_forward(&default_mlp, in_dim, out_dim, &[4], Kind::Float);
    }

    #[test]
    fn default_module_forward_gradient_descent() {
        testing::check_config_forward_gradient_descent(&MlpConfig::default());
    }

    #[test]
    fn linear_hidden_forward_gradient_descent() {
        let config = MlpConfig {
            hidden_sizes: vec![256],
            activation: Activation::Identity,
            ..MlpConfig::default()
        };
        testing::check_config_forward_gradient_descent(&config);
    }

    #[test]
    fn no_hidden_layers_is_linear() {
        let config = MlpConfig {
            hidden_sizes: vec![],
            ..MlpConfig::default()
        };
        let mlp = config.build_module(3, 2, Device::Cpu);
        assert_eq!(mlp.variables().count(), 2);
        testing::check_forward(&mlp, 3, 2, &[5], Kind::Float);
    }

    #[rstest]
    fn dims(default_module: (Mlp, usize, usize)) {
        let (mlp, in_dim, out_dim) = default_module;
        assert_eq!(mlp.in_dim(), in_dim);
        assert_eq!(mlp.out_dim(), out_dim);
    }

    #[rstest]
    fn named_variables(default_module: (Mlp, usize, usize)) {
        let (mlp, _, _) = default_module;
        let names: Vec<_> = mlp.named_variables().into_iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            ["layer_0.kernel", "layer_0.bias", "layer_1.kernel", "layer_1.bias"]
        );
    }

    #[test]
    fn clone_to_same_device() {
        testing::check_config_forward_clone_to_same_device(&MlpConfig::default());
    }

    #[test]
    fn config_deserialize_partial() {
        let config: MlpConfig = serde_json::from_str(r#"{"hidden_sizes": [64, 64]}"#).unwrap();
        assert_eq!(
            config,
            MlpConfig {
                hidden_sizes: vec![64, 64],
                ..MlpConfig::default()
            }
        );
    }
}
