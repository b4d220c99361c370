//! Convolutional feature encoder
use crate::torch::modules::{prefixed, Activation, Conv2d, Conv2dConfig, Module};
use serde::{Deserialize, Serialize};
use tch::{Device, Kind, Tensor};

/// Configuration of the convolutional [`FeatureEncoder`].
///
/// The encoder is a stack of `num_layers` square convolutions with `channels` output channels
/// each. Every layer but the last is followed by `activation`.
/// The final `[channels, h, w]` activation map is flattened into the feature vector.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub num_layers: usize,
    pub channels: usize,
    pub kernel_size: usize,
    pub stride: usize,
    pub padding: usize,
    pub activation: Activation,
    pub conv_config: Conv2dConfig,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            num_layers: 4,
            channels: 32,
            kernel_size: 3,
            stride: 2,
            padding: 1,
            activation: Activation::Elu,
            conv_config: Conv2dConfig::default(),
        }
    }
}

impl EncoderConfig {
    /// Shape `[channels, height, width]` of the last convolution output.
    ///
    /// Returns `None` if the input is too small for the kernel at some layer
    /// or if the encoder has no layers.
    pub fn output_shape(&self, input_dims: [usize; 3]) -> Option<[usize; 3]> {
        if self.num_layers == 0 {
            return None;
        }
        let [_, mut height, mut width] = input_dims;
        for _ in 0..self.num_layers {
            height = self.output_len(height)?;
            width = self.output_len(width)?;
        }
        Some([self.channels, height, width])
    }

    /// Length of the flattened feature vector for observations of shape `input_dims`.
    pub fn feature_dim(&self, input_dims: [usize; 3]) -> Option<usize> {
        self.output_shape(input_dims).map(|shape| shape.iter().product())
    }

    const fn output_len(&self, len: usize) -> Option<usize> {
        crate::torch::modules::ff::conv_output_len(len, self.kernel_size, self.stride, self.padding)
    }

    /// Build an encoder for observations of shape `input_dims`.
    ///
    /// Returns `None` under the same conditions as [`EncoderConfig::output_shape`].
    pub fn build_encoder(&self, input_dims: [usize; 3], device: Device) -> Option<FeatureEncoder> {
        let feature_dim = self.feature_dim(input_dims)?;
        let layers = (0..self.num_layers)
            .map(|i| {
                let in_channels = if i == 0 { input_dims[0] } else { self.channels };
                Conv2d::new(
                    in_channels,
                    self.channels,
                    self.kernel_size,
                    self.stride,
                    self.padding,
                    device,
                    &self.conv_config,
                )
            })
            .collect();
        Some(FeatureEncoder {
            layers,
            activation: self.activation,
            input_dims,
            feature_dim,
        })
    }
}

/// Whether an encoding takes part in gradient computation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EncodeMode {
    /// The encoding is differentiable with respect to the encoder parameters.
    Differentiable,
    /// The encoding is a constant snapshot; no gradient flows back into the encoder.
    Detached,
}

/// Maps a batch of stacked-frame observations `[B, C, H, W]` to features `[B, feature_dim]`.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    layers: Vec<Conv2d>,
    activation: Activation,
    input_dims: [usize; 3],
    feature_dim: usize,
}

impl FeatureEncoder {
    /// Observation shape `[channels, height, width]` expected by this encoder.
    pub const fn input_dims(&self) -> [usize; 3] {
        self.input_dims
    }

    /// Length of the encoded feature vector.
    pub const fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Element kind that observations must have.
    pub fn kind(&self) -> Kind {
        self.layers.first().map_or(Kind::Float, Conv2d::kind)
    }

    /// Encode a batch of observations.
    ///
    /// `observations` must have shape `[B, C, H, W]` matching [`FeatureEncoder::input_dims`].
    pub fn encode(&self, observations: &Tensor, mode: EncodeMode) -> Tensor {
        match mode {
            EncodeMode::Differentiable => self.forward_features(observations),
            EncodeMode::Detached => tch::no_grad(|| self.forward_features(observations)),
        }
    }

    fn forward_features(&self, observations: &Tensor) -> Tensor {
        let (last, hidden_layers) = match self.layers.split_last() {
            Some(split) => split,
            None => return observations.flatten(1, -1),
        };
        let mut hidden = observations.shallow_clone();
        for layer in hidden_layers {
            hidden = self.activation.forward_owned(layer.forward(&hidden));
        }
        last.forward(&hidden).flatten(1, -1)
    }
}

impl Module for FeatureEncoder {
    fn shallow_clone(&self) -> Self {
        Self {
            layers: self.layers.iter().map(Conv2d::shallow_clone).collect(),
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
            .flat_map(|(i, layer)| prefixed(&format!("conv_{}", i), layer.named_variables()))
            .collect()
    }
}
