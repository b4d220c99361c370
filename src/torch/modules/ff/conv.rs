//! 2D convolution layer
use super::super::Module;
use crate::torch::initializers::Initializer;
use crate::utils::torch::TensorDef;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::iter;
use tch::{Device, Kind, Tensor};

/// Output length of a convolution along one spatial dimension.
///
/// Returns `None` if the padded input is smaller than the kernel or if `stride` is zero.
pub const fn conv_output_len(
    len: usize,
    kernel_size: usize,
    stride: usize,
    padding: usize,
) -> Option<usize> {
    let padded = len + 2 * padding;
    if stride == 0 || kernel_size == 0 || padded < kernel_size {
        None
    } else {
        Some((padded - kernel_size) / stride + 1)
    }
}

/// Parameter initialization for the [`Conv2d`] module.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conv2dConfig {
    /// Initializer for the kernel.
    pub kernel_init: Initializer,
    /// Initializer for the bias vector, if one exists.
    pub bias_init: Option<Initializer>,
}

impl Default for Conv2dConfig {
    fn default() -> Self {
        Self {
            kernel_init: Initializer::default(),
            bias_init: Some(Initializer::default()),
        }
    }
}

impl Conv2dConfig {
    /// Configuration with every parameter initialized to zero.
    pub const fn zeros() -> Self {
        Self {
            kernel_init: Initializer::Zeros,
            bias_init: Some(Initializer::Zeros),
        }
    }
}

/// 2D convolution over a batch of `[channels, height, width]` images.
///
/// Square kernel with equal stride and zero padding on both spatial dimensions.
#[serde_as]
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Conv2d {
    /// Shape `[out_channels, in_channels, kernel_size, kernel_size]`
    #[serde_as(as = "TensorDef")]
    kernel: Tensor,
    #[serde_as(as = "Option<TensorDef>")]
    bias: Option<Tensor>,
    stride: usize,
    padding: usize,
}

impl Conv2d {
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        padding: usize,
        device: Device,
        config: &Conv2dConfig,
    ) -> Self {
        let fan_in = in_channels * kernel_size * kernel_size + 1;
        Self {
            kernel: config
                .kernel_init
                .tensor(&[out_channels, in_channels, kernel_size, kernel_size])
                .fan_in(fan_in)
                .device(device)
                .build(),
            bias: config.bias_init.map(|init| {
                init.tensor(&[out_channels])
                    .fan_in(fan_in)
                    .device(device)
                    .build()
            }),
            stride,
            padding,
        }
    }

    pub fn in_channels(&self) -> usize {
        self.kernel.size()[1] as usize
    }

    pub fn out_channels(&self) -> usize {
        self.kernel.size()[0] as usize
    }

    pub fn kernel_size(&self) -> usize {
        self.kernel.size()[2] as usize
    }

    /// Element kind of the parameters. Inputs must have the same kind.
    pub fn kind(&self) -> Kind {
        self.kernel.kind()
    }

    /// Output `[height, width]` for an input of size `[height, width]`.
    pub fn output_size(&self, input_size: [usize; 2]) -> Option<[usize; 2]> {
        let k = self.kernel_size();
        Some([
            conv_output_len(input_size[0], k, self.stride, self.padding)?,
            conv_output_len(input_size[1], k, self.stride, self.padding)?,
        ])
    }

    /// Apply to a batch of images of shape `[batch, in_channels, height, width]`.
    pub fn forward(&self, input: &Tensor) -> Tensor {
        let stride = self.stride as i64;
        let padding = self.padding as i64;
        input.conv2d(
            &self.kernel,
            self.bias.as_ref(),
            &[stride, stride],
            &[padding, padding],
            &[1, 1],
            1,
        )
    }
}

impl Module for Conv2d {
    fn shallow_clone(&self) -> Self {
        Self {
            kernel: self.kernel.shallow_clone(),
            bias: self.bias.as_ref().map(Tensor::shallow_clone),
            ..*self
        }
    }

    fn clone_to_device(&self, device: Device) -> Self {
        let copy = |t: &Tensor| {
            t.detach()
                .to_device(device)
                .copy()
                .set_requires_grad(t.requires_grad())
        };
        Self {
            kernel: copy(&self.kernel),
            bias: self.bias.as_ref().map(copy),
            ..*self
        }
    }

    fn variables(&self) -> Box<dyn Iterator<Item = &Tensor> + '_> {
        Box::new(iter::once(&self.kernel).chain(self.bias.iter()))
    }

    fn named_variables(&self) -> Vec<(String, &Tensor)> {
        iter::once(("kernel".to_owned(), &self.kernel))
            .chain(self.bias.iter().map(|b| ("bias".to_owned(), b)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(42, 21)]
    #[case(21, 11)]
    #[case(11, 6)]
    #[case(6, 3)]
    #[case(1, 1)]
    fn stride_2_pad_1_halves_rounding_up(#[case] len: usize, #[case] expected: usize) {
        assert_eq!(conv_output_len(len, 3, 2, 1), Some(expected));
    }

    #[test]
    fn output_len_kernel_too_large() {
        assert_eq!(conv_output_len(2, 5, 1, 1), None);
    }

    #[test]
    fn output_len_zero_stride() {
        assert_eq!(conv_output_len(8, 3, 0, 1), None);
    }

    #[rstest]
    #[case(1)]
    #[case(8)]
    fn forward_shape_matches_output_size(#[case] batch_size: i64) {
        let conv = Conv2d::new(4, 32, 3, 2, 1, Device::Cpu, &Conv2dConfig::default());
        let input = Tensor::rand(&[batch_size, 4, 42, 42], (Kind::Float, Device::Cpu));
        let output = tch::no_grad(|| conv.forward(&input));
        let [h, w] = conv.output_size([42, 42]).unwrap();
        assert_eq!(output.size(), vec![batch_size, 32, h as i64, w as i64]);
    }

    #[test]
    fn zeros_forward_is_zero() {
        let conv = Conv2d::new(1, 2, 3, 2, 1, Device::Cpu, &Conv2dConfig::zeros());
        let input = Tensor::ones(&[1, 1, 4, 4], (Kind::Float, Device::Cpu));
        assert_eq!(
            conv.forward(&input),
            Tensor::zeros(&[1, 2, 2, 2], (Kind::Float, Device::Cpu))
        );
    }

    #[test]
    fn matches_known_values() {
        // A 1x1 all-ones kernel without bias sums the input channels.
        let config = Conv2dConfig {
            kernel_init: Initializer::Constant(1.0),
            bias_init: None,
        };
        let conv = Conv2d::new(2, 1, 1, 1, 0, Device::Cpu, &config);
        let input = Tensor::of_slice(&[1.0_f32, 2.0, 3.0, 4.0, 10.0, 20.0, 30.0, 40.0])
            .reshape(&[1, 2, 2, 2]);
        let expected = Tensor::of_slice(&[11.0_f32, 22.0, 33.0, 44.0]).reshape(&[1, 1, 2, 2]);
        assert_eq!(tch::no_grad(|| conv.forward(&input)), expected);
    }

    #[test]
    fn channel_accessors() {
        let conv = Conv2d::new(4, 32, 3, 2, 1, Device::Cpu, &Conv2dConfig::default());
        assert_eq!(conv.in_channels(), 4);
        assert_eq!(conv.out_channels(), 32);
        assert_eq!(conv.kernel_size(), 3);
        assert_eq!(conv.variables().count(), 2);
    }
}
