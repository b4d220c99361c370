//! Linear layer
use super::super::{BuildModule, FeedForwardModule, Module};
use crate::torch::initializers::Initializer;
use crate::utils::torch::TensorDef;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::iter;
use tch::{Device, Tensor};

/// Configuration for the [`Linear`] module.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearConfig {
    /// Initializer for the kernel (weight) matrix.
    pub kernel_init: Initializer,
    /// Initializer for the bias vector, if one exists.
    pub bias_init: Option<Initializer>,
}

impl Default for LinearConfig {
    fn default() -> Self {
        Self {
            kernel_init: Initializer::default(),
            bias_init: Some(Initializer::default()),
        }
    }
}

impl LinearConfig {
    /// Configuration with every parameter initialized to zero.
    pub const fn zeros() -> Self {
        Self {
            kernel_init: Initializer::Zeros,
            bias_init: Some(Initializer::Zeros),
        }
    }
}

impl BuildModule for LinearConfig {
    type Module = Linear;

    fn build_module(&self, in_dim: usize, out_dim: usize, device: Device) -> Self::Module {
        Linear::new(in_dim, out_dim, device, self)
    }
}

/// Linear fully-connected layer module.
#[serde_as]
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Linear {
    #[serde_as(as = "TensorDef")]
    kernel: Tensor,
    #[serde_as(as = "Option<TensorDef>")]
    bias: Option<Tensor>,
}

impl Linear {
    pub fn new(in_dim: usize, out_dim: usize, device: Device, config: &LinearConfig) -> Self {
        // Total fan_in is the weights in_dim + 1 for the bias.
        let fan_in = in_dim + 1;
        Self {
            kernel: config
                .kernel_init
                .tensor(&[out_dim, in_dim])
                .fan_in(fan_in)
                .device(device)
                .build(),
            bias: config.bias_init.map(|init| {
                init.tensor(&[out_dim])
                    .fan_in(fan_in)
                    .device(device)
                    .build()
            }),
        }
    }

    /// Number of input features.
    pub fn in_dim(&self) -> usize {
        self.kernel.size()[1] as usize
    }

    /// Number of output features.
    pub fn out_dim(&self) -> usize {
        self.kernel.size()[0] as usize
    }
}

impl Module for Linear {
    fn shallow_clone(&self) -> Self {
        Self {
            kernel: self.kernel.shallow_clone(),
            bias: self.bias.as_ref().map(Tensor::shallow_clone),
        }
    }

    fn clone_to_device(&self, device: Device) -> Self {
        // Copies become new leaf tensors that keep the requires_grad flag.
        let copy = |t: &Tensor| {
            t.detach()
                .to_device(device)
                .copy()
                .set_requires_grad(t.requires_grad())
        };
        Self {
            kernel: copy(&self.kernel),
            bias: self.bias.as_ref().map(copy),
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

impl FeedForwardModule for Linear {
    #[inline]
    fn forward(&self, input: &Tensor) -> Tensor {
        input.linear(&self.kernel, self.bias.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::super::super::testing;
    use super::*;
    use rstest::{fixture, rstest};
    use tch::Kind;

    #[fixture]
    fn default_module() -> (Linear, usize, usize) {
        let in_dim = 3;
        let out_dim = 2;
        let module = LinearConfig::default().build_module(in_dim, out_dim, Device::Cpu);
        (module, in_dim, out_dim)
    }

    #[fixture]
    fn module_no_bias() -> (Linear, usize, usize) {
        let in_dim = 3;
        let out_dim = 2;
        let config = LinearConfig {
            bias_init: None,
            ..LinearConfig::default()
        };
        let module = config.build_module(in_dim, out_dim, Device::Cpu);
        (module, in_dim, out_dim)
    }

    #[rstest]
    #[case(&[4])]
    #[case(&[1])]
    #[case(&[2, 5])]
    fn forward_batch(default_module: (Linear, usize, usize), #[case] batch_shape: &[usize]) {
        let (module, in_dim, out_dim) = default_module;
        testing::check_forward(&module, in_dim, out_dim, batch_shape, Kind::Float);
    }

    #[test]
    fn forward_gradient_descent() {
        testing::check_config_forward_gradient_descent(&LinearConfig::default());
    }

    #[test]
    fn zeros_forward_is_zero() {
        let module = LinearConfig::zeros().build_module(3, 2, Device::Cpu);
        let output = module.forward(&Tensor::ones(&[4, 3], (Kind::Float, Device::Cpu)));
        assert_eq!(output, Tensor::zeros(&[4, 2], (Kind::Float, Device::Cpu)));
    }

    #[rstest]
    fn dims(default_module: (Linear, usize, usize)) {
        let (module, in_dim, out_dim) = default_module;
        assert_eq!(module.in_dim(), in_dim);
        assert_eq!(module.out_dim(), out_dim);
    }

    #[rstest]
    fn variables_count_default(default_module: (Linear, usize, usize)) {
        let (module, _, _) = default_module;
        assert_eq!(module.variables().count(), 2);
        assert_eq!(module.trainable_variables().count(), 2);
    }

    #[rstest]
    fn variables_count_no_bias(module_no_bias: (Linear, usize, usize)) {
        let (module, _, _) = module_no_bias;
        assert_eq!(module.variables().count(), 1);
    }

    #[rstest]
    fn named_variables(default_module: (Linear, usize, usize)) {
        let (module, _, _) = default_module;
        let names: Vec<_> = module.named_variables().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["kernel", "bias"]);
    }

    #[test]
    fn clone_to_same_device() {
        testing::check_config_forward_clone_to_same_device(&LinearConfig::default());
    }

    #[rstest]
    fn shallow_clone_shares_parameters(default_module: (Linear, usize, usize)) {
        let (module, _, _) = default_module;
        let clone = module.shallow_clone();
        tch::no_grad(|| {
            let _ = clone.kernel.shallow_clone().fill_(1.0);
        });
        assert_eq!(module.kernel, clone.kernel);
    }
}
