//! Neural network modules
//!
//! Modules own their parameter tensors directly rather than registering them in a shared
//! variable store. The parameter set of a module is exposed by [`Module::variables`] and is
//! only modified by an optimizer built from [`Module::trainable_variables`].
pub mod ff;
#[cfg(test)]
pub mod testing;

pub use ff::{Activation, Conv2d, Conv2dConfig, Linear, LinearConfig, Mlp, MlpConfig};

use tch::{Device, Tensor};

/// Base trait of a module with parameter tensors.
pub trait Module {
    /// Create a clone of this module sharing the same parameter tensors.
    fn shallow_clone(&self) -> Self
    where
        Self: Sized;

    /// Create a clone of this module with parameters copied to the given device.
    ///
    /// The parameters are copied even if `device` matches the current device.
    fn clone_to_device(&self, device: Device) -> Self
    where
        Self: Sized;

    /// Iterator over all parameter tensors.
    fn variables(&self) -> Box<dyn Iterator<Item = &Tensor> + '_>;

    /// Iterator over the parameter tensors that are updated by training.
    fn trainable_variables(&self) -> Box<dyn Iterator<Item = &Tensor> + '_> {
        Box::new(self.variables().filter(|t| t.requires_grad()))
    }

    /// Parameter tensors paired with names that are unique within this module.
    ///
    /// Names of nested modules are joined with `.`, for example `layer_0.kernel`.
    fn named_variables(&self) -> Vec<(String, &Tensor)>;
}

/// A module that maps a batch of inputs to a batch of outputs.
pub trait FeedForwardModule: Module {
    /// Apply to a batch of inputs.
    ///
    /// The last dimension of `input` holds the features.
    fn forward(&self, input: &Tensor) -> Tensor;
}

/// Build a feed-forward module with the given input and output feature dimensions.
pub trait BuildModule {
    type Module: FeedForwardModule;

    fn build_module(&self, in_dim: usize, out_dim: usize, device: Device) -> Self::Module;
}

/// Prefix the names of a nested module's variables.
pub(crate) fn prefixed<'a>(
    prefix: &str,
    named: Vec<(String, &'a Tensor)>,
) -> impl Iterator<Item = (String, &'a Tensor)> + 'a {
    let prefix = prefix.to_owned();
    named
        .into_iter()
        .map(move |(name, tensor)| (format!("{}.{}", prefix, name), tensor))
}
