//! Module test utilities.
use super::{BuildModule, FeedForwardModule, Module};
use crate::torch::optimizers::{BuildOptimizer, OnceOptimizer, SgdConfig};
use std::iter;
use tch::{kind::Kind, Device, Tensor};

/// Basic structural check of [`FeedForwardModule::forward`].
pub fn check_forward<M: FeedForwardModule>(
    module: &M,
    in_dim: usize,
    out_dim: usize,
    batch_shape: &[usize],
    kind: Kind,
) {
    let _no_grad_guard = tch::no_grad_guard();
    let input_shape: Vec<_> = batch_shape
        .iter()
        .chain(iter::once(&in_dim))
        .map(|&d| d as i64)
        .collect();
    let input = Tensor::ones(&input_shape, (kind, Device::Cpu));
    let output = module.forward(&input);
    let mut output_shape = input_shape;
    *output_shape.last_mut().unwrap() = out_dim as i64;
    assert_eq!(output.size(), output_shape);
}

/// Check that gradient descent improves the output of a forward model.
pub fn check_config_forward_gradient_descent<MC: BuildModule>(config: &MC) {
    let in_dim = 2;
    let out_dim = 32; // needs to be large enough to avoid all 0 from ReLU by chance
    let kind = Kind::Float;
    let device = Device::Cpu;

    // Input batch consists of a row of zeros and a row of ones.
    let input = Tensor::stack(
        &[
            Tensor::zeros(&[in_dim as i64], (kind, device)),
            Tensor::ones(&[in_dim as i64], (kind, device)),
        ],
        0,
    );
    let target = Tensor::stack(
        &[
            Tensor::zeros(&[out_dim as i64], (kind, device)),
            Tensor::ones(&[out_dim as i64], (kind, device)),
        ],
        0,
    );

    let model = config.build_module(in_dim, out_dim, device);
    let mut optimizer = SgdConfig::default()
        .build_optimizer(model.trainable_variables())
        .unwrap();

    let initial_output = model.forward(&input);
    let initial_loss = (&initial_output - &target).square().sum(kind);
    optimizer.backward_step_once(&initial_loss).unwrap();

    let final_output = model.forward(&input);
    assert_ne!(initial_output, final_output);

    let final_loss = (&final_output - &target).square().sum(kind);
    assert!(final_loss.double_value(&[]) < initial_loss.double_value(&[]));
}

/// Check that a module cloned to the same device produces the same outputs with copied parameters.
pub fn check_config_forward_clone_to_same_device<MC: BuildModule>(config: &MC) {
    let in_dim = 3;
    let out_dim = 4;
    let device = Device::Cpu;
    let module = config.build_module(in_dim, out_dim, device);
    let clone = module.clone_to_device(device);

    let input = Tensor::rand(&[5, in_dim as i64], (Kind::Float, device));
    let _no_grad_guard = tch::no_grad_guard();
    assert_eq!(module.forward(&input), clone.forward(&input));

    // The clone owns separate parameter memory
    for (original, copied) in module.variables().zip(clone.variables()) {
        assert_ne!(original.data_ptr(), copied.data_ptr());
        assert_eq!(original.requires_grad(), copied.requires_grad());
    }
}
