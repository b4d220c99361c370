use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use curiosity::torch::{AdamConfig, IcmUpdater};
use curiosity::IcmConfig;
use tch::{Device, Kind, Tensor};

fn transitions(batch_size: i64) -> (Tensor, Tensor, Tensor) {
    let options = (Kind::Float, Device::Cpu);
    (
        Tensor::rand(&[batch_size, 4, 42, 42], options),
        Tensor::rand(&[batch_size, 4, 42, 42], options),
        Tensor::randint(4, &[batch_size], (Kind::Int64, Device::Cpu)),
    )
}

/// Reward-only evaluation as done during rollout collection
fn intrinsic_reward(c: &mut Criterion) {
    let icm = IcmConfig::default().build().unwrap();
    let mut group = c.benchmark_group("intrinsic_reward");
    for batch_size in [1, 32] {
        let (obs, next_obs, actions) = transitions(batch_size);
        group.bench_with_input(BenchmarkId::from_parameter(batch_size), &batch_size, |b, _| {
            b.iter(|| icm.intrinsic_reward(&obs, &next_obs, &actions).unwrap())
        });
    }
}

/// Loss computation with backward pass and optimizer step
fn update(c: &mut Criterion) {
    let icm = IcmConfig::default().build().unwrap();
    let mut updater = IcmUpdater::new(&icm, &AdamConfig::default()).unwrap();
    let (obs, next_obs, actions) = transitions(32);
    c.bench_function("update_32", |b| {
        b.iter(|| {
            updater
                .update(&icm, &obs, &next_obs, &actions, &mut ())
                .unwrap()
        })
    });
}

criterion_group!(benches, intrinsic_reward, update);
criterion_main!(benches);
