use criterion::{criterion_group, criterion_main, Criterion};
use nalgebra::DMatrix;
use snl_core::{Prior, RngHandle};
use snl_inference::{
    AffineAutoregressive, DiagonalGaussian, LikelihoodTrainer, ParameterObservationBank,
    TrainingConfig,
};

fn bench_fit(c: &mut Criterion) {
    let mut rng = RngHandle::from_seed(1);
    let parameters = DiagonalGaussian::standard(3).sample(1000, &mut rng);
    let observations = DMatrix::from_fn(1000, 3, |r, col| {
        parameters[(r, col)] + 0.3 * rng.standard_normal()
    });
    let mut bank = ParameterObservationBank::new();
    bank.append(parameters, observations).unwrap();
    let trainer = LikelihoodTrainer::new(TrainingConfig {
        learning_rate: 1e-2,
        stop_after_epochs: 5,
        ..TrainingConfig::default()
    })
    .unwrap();

    c.bench_function("fit_1000_examples", |b| {
        b.iter(|| {
            let mut estimator = AffineAutoregressive::new(3, 3);
            trainer
                .fit(&bank, &mut estimator, &mut RngHandle::from_seed(2))
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_fit);
criterion_main!(benches);
