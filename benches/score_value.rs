use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::Criterion;
use lace_conjugate::{dd, nich, GroupT};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

const N_GROUPS: usize = 100;
const N_VALUES: usize = 10_000;
const DIM: usize = 16;

fn nich_mixture() -> (nich::Shared, nich::Mixture) {
    let mut rng = Xoshiro256Plus::seed_from_u64(1337);
    let shared = nich::Shared::default();
    let mut mixture = nich::Mixture::new();
    mixture.init(&shared);
    (0..N_GROUPS).for_each(|_| {
        mixture.add_group(&shared);
    });
    for _ in 0..N_VALUES {
        let groupid = rng.gen_range(0..N_GROUPS);
        let x: f64 = rng.gen_range(-10.0..10.0);
        mixture.add_value(&shared, groupid, &x);
    }
    (shared, mixture)
}

fn dd_mixture() -> (dd::Shared<DIM>, dd::Mixture<DIM>) {
    let mut rng = Xoshiro256Plus::seed_from_u64(1337);
    let shared = dd::Shared::symmetric(DIM, 0.5).unwrap();
    let mut mixture = dd::Mixture::new();
    mixture.init(&shared);
    (0..N_GROUPS).for_each(|_| {
        mixture.add_group(&shared);
    });
    for _ in 0..N_VALUES {
        let groupid = rng.gen_range(0..N_GROUPS);
        let x = rng.gen_range(0..DIM);
        mixture.add_value(&shared, groupid, &x);
    }
    (shared, mixture)
}

fn bench_nich_score_value(c: &mut Criterion) {
    let (shared, mixture) = nich_mixture();
    let mut scores = vec![0.0; N_GROUPS];

    c.bench_function("nich vectorized score_value", |b| {
        b.iter(|| {
            mixture.score_value(&shared, black_box(&1.5), &mut scores);
        })
    });

    c.bench_function("nich per-group score_value", |b| {
        b.iter(|| {
            scores
                .iter_mut()
                .zip(mixture.groups())
                .for_each(|(score, group)| {
                    *score += group.score_value(&shared, black_box(&1.5));
                });
        })
    });
}

fn bench_dd_score_value(c: &mut Criterion) {
    let (shared, mixture) = dd_mixture();
    let mut scores = vec![0.0; N_GROUPS];

    c.bench_function("dd vectorized score_value", |b| {
        b.iter(|| {
            mixture.score_value(&shared, black_box(&3), &mut scores);
        })
    });

    c.bench_function("dd per-group score_value", |b| {
        b.iter(|| {
            scores
                .iter_mut()
                .zip(mixture.groups())
                .for_each(|(score, group)| {
                    *score += group.score_value(&shared, black_box(&3));
                });
        })
    });
}

fn bench_dd_score_data_grid(c: &mut Criterion) {
    let (_, mixture) = dd_mixture();
    let grid: Vec<dd::Shared<DIM>> = (0..DIM)
        .map(|ix| {
            let mut alphas = vec![0.5; DIM];
            alphas[ix] = 2.0;
            dd::Shared::new(&alphas).unwrap()
        })
        .collect();
    let mut scores = vec![0.0; grid.len()];

    c.bench_function("dd score_data_grid", |b| {
        b.iter(|| {
            let mut cache = dd::CachedDataScorer::default();
            mixture.score_data_grid(black_box(&grid), &mut cache, &mut scores);
        })
    });
}

criterion_group!(
    benches,
    bench_nich_score_value,
    bench_dd_score_value,
    bench_dd_score_data_grid
);
criterion_main!(benches);
