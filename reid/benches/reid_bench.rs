use criterion::{black_box, criterion_group, criterion_main, Criterion};
use persontrack_reid::{Config, Registry};

fn random_unit_vec(dim: usize, seed: u64) -> Vec<f32> {
    let mut v = Vec::with_capacity(dim);
    let mut state = seed;
    for _ in 0..dim {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        v.push(((state >> 33) as f32) / (u32::MAX as f32) - 0.5);
    }
    let norm: f64 = v.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>().sqrt();
    if norm > 0.0 {
        let s = (1.0 / norm) as f32;
        for x in &mut v {
            *x *= s;
        }
    }
    v
}

fn populated_registry(dim: usize, people: usize) -> Registry {
    let reg = Registry::new(Config {
        dim,
        threshold: 0.8,
        ..Config::default()
    });
    // Random high-dimensional unit vectors are near-orthogonal, so each
    // seeds its own identity.
    for i in 0..people {
        let emb = random_unit_vec(dim, 1000 + i as u64);
        reg.get_or_create(&emb, Some("cam-1"), None).unwrap();
    }
    reg
}

fn bench_try_match(c: &mut Criterion) {
    let dim = 512;
    let reg = populated_registry(dim, 100);
    let probe = random_unit_vec(dim, 999);

    c.bench_function("reid_try_match_512d_100ids", |b| {
        b.iter(|| {
            let _ = black_box(reg.try_match(black_box(&probe)).unwrap());
        });
    });
}

fn bench_get_or_create_rematch(c: &mut Criterion) {
    let dim = 512;
    let reg = populated_registry(dim, 100);
    // Probe equal to an existing representative: exercises the full
    // scan-plus-merge write path.
    let probe = reg.identities()[0].vector.clone();

    c.bench_function("reid_get_or_create_rematch_512d_100ids", |b| {
        b.iter(|| {
            let _ = black_box(reg.get_or_create(black_box(&probe), Some("cam-1"), None).unwrap());
        });
    });
}

criterion_group!(benches, bench_try_match, bench_get_or_create_rematch);
criterion_main!(benches);
