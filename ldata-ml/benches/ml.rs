use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ldata_ml::{kernel_pca, lda, pca, tsne, umap, KernelPcaConfig, LdaConfig, PcaConfig, TsneConfig, UmapConfig};

fn random_flat(n: usize, d: usize, seed: u64) -> Vec<f64> {
    let mut state = seed;
    (0..n * d)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            (state >> 11) as f64 / (1u64 << 53) as f64
        })
        .collect()
}

fn bench_pca(c: &mut Criterion) {
    let mut group = c.benchmark_group("pca");

    let tall = random_flat(500, 20, 42);
    let config = PcaConfig { n_components: 2 };
    group.bench_function("500x20_covariance", |b| {
        b.iter(|| pca(black_box(&tall), 20, &config))
    });

    let wide = random_flat(12, 2_000, 42);
    group.bench_function("12x2000_gram", |b| {
        b.iter(|| pca(black_box(&wide), 2_000, &config))
    });

    let small = random_flat(150, 4, 7);
    group.bench_function("kernel_150x4", |b| {
        b.iter(|| kernel_pca(black_box(&small), 4, 2, &KernelPcaConfig::default()))
    });

    group.finish();
}

fn bench_lda(c: &mut Criterion) {
    let data = random_flat(150, 4, 11);
    let labels: Vec<String> = (0..150).map(|i| format!("class{}", i % 3)).collect();
    c.bench_function("lda_150x4_3cls", |b| {
        b.iter(|| lda(black_box(&data), 4, &labels, &LdaConfig::default()))
    });
}

fn bench_embeddings(c: &mut Criterion) {
    let mut group = c.benchmark_group("embedding");
    group.sample_size(10);

    let data = random_flat(150, 4, 3);
    let tsne_config = TsneConfig {
        n_iter: 250,
        ..Default::default()
    };
    group.bench_function("tsne_150x4", |b| {
        b.iter(|| tsne(black_box(&data), 4, &tsne_config))
    });

    let umap_config = UmapConfig::default();
    group.bench_function("umap_150x4", |b| {
        b.iter(|| umap(black_box(&data), 4, &umap_config))
    });

    group.finish();
}

criterion_group!(benches, bench_pca, bench_lda, bench_embeddings);
criterion_main!(benches);
