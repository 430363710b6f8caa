use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::time::Duration;
use unordered_map::{GrowthPolicy, Handle, UnorderedMap};

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

fn filled(seed: u64, n: usize) -> (UnorderedMap<String, u64>, Vec<Handle>) {
    let mut m = UnorderedMap::new();
    let handles = lcg(seed)
        .take(n)
        .enumerate()
        .map(|(i, x)| m.insert(key(x), i as u64).0)
        .collect();
    (m, handles)
}

fn bench_insert_fresh_100k(c: &mut Criterion) {
    c.bench_function("unordered::insert_fresh_100k", |b| {
        b.iter_batched(
            UnorderedMap::<String, u64>::new,
            |mut m| {
                for (i, x) in lcg(1).take(100_000).enumerate() {
                    let _ = m.insert(key(x), i as u64);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("unordered::insert_fresh_100k_doubling", |b| {
        b.iter_batched(
            || {
                let mut m = UnorderedMap::<String, u64>::new();
                m.set_growth_policy(GrowthPolicy::Doubling);
                m
            },
            |mut m| {
                for (i, x) in lcg(1).take(100_000).enumerate() {
                    let _ = m.insert(key(x), i as u64);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_insert_reserved_100k(c: &mut Criterion) {
    c.bench_function("unordered::insert_reserved_100k", |b| {
        b.iter_batched(
            || {
                let mut m = UnorderedMap::<String, u64>::new();
                m.reserve(100_000);
                m
            },
            |mut m| {
                for (i, x) in lcg(3).take(100_000).enumerate() {
                    let _ = m.insert(key(x), i as u64);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_erase_random_10k(c: &mut Criterion) {
    c.bench_function("unordered::erase_random_10k_of_110k", |b| {
        b.iter_batched(
            || {
                let (m, handles) = filled(5, 110_000);
                // Precompute 10k unique indices via LCG
                let n = handles.len();
                let mut sel = std::collections::HashSet::with_capacity(10_000);
                let mut s = 0x9e3779b97f4a7c15u64;
                while sel.len() < 10_000 {
                    s = s.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
                    sel.insert((s as usize) % n);
                }
                let to_erase: Vec<Handle> = sel.into_iter().map(|i| handles[i]).collect();
                (m, to_erase)
            },
            |(mut m, to_erase)| {
                for h in to_erase {
                    let _ = m.erase(h);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_find_hit_10k(c: &mut Criterion) {
    c.bench_function("unordered::find_hit_10k_on_100k", |b| {
        let mut m = UnorderedMap::new();
        let keys: Vec<_> = lcg(7).take(100_000).map(key).collect();
        for (i, k) in keys.iter().enumerate() {
            let _ = m.insert(k.clone(), i as u64);
        }
        let n = keys.len();
        let mut s = 0x9e3779b97f4a7c15u64;
        let queries: Vec<String> = (0..10_000)
            .map(|_| {
                s = s.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
                keys[(s as usize) % n].clone()
            })
            .collect();
        b.iter(|| {
            for k in &queries {
                black_box(m.find(k));
            }
        })
    });
}

fn bench_find_miss_10k(c: &mut Criterion) {
    c.bench_function("unordered::find_miss_10k_on_100k", |b| {
        let (m, _) = filled(11, 100_000);
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            for _ in 0..10_000 {
                if let Some(x) = miss.next() {
                    black_box(m.find(&key(x)));
                }
            }
        })
    });
}

fn bench_rehash_100k(c: &mut Criterion) {
    c.bench_function("unordered::rehash_100k_entries", |b| {
        b.iter_batched(
            || filled(13, 100_000).0,
            |mut m| {
                let target = m.bucket_count() * 2;
                m.rehash(target);
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_iter_and_iter_mut(c: &mut Criterion) {
    c.bench_function("unordered::iter_all_100k", |b| {
        let (m, _) = filled(999, 100_000);
        b.iter(|| {
            let mut sum = 0u64;
            for (_k, v) in m.iter() {
                sum = sum.wrapping_add(*v);
            }
            black_box(sum)
        })
    });

    c.bench_function("unordered::iter_mut_increment_all_100k", |b| {
        b.iter_batched(
            || filled(1001, 100_000).0,
            |mut m| {
                for v in m.values_mut() {
                    *v = v.wrapping_add(1);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_clone_100k(c: &mut Criterion) {
    c.bench_function("unordered::clone_100k", |b| {
        let (m, _) = filled(77, 100_000);
        b.iter(|| black_box(m.clone()))
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(12)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches_insert;
    config = bench_config();
    targets = bench_insert_fresh_100k, bench_insert_reserved_100k
}
criterion_group! {
    name = benches_ops;
    config = bench_config();
    targets = bench_erase_random_10k,
              bench_find_hit_10k,
              bench_find_miss_10k,
              bench_rehash_100k,
              bench_iter_and_iter_mut,
              bench_clone_100k
}
criterion_main!(benches_insert, benches_ops);
