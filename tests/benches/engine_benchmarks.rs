//! # Deployment Engine Benchmarks
//!
//! | Area | Operation | Expectation |
//! |------|-----------|-------------|
//! | Domain | resolve_pointers | linear in entity pointers |
//! | Engine | deploy, disjoint pointers | constant per deployment |
//! | Engine | deploy, contested pointer | constant per deployment |
//! | Engine | active_entity_ids | cache hit after first read |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use cs_02_deployments::{resolve_pointers, Claim, EntityType, ExistingClaim};
use cs_tests::fixtures::{audit, engine, pointers, scene};
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};
use std::collections::BTreeMap;
use std::time::Duration;

fn parcel(i: usize) -> String {
    format!("{},{}", i / 100, i % 100)
}

fn bench_resolve_pointers(c: &mut Criterion) {
    let mut group = c.benchmark_group("domain-resolve-pointers");

    for size in [1usize, 16, 64, 256] {
        let parcels: Vec<String> = (0..size).map(parcel).collect();
        let refs: Vec<&str> = parcels.iter().map(String::as_str).collect();
        let entity = scene("bafy-new", &refs, 10);

        // half the pointers held by one older scene, the rest unclaimed
        let older = ExistingClaim {
            deployment_id: 1,
            entity_id: "bafy-old".to_string(),
            timestamp: 5,
            pointers: parcels.iter().take(size / 2 + 1).cloned().collect(),
            deleted: false,
        };
        let claims: BTreeMap<_, _> = parcels
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let claim = if i <= size / 2 {
                    Claim::Existing(older.clone())
                } else {
                    Claim::Unclaimed
                };
                (p.clone(), claim)
            })
            .collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("resolve", size), &size, |b, _| {
            b.iter(|| black_box(resolve_pointers(&entity, &claims)))
        });
    }

    group.finish();
}

fn bench_deploy(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine-deploy");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("disjoint_pointers", |b| {
        let (engine, clock) = engine();
        let mut i = 0usize;
        b.iter(|| {
            i += 1;
            clock.advance(1);
            let entity = scene(&format!("bafy-{}", i), &[parcel(i).as_str()], i as u64);
            black_box(engine.deploy(&entity, &audit()).is_ok())
        })
    });

    group.bench_function("contested_pointer", |b| {
        let (engine, clock) = engine();
        let mut i = 0usize;
        b.iter(|| {
            i += 1;
            clock.advance(1);
            let entity = scene(&format!("bafy-{}", i), &["0,0", "0,1"], i as u64);
            black_box(engine.deploy(&entity, &audit()).is_ok())
        })
    });

    group.bench_function("shuffled_arrivals_100", |b| {
        let mut rng = StdRng::seed_from_u64(7);
        let mut entities: Vec<_> = (0..100)
            .map(|i| scene(&format!("bafy-{}", i), &[parcel(i % 10).as_str()], i as u64))
            .collect();
        b.iter(|| {
            entities.shuffle(&mut rng);
            let (engine, clock) = engine();
            for entity in &entities {
                clock.advance(1);
                black_box(engine.deploy(entity, &audit()).is_ok());
            }
        })
    });

    group.finish();
}

fn bench_active_entity_ids(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine-active-entities");

    let (engine, clock) = engine();
    let parcels: Vec<String> = (0..1_000).map(parcel).collect();
    for (i, p) in parcels.iter().enumerate() {
        clock.advance(1);
        let _ = engine.deploy(&scene(&format!("bafy-{}", i), &[p.as_str()], 1), &audit());
    }
    let refs: Vec<&str> = parcels.iter().take(100).map(String::as_str).collect();
    let query = pointers(&refs);

    group.throughput(Throughput::Elements(query.len() as u64));
    group.bench_function("lookup_100", |b| {
        b.iter(|| black_box(engine.active_entity_ids(EntityType::Scene, &query).is_ok()))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_resolve_pointers,
    bench_deploy,
    bench_active_entity_ids,
);

criterion_main!(benches);
