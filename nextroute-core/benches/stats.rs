use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use nextroute_core::{RelayId, RelayStatsPing, RelayStatsUpdate, StatsStore};
use rand_chacha::ChaChaRng;
use rand_core::{Rng as _, SeedableRng as _};

const FLEET_SIZES: [u64; 3] = [16, 64, 256];
const MAX_JITTER: f32 = 10.0;
const MAX_PACKET_LOSS: f32 = 1.0;

fn update(rng: &mut ChaChaRng, source: u64, fleet_size: u64) -> RelayStatsUpdate {
    let ping_stats = (1..=fleet_size)
        .filter(|destination| *destination != source)
        .map(|destination| {
            RelayStatsPing::new(
                RelayId::new(destination),
                (rng.next_u32() % 200) as f32,
                (rng.next_u32() % 20) as f32,
                (rng.next_u32() % 3) as f32,
            )
        })
        .collect();

    RelayStatsUpdate {
        id: RelayId::new(source),
        ping_stats,
    }
}

fn populated_store(rng: &mut ChaChaRng, fleet_size: u64) -> StatsStore {
    let store = StatsStore::new();
    for source in 1..=fleet_size {
        store.process_stats(&update(rng, source, fleet_size));
    }
    store
}

fn process_stats(c: &mut Criterion) {
    let mut group = c.benchmark_group("stats::process_stats");
    let mut rng = ChaChaRng::seed_from_u64(42);

    for fleet_size in FLEET_SIZES {
        let store = populated_store(&mut rng, fleet_size);
        let update = update(&mut rng, 1, fleet_size);

        group.bench_function(BenchmarkId::from_parameter(fleet_size), |b| {
            b.iter(|| store.process_stats(black_box(&update)))
        });
    }

    group.finish();
}

fn get_costs(c: &mut Criterion) {
    let mut group = c.benchmark_group("stats::get_costs");
    let mut rng = ChaChaRng::seed_from_u64(42);

    for fleet_size in FLEET_SIZES {
        let store = populated_store(&mut rng, fleet_size);
        let relay_ids: Vec<_> = (1..=fleet_size).map(RelayId::new).collect();

        group.bench_function(BenchmarkId::from_parameter(fleet_size), |b| {
            b.iter(|| store.get_costs(black_box(&relay_ids), MAX_JITTER, MAX_PACKET_LOSS))
        });
    }

    group.finish();
}

fn extract_ping_stats(c: &mut Criterion) {
    let mut group = c.benchmark_group("stats::extract_ping_stats");
    let mut rng = ChaChaRng::seed_from_u64(42);

    for fleet_size in FLEET_SIZES {
        let store = populated_store(&mut rng, fleet_size);

        group.bench_function(BenchmarkId::from_parameter(fleet_size), |b| {
            b.iter(|| store.extract_ping_stats(MAX_JITTER, MAX_PACKET_LOSS, "bench", false))
        });
    }

    group.finish();
}

criterion_group!(benches, process_stats, get_costs, extract_ping_stats);
criterion_main!(benches);
