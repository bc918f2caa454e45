use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use nextroute_core::{NearRelayPolicy, Relay, RelayId, Topology, geo::Location};
use rand_chacha::ChaChaRng;
use rand_core::{Rng as _, SeedableRng as _};

const FLEET_SIZES: [u64; 3] = [32, 256, 1024];
const MAX_NEAR_RELAYS: usize = 32;

fn location(latitude: f64, longitude: f64) -> Location {
    Location::from_degrees(latitude, longitude).expect("benchmark coordinate must be valid")
}

fn random_topology(rng: &mut ChaChaRng, size: u64) -> Topology {
    let relays = (1..=size)
        .map(|id| {
            let latitude = (rng.next_u32() % 180) as f32 - 90.0;
            let longitude = (rng.next_u32() % 360) as f32 - 180.0;
            let address = format!("10.0.{}.{}:40000", id / 256, id % 256)
                .parse()
                .expect("benchmark address must be valid");
            Relay::new(RelayId::new(id), address, format!("relay.{id}"))
                .with_location(latitude, longitude)
                .with_datacenter(id)
        })
        .collect();
    Topology::new(relays).expect("benchmark relays are unique")
}

fn near_relays(c: &mut Criterion) {
    let mut group = c.benchmark_group("near::near_relays");
    let mut rng = ChaChaRng::seed_from_u64(42);
    let policy = NearRelayPolicy::default();

    // Los Angeles <-> New York
    let source = location(34.0522, -118.2437);
    let destination = location(40.7128, -74.0060);

    for fleet_size in FLEET_SIZES {
        let topology = random_topology(&mut rng, fleet_size);

        group.bench_function(BenchmarkId::new("known_latency", fleet_size), |b| {
            b.iter(|| {
                policy.near_relays(
                    black_box(&topology),
                    black_box(80.0),
                    source,
                    destination,
                    MAX_NEAR_RELAYS,
                )
            })
        });
        group.bench_function(BenchmarkId::new("estimated_latency", fleet_size), |b| {
            b.iter(|| {
                policy.near_relays(
                    black_box(&topology),
                    black_box(0.0),
                    source,
                    destination,
                    MAX_NEAR_RELAYS,
                )
            })
        });
    }

    group.finish();
}

criterion_group!(benches, near_relays);
criterion_main!(benches);
