use super::{PairStats, PingStatsEntry, RelayStatsUpdate, Sample};
use crate::{
    defaults::NO_ROUTE_COST,
    pair::{pairs, tri_matrix_index, tri_matrix_length},
    relay::RelayId,
};
use std::{
    collections::{HashMap, hash_map::Entry},
    sync::{Mutex, MutexGuard, PoisonError},
};
use tracing::debug;

/// destination relay -> statistics of the directed pair
type StatsEntry = HashMap<RelayId, PairStats>;
/// source relay -> its entry
type Shard = HashMap<RelayId, StatsEntry>;

/// Concurrent store of directed relay pair statistics
///
/// Entries are sharded by source relay so that updates coming from
/// different relays rarely contend. An update from one relay is applied
/// under a single lock: readers never observe half of it.
///
/// ```
/// # use nextroute_core::{RelayId, RelayStatsPing, RelayStatsUpdate, StatsStore, Sample};
/// # use nextroute_core::defaults::HISTORY_SIZE;
/// let store = StatsStore::new();
/// let a = RelayId::new(1);
/// let b = RelayId::new(2);
/// let report = |from, to, rtt| {
///     store.process_stats(&RelayStatsUpdate {
///         id: from,
///         ping_stats: vec![RelayStatsPing::new(to, rtt, 1.0, 0.0)],
///     })
/// };
///
/// report(a, b, 20.0);
/// report(b, a, 25.0);
/// // new pairs are seeded with the invalid value
/// assert_eq!(store.get_sample(a, b), Sample::INVALID);
///
/// for _ in 0..HISTORY_SIZE {
///     report(a, b, 20.0);
///     report(b, a, 25.0);
/// }
/// assert_eq!(store.get_sample(a, b).rtt, 25.0);
/// ```
#[derive(Debug)]
pub struct StatsStore {
    shards: Box<[Mutex<Shard>]>,
}

impl StatsStore {
    pub const DEFAULT_SHARDS: usize = 16;

    pub fn new() -> Self {
        Self::with_shards(Self::DEFAULT_SHARDS)
    }

    /// Creates a store split in `shards` independently locked parts.
    ///
    /// A value of `0` is treated as `1`.
    pub fn with_shards(shards: usize) -> Self {
        let shards = (0..shards.max(1))
            .map(|_| Mutex::new(Shard::new()))
            .collect();
        Self { shards }
    }

    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    fn shard_of(&self, id: RelayId) -> usize {
        (id.into_u64() % self.shards.len() as u64) as usize
    }

    // every critical section leaves the maps consistent, a poisoned
    // lock is still safe to use
    fn lock(&self, id: RelayId) -> MutexGuard<'_, Shard> {
        self.shards[self.shard_of(id)]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_all(&self) -> Vec<MutexGuard<'_, Shard>> {
        self.shards
            .iter()
            .map(|shard| shard.lock().unwrap_or_else(PoisonError::into_inner))
            .collect()
    }

    /// Records every measurement of `update`, in order.
    ///
    /// A destination seen for the first time is seeded with the invalid
    /// value and its measurement dropped: the pair only becomes usable once
    /// the seed leaves its window.
    pub fn process_stats(&self, update: &RelayStatsUpdate) {
        let source = update.id;
        let mut shard = self.lock(source);

        let entry = shard.entry(source).or_insert_with(|| {
            debug!(relay = %source, "new source relay");
            StatsEntry::new()
        });

        for ping in &update.ping_stats {
            match entry.entry(ping.relay_id) {
                Entry::Occupied(mut pair) => pair.get_mut().observe(ping),
                // the first measurement of a pair is not trusted
                Entry::Vacant(pair) => {
                    debug!(source = %source, destination = %ping.relay_id, "new relay pair");
                    pair.insert(PairStats::seeded());
                }
            }
        }
    }

    fn directed_sample(&self, from: RelayId, to: RelayId) -> Option<Sample> {
        self.lock(from)
            .get(&from)
            .and_then(|entry| entry.get(&to))
            .map(PairStats::sample)
    }

    /// Copy of the statistics measured by `from` towards `to`.
    pub fn get_entry(&self, from: RelayId, to: RelayId) -> Option<PairStats> {
        self.lock(from)
            .get(&from)
            .and_then(|entry| entry.get(&to))
            .cloned()
    }

    /// Worst of both directions of the pair `(a, b)`.
    ///
    /// Returns [`Sample::INVALID`] unless both directions were observed.
    pub fn get_sample(&self, a: RelayId, b: RelayId) -> Sample {
        match (self.directed_sample(a, b), self.directed_sample(b, a)) {
            (Some(ab), Some(ba)) => ab.worst(ba),
            _ => Sample::INVALID,
        }
    }

    /// Triangular cost array for `relay_ids`, indexed like the slice.
    ///
    /// The cost of a pair is its round trip time rounded up, or
    /// [`NO_ROUTE_COST`] when the pair is not [routable](Sample::is_routable):
    /// no valid round trip time below
    /// [`INVALID_ROUTE_VALUE`](crate::defaults::INVALID_ROUTE_VALUE), or jitter or
    /// packet loss above the thresholds.
    pub fn get_costs(&self, relay_ids: &[RelayId], max_jitter: f32, max_packet_loss: f32) -> Vec<i32> {
        let mut costs = vec![NO_ROUTE_COST; tri_matrix_length(relay_ids.len())];

        for (i, j) in pairs(relay_ids.len()) {
            let sample = self.get_sample(relay_ids[i], relay_ids[j]);

            if sample.is_routable(max_jitter, max_packet_loss) {
                costs[tri_matrix_index(i, j)] = sample.rtt.ceil() as i32;
            }
        }

        costs
    }

    /// One entry per unordered pair of source relays, in triangular order
    /// of the ascending source relay ids.
    ///
    /// The entries are computed from a consistent copy of the store.
    pub fn extract_ping_stats(
        &self,
        max_jitter: f32,
        max_packet_loss: f32,
        instance_id: &str,
        debug: bool,
    ) -> Vec<PingStatsEntry> {
        let snapshot = self.make_copy();
        let ids = snapshot.source_ids();

        let mut entries = Vec::with_capacity(tri_matrix_length(ids.len()));
        for (i, j) in pairs(ids.len()) {
            let sample = snapshot.get_sample(ids[i], ids[j]);

            entries.push(PingStatsEntry {
                relay_a: ids[i],
                relay_b: ids[j],
                rtt: sample.rtt,
                jitter: sample.jitter,
                packet_loss: sample.packet_loss,
                routable: sample.is_routable(max_jitter, max_packet_loss),
                instance_id: instance_id.to_owned(),
                debug,
            });
        }

        entries
    }

    /// Sorted ids of every relay that reported statistics.
    pub fn source_ids(&self) -> Vec<RelayId> {
        let mut ids: Vec<RelayId> = self
            .lock_all()
            .iter()
            .flat_map(|shard| shard.keys().copied().collect::<Vec<_>>())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Removes everything `relay_id` reported. Returns `false` if the relay
    /// was unknown.
    pub fn delete_entry(&self, relay_id: RelayId) -> bool {
        let removed = self.lock(relay_id).remove(&relay_id).is_some();
        if removed {
            debug!(relay = %relay_id, "relay removed from stats store");
        }
        removed
    }

    /// Deep copy of the store.
    ///
    /// All the shards are locked for the duration of the copy so the
    /// copy never holds half of an update.
    pub fn make_copy(&self) -> Self {
        let shards = self
            .lock_all()
            .iter()
            .map(|shard| Mutex::new(Shard::clone(shard)))
            .collect();
        Self { shards }
    }

    /// Number of relays that reported statistics.
    pub fn len(&self) -> usize {
        self.lock_all().iter().map(|shard| shard.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for StatsStore {
    fn default() -> Self {
        Self::new()
    }
}
