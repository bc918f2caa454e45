use crate::{config::BackendConfig, sink::PingStatsSink};
use anyhow::{Context as _, Result, anyhow, bail};
use bytes::Bytes;
use nextroute_core::{
    CostMatrix, NearRelay, Relay, RelayId, RelayStatsUpdate, RouteMatrix, StatsStore, Topology,
    geo::Location,
};
use std::{
    io::Read,
    sync::{Arc, Mutex, RwLock},
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::{info, warn};

/// Seconds since the unix epoch.
pub fn unix_now() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("System clock is set before the unix epoch")?
        .as_secs())
}

/// The state shared by the relay facing and the server facing sides of the
/// backend
///
/// Relay updates feed the stats store. Cost matrices are built from the
/// stats store and handed to the route optimizer, whose route matrices
/// come back through [`publish_route_matrix`] or [`load_route_matrix`] and
/// are then served to every reader from their response cache.
///
/// [`publish_route_matrix`]: RelayBackend::publish_route_matrix
/// [`load_route_matrix`]: RelayBackend::load_route_matrix
#[derive(Debug)]
pub struct RelayBackend {
    config: BackendConfig,
    stats: StatsStore,
    sink: Mutex<PingStatsSink>,
    route_matrix: RwLock<Option<Arc<RouteMatrix>>>,
}

impl RelayBackend {
    pub fn new(config: BackendConfig) -> Self {
        let stats = StatsStore::with_shards(config.stats_shards);
        let sink = Mutex::new(PingStatsSink::from_kind(config.sink));
        Self {
            config,
            stats,
            sink,
            route_matrix: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn stats(&self) -> &StatsStore {
        &self.stats
    }

    pub fn process_relay_update(&self, update: &RelayStatsUpdate) {
        self.stats.process_stats(update);
    }

    /// Forgets the statistics reported by `relay`.
    pub fn remove_relay(&self, relay: RelayId) -> bool {
        self.stats.delete_entry(relay)
    }

    /// Builds the cost matrix of `relays`, ordered by relay id, from the
    /// current statistics.
    pub fn build_cost_matrix(&self, mut relays: Vec<Relay>, created_at: u64) -> Result<CostMatrix> {
        relays.sort_by_key(|relay| relay.id);
        let topology = Topology::new(relays).context("Failed to build the cost matrix topology")?;

        let relay_ids: Vec<_> = topology.relay_ids().collect();
        let costs = self.stats.get_costs(
            &relay_ids,
            self.config.max_jitter,
            self.config.max_packet_loss,
        );
        let routable = costs.iter().filter(|cost| **cost >= 0).count();

        let matrix = CostMatrix::new(topology, costs, created_at)?;
        matrix
            .write_response_data()
            .context("Failed to encode the cost matrix")?;

        info!(
            relays = relay_ids.len(),
            routable_pairs = routable,
            bytes = matrix.response_data().len(),
            "cost matrix built"
        );
        Ok(matrix)
    }

    /// Makes `matrix` the route matrix served to readers.
    pub fn publish_route_matrix(&self, matrix: RouteMatrix) -> Result<Arc<RouteMatrix>> {
        matrix
            .write_response_data()
            .context("Failed to encode the route matrix")?;
        matrix.write_analysis_data();

        let matrix = Arc::new(matrix);
        *self
            .route_matrix
            .write()
            .map_err(|error| anyhow!("Failed to lock on the route matrix: {error}"))? =
            Some(Arc::clone(&matrix));

        info!(
            relays = matrix.topology().len(),
            created_at = matrix.created_at(),
            bytes = matrix.response_data().len(),
            "route matrix published"
        );
        Ok(matrix)
    }

    /// Decodes a route matrix and publishes it, unless it is stale at `now`.
    pub fn load_route_matrix<R: Read>(&self, reader: R, now: u64) -> Result<Arc<RouteMatrix>> {
        let matrix = RouteMatrix::read_from(reader).map_err(|error| {
            warn!(%error, "failed to decode route matrix");
            anyhow!(error).context("Failed to decode the route matrix")
        })?;

        let stale = self.config.stale_duration;
        if matrix.is_stale(stale.into_duration(), now) {
            warn!(created_at = matrix.created_at(), now, %stale, "stale route matrix refused");
            bail!(
                "Route matrix created at {} is older than {stale}",
                matrix.created_at()
            );
        }

        self.publish_route_matrix(matrix)
    }

    pub fn route_matrix(&self) -> Result<Option<Arc<RouteMatrix>>> {
        Ok(self
            .route_matrix
            .read()
            .map_err(|error| anyhow!("Failed to lock on the route matrix: {error}"))?
            .clone())
    }

    /// Encoded bytes of the published route matrix, empty until one is
    /// published.
    pub fn route_matrix_response(&self) -> Result<Bytes> {
        Ok(self
            .route_matrix()?
            .map(|matrix| matrix.response_data())
            .unwrap_or_default())
    }

    /// Near relays of the published route matrix, with the configured
    /// policy.
    pub fn near_relays(
        &self,
        direct_latency_ms: f32,
        source: Location,
        destination: Location,
        max: usize,
    ) -> Result<Vec<NearRelay>> {
        let Some(matrix) = self.route_matrix()? else {
            return Ok(Vec::new());
        };
        Ok(self.config.near_relays.near_relays(
            matrix.topology(),
            direct_latency_ms,
            source,
            destination,
            max,
        ))
    }

    /// Extracts the statistics of every relay pair into the sink, returns
    /// the number of entries the sink accepted.
    pub fn publish_ping_stats(&self, timestamp: u64) -> Result<usize> {
        let entries = self.stats.extract_ping_stats(
            self.config.max_jitter,
            self.config.max_packet_loss,
            &self.config.instance_id,
            self.config.debug,
        );

        let accepted = self
            .sink
            .lock()
            .map_err(|error| anyhow!("Failed to lock on the ping stats sink: {error}"))?
            .publish(timestamp, entries);
        Ok(accepted)
    }

    /// Runs `f` on the ping stats sink.
    pub fn with_sink<T>(&self, f: impl FnOnce(&PingStatsSink) -> T) -> Result<T> {
        let sink = self
            .sink
            .lock()
            .map_err(|error| anyhow!("Failed to lock on the ping stats sink: {error}"))?;
        Ok(f(&sink))
    }
}
