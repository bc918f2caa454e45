use super::{RelayStatsPing, Sample};
use crate::defaults::{HISTORY_SIZE, INVALID_ROUTE_VALUE};

/// Value of a history slot that never received a measurement.
///
/// Measurements are never negative so an unset slot never wins the
/// maximum.
const HISTORY_UNSET: f32 = -1.0;

/// Fixed window of the last [`HISTORY_SIZE`] values of one metric
#[derive(Debug, Clone, PartialEq)]
pub struct History(Box<[f32; HISTORY_SIZE]>);

impl History {
    fn new() -> Self {
        Self(Box::new([HISTORY_UNSET; HISTORY_SIZE]))
    }

    #[inline]
    fn set(&mut self, cursor: usize, value: f32) {
        self.0[cursor] = value;
    }

    /// Largest value of the window, `0.0` if nothing was recorded.
    pub fn max(&self) -> f32 {
        self.0.iter().copied().fold(0.0, f32::max)
    }

    pub fn as_slice(&self) -> &[f32] {
        self.0.as_slice()
    }
}

/// Statistics of one directed relay pair
///
/// The reported metrics are the worst values seen over the last
/// [`HISTORY_SIZE`] slots of the window.
///
/// A pair created with [`PairStats::seeded`] starts with the invalid
/// value in its first slot: it reports [`Sample::INVALID`] until that
/// slot leaves the window, [`HISTORY_SIZE`] observations later.
///
/// ```
/// # use nextroute_core::{stats::PairStats, RelayId, RelayStatsPing};
/// let mut stats = PairStats::new();
/// stats.observe(&RelayStatsPing::new(RelayId::ONE, 40.0, 2.0, 0.0));
/// stats.observe(&RelayStatsPing::new(RelayId::ONE, 30.0, 5.0, 0.0));
///
/// let sample = stats.sample();
/// assert_eq!(sample.rtt, 40.0);
/// assert_eq!(sample.jitter, 5.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PairStats {
    sample: Sample,
    cursor: usize,
    observations: u64,
    rtt_history: History,
    jitter_history: History,
    packet_loss_history: History,
}

impl PairStats {
    pub fn new() -> Self {
        Self {
            sample: Sample {
                rtt: 0.0,
                jitter: 0.0,
                packet_loss: 0.0,
            },
            cursor: 0,
            observations: 0,
            rtt_history: History::new(),
            jitter_history: History::new(),
            packet_loss_history: History::new(),
        }
    }

    /// Statistics of a pair seen for the first time.
    ///
    /// The first slot holds the invalid value instead of a measurement,
    /// so a new link is not routed before a full window of observations.
    ///
    /// ```
    /// # use nextroute_core::{stats::PairStats, defaults::HISTORY_SIZE, RelayId, RelayStatsPing, Sample};
    /// let mut stats = PairStats::seeded();
    /// let ping = RelayStatsPing::new(RelayId::ONE, 20.0, 1.0, 0.0);
    ///
    /// for _ in 1..HISTORY_SIZE {
    ///     stats.observe(&ping);
    /// }
    /// assert_eq!(stats.sample(), Sample::INVALID);
    ///
    /// stats.observe(&ping);
    /// assert_eq!(stats.sample().rtt, 20.0);
    /// ```
    pub fn seeded() -> Self {
        let mut stats = Self::new();
        stats.record(INVALID_ROUTE_VALUE, INVALID_ROUTE_VALUE, INVALID_ROUTE_VALUE);
        stats
    }

    /// Records `ping` in the slot under the cursor, advances the cursor
    /// and recomputes the worst values of the window.
    pub fn observe(&mut self, ping: &RelayStatsPing) {
        self.record(ping.rtt, ping.jitter, ping.packet_loss);
        self.observations = self.observations.saturating_add(1);
    }

    fn record(&mut self, rtt: f32, jitter: f32, packet_loss: f32) {
        self.rtt_history.set(self.cursor, rtt);
        self.jitter_history.set(self.cursor, jitter);
        self.packet_loss_history.set(self.cursor, packet_loss);

        self.cursor = (self.cursor + 1) % HISTORY_SIZE;

        self.sample = Sample {
            rtt: self.rtt_history.max(),
            jitter: self.jitter_history.max(),
            packet_loss: self.packet_loss_history.max(),
        };
    }

    pub fn sample(&self) -> Sample {
        self.sample
    }

    /// Number of measurements recorded, the seed is not one.
    pub fn observations(&self) -> u64 {
        self.observations
    }

    pub fn rtt_history(&self) -> &History {
        &self.rtt_history
    }

    pub fn jitter_history(&self) -> &History {
        &self.jitter_history
    }

    pub fn packet_loss_history(&self) -> &History {
        &self.packet_loss_history
    }
}

impl Default for PairStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::RelayId;
    use rand_chacha::ChaChaRng;
    use rand_core::{Rng as _, SeedableRng as _};

    fn random_ping(rng: &mut ChaChaRng) -> RelayStatsPing {
        let rtt = (rng.next_u32() % 200_000) as f32 / 1_000.0;
        let jitter = (rng.next_u32() % 20_000) as f32 / 1_000.0;
        let packet_loss = (rng.next_u32() % 1_000) as f32 / 10.0;
        RelayStatsPing::new(RelayId::ONE, rtt, jitter, packet_loss)
    }

    #[test]
    fn new_pair_is_empty() {
        let stats = PairStats::new();
        assert_eq!(stats.observations(), 0);
        assert!(stats.rtt_history().as_slice().iter().all(|v| *v == HISTORY_UNSET));
        assert_eq!(stats.rtt_history().max(), 0.0);
    }

    #[test]
    fn worst_of_partial_window() {
        let mut rng = ChaChaRng::seed_from_u64(42);
        let mut stats = PairStats::new();
        let mut fed = Vec::new();

        for _ in 0..HISTORY_SIZE {
            let ping = random_ping(&mut rng);
            stats.observe(&ping);
            fed.push(ping);

            let expected = fed.iter().map(|p| p.rtt).fold(0.0, f32::max);
            assert_eq!(stats.sample().rtt, expected);
            let expected = fed.iter().map(|p| p.jitter).fold(0.0, f32::max);
            assert_eq!(stats.sample().jitter, expected);
            let expected = fed.iter().map(|p| p.packet_loss).fold(0.0, f32::max);
            assert_eq!(stats.sample().packet_loss, expected);
        }
    }

    #[test]
    fn worst_of_sliding_window() {
        let mut rng = ChaChaRng::seed_from_u64(42);
        let mut stats = PairStats::seeded();
        let seed = RelayStatsPing::new(
            RelayId::ONE,
            INVALID_ROUTE_VALUE,
            INVALID_ROUTE_VALUE,
            INVALID_ROUTE_VALUE,
        );
        let mut fed = vec![seed];

        for _ in 0..(HISTORY_SIZE * 3 + 17) {
            let ping = random_ping(&mut rng);
            stats.observe(&ping);
            fed.push(ping);

            let window = &fed[fed.len().saturating_sub(HISTORY_SIZE)..];
            let expected = window.iter().map(|p| p.rtt).fold(0.0, f32::max);
            assert_eq!(stats.sample().rtt, expected);
            let expected = window.iter().map(|p| p.jitter).fold(0.0, f32::max);
            assert_eq!(stats.sample().jitter, expected);
            let expected = window.iter().map(|p| p.packet_loss).fold(0.0, f32::max);
            assert_eq!(stats.sample().packet_loss, expected);
        }
    }

    #[test]
    fn seed_expires_after_a_full_window() {
        let mut stats = PairStats::seeded();
        assert_eq!(stats.sample(), Sample::INVALID);
        assert_eq!(stats.observations(), 0);

        for _ in 1..HISTORY_SIZE {
            stats.observe(&RelayStatsPing::new(RelayId::ONE, 20.0, 1.0, 0.5));
            assert_eq!(stats.sample(), Sample::INVALID);
        }

        stats.observe(&RelayStatsPing::new(RelayId::ONE, 20.0, 1.0, 0.5));
        assert_eq!(
            stats.sample(),
            Sample {
                rtt: 20.0,
                jitter: 1.0,
                packet_loss: 0.5,
            }
        );
        assert_eq!(stats.observations(), HISTORY_SIZE as u64);
    }

    #[test]
    fn spike_expires_after_a_full_window() {
        let mut stats = PairStats::new();

        stats.observe(&RelayStatsPing::new(RelayId::ONE, 500.0, 0.0, 0.0));
        for _ in 0..HISTORY_SIZE - 1 {
            stats.observe(&RelayStatsPing::new(RelayId::ONE, 20.0, 0.0, 0.0));
        }
        assert_eq!(stats.sample().rtt, 500.0);

        stats.observe(&RelayStatsPing::new(RelayId::ONE, 20.0, 0.0, 0.0));
        assert_eq!(stats.sample().rtt, 20.0);
    }
}
