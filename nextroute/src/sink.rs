use crate::config::SinkKind;
use nextroute_core::PingStatsEntry;

/// Destination of the ping statistics extracted from the stats store
#[derive(Debug, Clone, PartialEq)]
pub enum PingStatsSink {
    Discard,
    /// Keeps every published entry in memory.
    Local(Vec<PingStatsEntry>),
    /// One `tracing` event per published batch.
    Log,
}

impl PingStatsSink {
    pub fn from_kind(kind: SinkKind) -> Self {
        match kind {
            SinkKind::Discard => Self::Discard,
            SinkKind::Local => Self::Local(Vec::new()),
            SinkKind::Log => Self::Log,
        }
    }

    /// Publishes a batch taken at `timestamp` (seconds since the unix
    /// epoch), returns the number of entries accepted.
    pub fn publish(&mut self, timestamp: u64, batch: Vec<PingStatsEntry>) -> usize {
        match self {
            Self::Discard => 0,
            Self::Local(entries) => {
                let accepted = batch.len();
                entries.extend(batch);
                accepted
            }
            Self::Log => {
                let routable = batch.iter().filter(|entry| entry.routable).count();
                tracing::info!(
                    timestamp,
                    entries = batch.len(),
                    routable,
                    "ping statistics published"
                );
                batch.len()
            }
        }
    }

    /// Entries kept by a [`PingStatsSink::Local`] sink.
    pub fn entries(&self) -> &[PingStatsEntry] {
        match self {
            Self::Local(entries) => entries,
            Self::Discard | Self::Log => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nextroute_core::RelayId;

    fn entry(routable: bool) -> PingStatsEntry {
        PingStatsEntry {
            relay_a: RelayId::new(1),
            relay_b: RelayId::new(2),
            rtt: 20.0,
            jitter: 1.0,
            packet_loss: 0.0,
            routable,
            instance_id: "test".to_string(),
            debug: false,
        }
    }

    #[test]
    fn discard() {
        let mut sink = PingStatsSink::from_kind(SinkKind::Discard);
        assert_eq!(sink.publish(0, vec![entry(true)]), 0);
        assert!(sink.entries().is_empty());
    }

    #[test]
    fn local() {
        let mut sink = PingStatsSink::from_kind(SinkKind::Local);
        assert_eq!(sink.publish(0, vec![entry(true), entry(false)]), 2);
        assert_eq!(sink.publish(1, vec![entry(true)]), 1);
        assert_eq!(sink.entries().len(), 3);
        assert!(!sink.entries()[1].routable);
    }

    #[test]
    fn log() {
        let mut sink = PingStatsSink::from_kind(SinkKind::Log);
        assert_eq!(sink.publish(0, vec![entry(true)]), 1);
        assert!(sink.entries().is_empty());
    }
}
