use super::RouteEntry;
use crate::pair::{pairs, tri_matrix_index};
use serde::Serialize;
use std::fmt;

/// Number of 5ms wide improvement buckets, the last one is open ended.
pub const IMPROVEMENT_BUCKETS: usize = 11;
const BUCKET_WIDTH_MS: i32 = 5;

/// Diagnostic summary of a [`RouteMatrix`]
///
/// Only the relay pairs where at least one of the relays is a destination
/// relay are counted. Averages and percentages of an empty matrix are
/// reported as `0`.
///
/// [`RouteMatrix`]: super::RouteMatrix
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixAnalysis {
    /// pairs whose best route is not cheaper than the direct route
    pub rtt_improvement_none: u64,
    /// `[0-5ms], (5-10ms], ... (45-50ms], 50ms+` of improvement of the best
    /// route over the direct route
    pub rtt_improvement_buckets: [u64; IMPROVEMENT_BUCKETS],
    /// pairs with at least one route
    pub routed_relay_pairs: u64,

    pub relay_count: u64,
    pub total_routes: u64,
    pub relay_pairs: u64,
    pub destination_relays: u64,
    pub avg_routes_per_relay_pair: f64,
    pub max_routes_per_relay_pair: u64,
    pub avg_relays_per_route: f64,
    pub max_relays_per_route: u64,
    pub relay_pairs_with_one_route_percent: f64,
    pub relay_pairs_with_no_routes_percent: f64,
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn improvement_bucket(improvement: i32) -> usize {
    (((improvement - 1) / BUCKET_WIDTH_MS) as usize).min(IMPROVEMENT_BUCKETS - 1)
}

impl MatrixAnalysis {
    pub(crate) fn new(entries: &[RouteEntry], destination_relays: &[bool]) -> Self {
        let relay_count = destination_relays.len();
        let mut analysis = Self {
            relay_count: relay_count as u64,
            destination_relays: destination_relays.iter().filter(|d| **d).count() as u64,
            ..Self::default()
        };

        let mut pairs_with_one_route = 0;
        let mut pairs_with_no_route = 0;
        let mut total_route_length = 0;

        for (i, j) in pairs(relay_count) {
            if !destination_relays[i] && !destination_relays[j] {
                continue;
            }
            let Some(entry) = entries.get(tri_matrix_index(i, j)) else {
                continue;
            };
            analysis.relay_pairs += 1;

            let num_routes = entry.num_routes() as u64;
            analysis.total_routes += num_routes;
            analysis.max_routes_per_relay_pair = analysis.max_routes_per_relay_pair.max(num_routes);
            match num_routes {
                0 => pairs_with_no_route += 1,
                1 => pairs_with_one_route += 1,
                _ => {}
            }

            for route in entry.routes() {
                let length = route.relays.len() as u64;
                total_route_length += length;
                analysis.max_relays_per_route = analysis.max_relays_per_route.max(length);
            }

            if let Some(best) = entry.best_cost() {
                analysis.routed_relay_pairs += 1;
                let improvement = entry.direct_cost.saturating_sub(best);
                if improvement > 0 {
                    analysis.rtt_improvement_buckets[improvement_bucket(improvement)] += 1;
                } else {
                    analysis.rtt_improvement_none += 1;
                }
            }
        }

        analysis.avg_routes_per_relay_pair = ratio(analysis.total_routes, analysis.relay_pairs);
        analysis.avg_relays_per_route = ratio(total_route_length, analysis.total_routes);
        analysis.relay_pairs_with_one_route_percent =
            ratio(pairs_with_one_route, analysis.relay_pairs) * 100.0;
        analysis.relay_pairs_with_no_routes_percent =
            ratio(pairs_with_no_route, analysis.relay_pairs) * 100.0;

        analysis
    }
}

/// The text report
impl fmt::Display for MatrixAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let routed = self.routed_relay_pairs;

        writeln!(f, "RTT Improvement:")?;
        writeln!(f)?;
        writeln!(
            f,
            "    None: {} ({:.2}%)",
            self.rtt_improvement_none,
            ratio(self.rtt_improvement_none, routed) * 100.0
        )?;
        for (index, count) in self.rtt_improvement_buckets.iter().enumerate() {
            let low = index as i32 * BUCKET_WIDTH_MS;
            let percent = ratio(*count, routed) * 100.0;
            if index + 1 < IMPROVEMENT_BUCKETS {
                let high = low + BUCKET_WIDTH_MS;
                writeln!(f, "    {low}-{high}ms: {count} ({percent:.2}%)")?;
            } else {
                writeln!(f, "    {low}ms+: {count} ({percent:.2}%)")?;
            }
        }

        writeln!(f)?;
        writeln!(f, "Route Summary:")?;
        writeln!(f)?;
        writeln!(f, "    {} relays", self.relay_count)?;
        writeln!(f, "    {} total routes", self.total_routes)?;
        writeln!(f, "    {} relay pairs", self.relay_pairs)?;
        writeln!(f, "    {} destination relays", self.destination_relays)?;
        writeln!(
            f,
            "    {:.1} routes per relay pair on average ({} max)",
            self.avg_routes_per_relay_pair, self.max_routes_per_relay_pair
        )?;
        writeln!(
            f,
            "    {:.1} relays per route on average ({} max)",
            self.avg_relays_per_route, self.max_relays_per_route
        )?;
        writeln!(
            f,
            "    {:.1}% of relay pairs have only one route",
            self.relay_pairs_with_one_route_percent
        )?;
        writeln!(
            f,
            "    {:.1}% of relay pairs have no route",
            self.relay_pairs_with_no_routes_percent
        )
    }
}
