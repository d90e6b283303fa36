//! Grouping raw pings into per-vehicle ordered trajectories.

use crate::model::{Ping, VehicleKey};
use std::collections::HashMap;

/// The time-ordered sequence of pings for one `(line, brigade)` vehicle.
///
/// Timestamps are non-decreasing; pings with identical timestamps keep
/// their original relative order (the sort is stable). Fewer than 2 pings
/// is a valid, degenerate trajectory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    pub pings: Vec<Ping>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.pings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pings.is_empty()
    }

    /// Consecutive ping pairs in time order.
    pub fn segments(&self) -> impl Iterator<Item = (&Ping, &Ping)> {
        self.pings.windows(2).map(|w| (&w[0], &w[1]))
    }
}

pub type TrajectoryMap = HashMap<VehicleKey, Trajectory>;

/// Read-only access to trajectories by vehicle key.
///
/// The punctuality matcher takes this as an explicit parameter so it never
/// reaches into a shared ambient table and can be tested against a stub.
pub trait TrajectoryLookup {
    fn trajectory(&self, key: &VehicleKey) -> Option<&Trajectory>;
}

impl TrajectoryLookup for TrajectoryMap {
    fn trajectory(&self, key: &VehicleKey) -> Option<&Trajectory> {
        self.get(key)
    }
}

/// Groups pings by `(line, brigade)` and sorts each group ascending by
/// timestamp. Idempotent under any permutation of the input.
pub fn build_trajectories(pings: impl IntoIterator<Item = Ping>) -> TrajectoryMap {
    let mut groups: HashMap<VehicleKey, Vec<Ping>> = HashMap::new();
    for ping in pings {
        groups.entry(ping.key()).or_default().push(ping);
    }

    groups
        .into_iter()
        .map(|(key, mut pings)| {
            pings.sort_by_key(|p| p.time);
            (key, Trajectory { pings })
        })
        .collect()
}
