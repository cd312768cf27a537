use crate::telemetry::PlayerMetrics;
use serde::{Deserialize, Serialize};

/// Process-wide statistics, shared by every player's profile.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct GlobalBaseline {
    #[serde(rename = "totalmatches")]
    pub total_matches: u64,
    #[serde(rename = "totalplayers")]
    pub total_players: u64,
    #[serde(rename = "totaldead")]
    pub total_deaths: u64,
    #[serde(rename = "zombiekills")]
    pub zombie_kills: u64,
    #[serde(rename = "pentagon")]
    pub averages: BaselineAverages,
}

/// What an average participant achieves in one match.
///
/// Used as the denominator when scoring a player's [`PentagonProfile`](crate::player::PentagonProfile).
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct BaselineAverages {
    #[serde(rename = "avgloot")]
    pub loot: f64,
    #[serde(rename = "avgshots")]
    pub hits: f64,
    #[serde(rename = "avgdistancewalked")]
    pub distance_walked: f64,
    #[serde(rename = "avgdriven")]
    pub distance_driven: f64,
    /// Fraction of the match a participant stayed alive.
    #[serde(rename = "avgtimealive")]
    pub time_alive: f64,
}

impl BaselineAverages {
    /// Per-participant means over one match.
    pub fn from_match<'a>(
        metrics: impl IntoIterator<Item = &'a PlayerMetrics>,
        duration: i64,
    ) -> Self {
        let mut totals = Self::default();
        let mut participants = 0usize;
        let mut time_alive = 0i64;
        for m in metrics {
            participants += 1;
            totals.loot += m.loot_pickups as f64;
            totals.hits += m.hits as f64;
            totals.distance_walked += m.distance_on_foot;
            totals.distance_driven += m.distance_in_vehicle;
            time_alive += m.time_alive;
        }
        if participants == 0 {
            return totals;
        }

        let n = participants as f64;
        Self {
            loot: totals.loot / n,
            hits: totals.hits / n,
            distance_walked: totals.distance_walked / n,
            distance_driven: totals.distance_driven / n,
            time_alive: if duration > 0 {
                time_alive as f64 / (n * duration as f64)
            } else {
                0.0
            },
        }
    }

    /// Whether any average is zero, in which case nothing can be normalized against it.
    pub fn has_zero(&self) -> bool {
        [
            self.loot,
            self.hits,
            self.distance_walked,
            self.distance_driven,
            self.time_alive,
        ]
        .contains(&0.0)
    }
}

impl GlobalBaseline {
    /// Fold one match into the baseline.
    ///
    /// The first match seeds the averages outright; later matches move them by
    /// `(value - average) / matches_so_far`. Every participant except the winner counts as a death.
    pub fn fold(&mut self, averages: &BaselineAverages, participants: usize, zombie_kills: usize) {
        if self.total_matches == 0 {
            self.averages = *averages;
        } else {
            let n = self.total_matches as f64;
            let fold = |average: &mut f64, value: f64| *average += (value - *average) / n;
            fold(&mut self.averages.loot, averages.loot);
            fold(&mut self.averages.hits, averages.hits);
            fold(&mut self.averages.distance_walked, averages.distance_walked);
            fold(&mut self.averages.distance_driven, averages.distance_driven);
            fold(&mut self.averages.time_alive, averages.time_alive);
        }

        self.total_matches += 1;
        self.total_players += participants as u64;
        self.total_deaths += participants.saturating_sub(1) as u64;
        self.zombie_kills += zombie_kills as u64;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn metrics(loot: u32, hits: u32, walked: f64, driven: f64, alive: i64) -> PlayerMetrics {
        PlayerMetrics {
            kills: 0,
            loot_pickups: loot,
            hits,
            distance_on_foot: walked,
            distance_in_vehicle: driven,
            time_alive: alive,
        }
    }

    #[test]
    fn test_match_averages() {
        let players = [
            metrics(4, 2, 100.0, 0.0, 300),
            metrics(0, 0, 50.0, 400.0, 600),
        ];
        let averages = BaselineAverages::from_match(&players, 600);
        assert_eq!(
            averages,
            BaselineAverages {
                loot: 2.0,
                hits: 1.0,
                distance_walked: 75.0,
                distance_driven: 200.0,
                time_alive: 0.75,
            }
        );
        assert!(!averages.has_zero());
        assert_eq!(BaselineAverages::from_match(&[], 600), BaselineAverages::default());
        assert_eq!(BaselineAverages::from_match(&players, 0).time_alive, 0.0);
    }

    #[test]
    fn test_fold_seeds_then_moves() {
        let mut baseline = GlobalBaseline::default();
        let first = BaselineAverages {
            loot: 10.0,
            hits: 4.0,
            distance_walked: 1000.0,
            distance_driven: 0.0,
            time_alive: 0.5,
        };
        baseline.fold(&first, 10, 3);
        assert_eq!(baseline.averages, first);
        assert_eq!(baseline.total_matches, 1);
        assert_eq!(baseline.total_players, 10);
        assert_eq!(baseline.total_deaths, 9);
        assert_eq!(baseline.zombie_kills, 3);
        assert!(baseline.averages.has_zero());

        let second = BaselineAverages {
            loot: 20.0,
            hits: 8.0,
            distance_walked: 3000.0,
            distance_driven: 500.0,
            time_alive: 0.25,
        };
        baseline.fold(&second, 4, 0);
        // Divisor is the number of matches folded before this one.
        assert_eq!(baseline.averages, second);

        baseline.fold(&first, 1, 0);
        assert_eq!(baseline.averages.loot, 15.0);
        assert_eq!(baseline.averages.distance_driven, 250.0);
        assert_eq!(baseline.total_matches, 3);
        assert_eq!(baseline.total_players, 15);
        assert_eq!(baseline.total_deaths, 12);
    }
}
