use crate::{
    baseline::BaselineAverages,
    id::{MatchId, PlayerId},
    rating::{self, DEFAULT_RATING},
    telemetry::PlayerMetrics,
};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A player's rating and lifetime statistics.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PlayerRecord {
    #[serde(rename = "steamid")]
    pub id: PlayerId,
    pub rating: f64,
    /// Rating after each match, in the order the matches were processed.
    #[serde(rename = "ratingtime")]
    pub rating_history: Vec<RatingPoint>,
    pub pentagon: PentagonProfile,
    #[serde(rename = "averageplace")]
    pub average_placement: f64,
    #[serde(rename = "averagetimealive")]
    pub average_time_alive: f64,
    #[serde(flatten)]
    pub totals: Totals,
    pub matches: Vec<MatchHistoryEntry>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Totals {
    #[serde(rename = "totalkills")]
    pub kills: u64,
    #[serde(rename = "totalwins")]
    pub wins: u64,
    #[serde(rename = "totaltop10")]
    pub top10: u64,
    #[serde(rename = "totalmatches")]
    pub matches: u64,
    #[serde(rename = "totallooted")]
    pub looted: u64,
    #[serde(rename = "totalhits")]
    pub hits: u64,
    #[serde(rename = "totaldistanceonfoot")]
    pub distance_on_foot: f64,
    #[serde(rename = "totaldistanceinvehicle")]
    pub distance_in_vehicle: f64,
    #[serde(rename = "totaltimealive")]
    pub time_alive: i64,
    /// Time alive if the player had won every match they played.
    #[serde(rename = "maxpossibletimealive")]
    pub max_possible_time_alive: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct RatingPoint {
    pub timestamp: i64,
    pub rating: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct MatchHistoryEntry {
    #[serde(rename = "matchid")]
    pub match_id: MatchId,
    #[serde(rename = "matchname")]
    pub match_name: String,
    pub placement: usize,
    pub kills: u32,
    #[serde(rename = "postmatchrating")]
    pub post_match_rating: f64,
    #[serde(rename = "deltarating")]
    pub rating_delta: f64,
    pub timestamp: i64,
}

/// A player's play style, as five scores between 0 and 100.
///
/// 50 means the player is exactly average in that respect.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct PentagonProfile {
    pub looting: f64,
    pub fighting: f64,
    pub walking: f64,
    pub surviving: f64,
    pub driving: f64,
}

impl PentagonProfile {
    pub const NEUTRAL: Self = Self {
        looting: 50.0,
        fighting: 50.0,
        walking: 50.0,
        surviving: 50.0,
        driving: 50.0,
    };

    /// Score a player's per-match averages against the global per-match averages.
    ///
    /// If any global average is still zero, every score is neutral.
    pub fn normalized(totals: &Totals, global: &BaselineAverages) -> Self {
        if global.has_zero() || totals.matches == 0 {
            return Self::NEUTRAL;
        }
        let matches = totals.matches as f64;
        let survived = if totals.max_possible_time_alive > 0 {
            totals.time_alive as f64 / totals.max_possible_time_alive as f64
        } else {
            0.0
        };
        Self {
            looting: squash(totals.looted as f64 / matches / global.loot),
            fighting: squash(totals.hits as f64 / matches / global.hits),
            walking: squash(totals.distance_on_foot / matches / global.distance_walked),
            surviving: squash(survived / global.time_alive),
            driving: squash(totals.distance_in_vehicle / matches / global.distance_driven),
        }
    }
}

/// Map a ratio to the global average onto 0..100, with the average itself at 50.
fn squash(ratio: f64) -> f64 {
    100.0 * ((((ratio / 2.0) - 0.5) * PI).tanh() + 1.0) / 2.0
}

/// What the ledger needs to know about a match to credit one of its participants.
#[derive(Clone, Debug)]
pub struct MatchInfo {
    pub id: MatchId,
    pub name: String,
    /// When the match was reported.
    pub timestamp: i64,
    pub duration: i64,
    pub player_count: usize,
    /// Mean pre-match rating of the lobby.
    pub average_rating: f64,
}

impl PlayerRecord {
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            rating: DEFAULT_RATING,
            rating_history: Vec::new(),
            pentagon: PentagonProfile::NEUTRAL,
            average_placement: 0.0,
            average_time_alive: 0.0,
            totals: Totals::default(),
            matches: Vec::new(),
        }
    }

    /// Credit the player with their result in a match.
    ///
    /// `index` is the player's position in the match's death order, so the first player to die has
    /// index 0 and the winner has the highest index. The Pentagon profile is not touched, since it
    /// depends on the global baseline after the whole match has been folded in.
    pub fn record_match(&mut self, game: &MatchInfo, index: usize, metrics: &PlayerMetrics) {
        let placement = game.player_count - index;
        let outplayed = index;
        let outplayed_by = game.player_count - index - 1;

        let old_rating = self.rating;
        self.rating = rating::update(old_rating, game.average_rating, outplayed, outplayed_by);
        self.rating_history.push(RatingPoint {
            timestamp: game.timestamp,
            rating: self.rating,
        });

        let totals = &mut self.totals;
        if placement == 1 {
            totals.wins += 1;
        } else if index < 10 {
            totals.top10 += 1;
        }
        totals.matches += 1;
        totals.kills += metrics.kills as u64;
        totals.looted += metrics.loot_pickups as u64;
        totals.hits += metrics.hits as u64;
        totals.distance_on_foot += metrics.distance_on_foot;
        totals.distance_in_vehicle += metrics.distance_in_vehicle;
        totals.time_alive += metrics.time_alive;
        totals.max_possible_time_alive += game.duration;

        self.matches.push(MatchHistoryEntry {
            match_id: game.id,
            match_name: game.name.clone(),
            placement,
            kills: metrics.kills,
            post_match_rating: self.rating,
            rating_delta: self.rating - old_rating,
            timestamp: game.timestamp,
        });

        if totals.matches == 1 {
            self.average_placement = placement as f64;
            self.average_time_alive = metrics.time_alive as f64;
        } else {
            let n = (totals.matches - 1) as f64;
            self.average_placement += (placement as f64 - self.average_placement) / n;
            self.average_time_alive += (metrics.time_alive as f64 - self.average_time_alive) / n;
        }
    }
}
