use crate::{
    id::{self, PlayerId, RawMatchId},
    position::Position,
    raw::{CircleAction, LootAction, RawDeathRecord, RawMatch, RawWeather, VehicleAction},
    telemetry,
};
use anyhow::bail;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// The normalized, display-ready record of a finished match.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct MatchSummary {
    #[serde(rename = "rawmatch")]
    pub raw_match: RawMatchId,
    #[serde(rename = "match_name")]
    pub name: String,
    #[serde(with = "id::sentinel")]
    pub winner: Option<PlayerId>,
    #[serde(with = "id::sentinel")]
    pub most_kills: Option<PlayerId>,
    #[serde(with = "id::sentinel")]
    pub first_kill: Option<PlayerId>,
    #[serde(with = "id::sentinel")]
    pub longest_kill: Option<PlayerId>,
    /// Mean pre-match rating of the lobby.
    pub average_rating: f64,
    #[serde(rename = "mapname")]
    pub map: String,
    #[serde(rename = "gametype")]
    pub game_type: String,
    #[serde(rename = "playercount")]
    pub player_count: usize,
    pub duration: i64,
    pub weather: String,
    /// Every event of the match, latest first.
    pub events: Vec<TimelineEvent>,
    /// One entry per participant, winner first.
    pub placements: Vec<Placement>,
    /// When the match started.
    pub timestamp: i64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TimelineEvent {
    /// Seconds since the start of the match.
    pub timestamp: i64,
    pub position: Position,
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Comma-separated actors and payload of the event, for display.
    pub data: String,
}

/// The kind of a [`TimelineEvent`].
///
/// On the wire this is flattened into a single integer: each family of events has a base code, and
/// events with a sub-action add the action's offset to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EventKind {
    Airdrop,
    Circle(CircleAction),
    Hit,
    Loot(LootAction),
    Movement,
    Shot,
    Vehicle(VehicleAction),
    ZombieKill,
}

impl EventKind {
    pub fn code(self) -> u8 {
        match self {
            Self::Airdrop => 0,
            Self::Circle(action) => 1 + action.offset(),
            Self::Hit => 3,
            Self::Loot(action) => 4 + action.offset(),
            Self::Movement => 6,
            Self::Shot => 7,
            Self::Vehicle(action) => 8 + action.offset(),
            Self::ZombieKill => 10,
        }
    }
}

impl TryFrom<u8> for EventKind {
    type Error = anyhow::Error;

    fn try_from(code: u8) -> anyhow::Result<Self> {
        Ok(match code {
            0 => Self::Airdrop,
            1 => Self::Circle(CircleAction::Show),
            2 => Self::Circle(CircleAction::Lock),
            3 => Self::Hit,
            4 => Self::Loot(LootAction::PickUp),
            5 => Self::Loot(LootAction::Drop),
            6 => Self::Movement,
            7 => Self::Shot,
            8 => Self::Vehicle(VehicleAction::GetIn),
            9 => Self::Vehicle(VehicleAction::GetOut),
            10 => Self::ZombieKill,
            _ => bail!("invalid event type {code}"),
        })
    }
}

impl From<EventKind> for u8 {
    fn from(kind: EventKind) -> u8 {
        kind.code()
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Placement {
    #[serde(rename = "steamid")]
    pub player: PlayerId,
    pub kills: u32,
    #[serde(rename = "alive")]
    pub time_alive: i64,
    #[serde(rename = "killer", with = "id::blank")]
    pub killed_by: Option<PlayerId>,
    #[serde(rename = "weapon")]
    pub killed_with: String,
    #[serde(rename = "distance")]
    pub kill_distance: f64,
}

/// Summarize a raw match.
///
/// Summarizing never fails. Any statistic which cannot be derived (for example, the first kill of a
/// match where nobody was killed by another player) is left empty.
pub fn summarize(raw_match: RawMatchId, raw: &RawMatch, average_rating: f64) -> MatchSummary {
    let winner = raw.winner().map(|record| record.player.clone());
    let most_kills = most_kills(&raw.results);
    let first_kill = first_kill(&raw.results);
    let longest_kill = longest_kill(&raw.results);
    for (field, value) in [
        ("winner", &winner),
        ("most_kills", &most_kills),
        ("first_kill", &first_kill),
        ("longest_kill", &longest_kill),
    ] {
        if value.is_none() {
            tracing::warn!(
                %raw_match,
                field,
                default = id::NO_PLAYER,
                "statistic not derivable, using default"
            );
        }
    }

    MatchSummary {
        raw_match,
        name: raw.game.name.clone(),
        winner,
        most_kills,
        first_kill,
        longest_kill,
        average_rating,
        map: raw.game.map.clone(),
        game_type: raw.game.game_type.clone(),
        player_count: raw.player_count(),
        duration: raw.duration(),
        weather: weather_label(&raw.weather),
        events: timeline(raw),
        placements: placements(raw),
        // Reports are stamped when the match ends; summaries are stamped when it started.
        timestamp: raw.timestamp - raw.game.end,
    }
}

/// A short description of the weather, like "Foggy Night".
pub fn weather_label(weather: &RawWeather) -> String {
    let time = if weather.hour > 20 || weather.hour < 7 {
        "Night"
    } else {
        "Day"
    };
    let mood = if weather.rain > 0.2 {
        "Rainy"
    } else if weather.fog > 0.2 {
        "Foggy"
    } else {
        "Clear"
    };
    format!("{mood} {time}")
}

/// The player credited with the most kills. Ties go to whoever scored their first kill earliest.
pub fn most_kills(results: &[RawDeathRecord]) -> Option<PlayerId> {
    let mut tally: Vec<(&PlayerId, u32)> = Vec::new();
    for killer in results.iter().filter_map(RawDeathRecord::credited_killer) {
        match tally.iter_mut().find(|(id, _)| *id == killer) {
            Some((_, kills)) => *kills += 1,
            None => tally.push((killer, 1)),
        }
    }
    tally
        .into_iter()
        .fold(None, |best: Option<(&PlayerId, u32)>, (id, kills)| match best {
            Some((_, most)) if most >= kills => best,
            _ => Some((id, kills)),
        })
        .map(|(id, _)| id.clone())
}

/// The killer in the earliest death caused by another player.
pub fn first_kill(results: &[RawDeathRecord]) -> Option<PlayerId> {
    results
        .iter()
        .find_map(RawDeathRecord::credited_killer)
        .cloned()
}

/// The killer in the death with the greatest distance between killer and victim.
pub fn longest_kill(results: &[RawDeathRecord]) -> Option<PlayerId> {
    let mut longest: Option<(&PlayerId, f64)> = None;
    for death in results {
        let Some(killer) = death.credited_killer() else {
            continue;
        };
        let distance = death.kill_distance();
        if longest.map_or(true, |(_, max)| distance > max) {
            longest = Some((killer, distance));
        }
    }
    longest.map(|(id, _)| id.clone())
}

/// Final standings, winner first.
pub fn placements(raw: &RawMatch) -> Vec<Placement> {
    raw.results
        .iter()
        .rev()
        .map(|death| Placement {
            player: death.player.clone(),
            kills: telemetry::kills(&death.player, &raw.results),
            time_alive: telemetry::time_alive(raw, death),
            killed_by: death.killer.clone(),
            killed_with: death.weapon.clone(),
            kill_distance: if death.credited_killer().is_some() {
                death.kill_distance()
            } else {
                0.0
            },
        })
        .collect()
}

/// Every event in the match, flattened into one list ordered from latest to earliest.
pub fn timeline(raw: &RawMatch) -> Vec<TimelineEvent> {
    let start = raw.game.start;
    let events = &raw.events;
    let event = |timestamp: i64, position: Position, kind: EventKind, data: String| TimelineEvent {
        timestamp: timestamp - start,
        position,
        kind,
        data,
    };

    let airdrops = events
        .airdrops
        .iter()
        .map(|e| event(e.timestamp, e.position, EventKind::Airdrop, String::new()));
    let circles = events.circles.iter().map(|e| {
        event(
            e.timestamp,
            e.position,
            EventKind::Circle(e.action),
            e.radius.to_string(),
        )
    });
    let hits = events.hits.iter().map(|e| {
        event(
            e.timestamp,
            e.position,
            EventKind::Hit,
            format!("{},{}", e.player, e.shooter),
        )
    });
    let loots = events.loots.iter().map(|e| {
        event(
            e.timestamp,
            e.position,
            EventKind::Loot(e.action),
            format!("{},{}", e.player, e.item),
        )
    });
    let movements = events.movements.iter().map(|e| {
        event(
            e.timestamp,
            e.position,
            EventKind::Movement,
            format!("{},{}", e.player, e.direction),
        )
    });
    let shots = events
        .shots
        .iter()
        .map(|e| event(e.timestamp, e.position, EventKind::Shot, e.player.to_string()));
    let vehicles = events.vehicles.iter().map(|e| {
        event(
            e.timestamp,
            e.position,
            EventKind::Vehicle(e.action),
            format!("{},{}", e.player, e.vehicle),
        )
    });
    let zombie_kills = events
        .zombie_kills
        .iter()
        .map(|e| event(e.timestamp, e.position, EventKind::ZombieKill, e.player.to_string()));

    airdrops
        .chain(circles)
        .chain(hits)
        .chain(loots)
        .chain(movements)
        .chain(shots)
        .chain(vehicles)
        .chain(zombie_kills)
        .sorted_by_key(|event| Reverse(event.timestamp))
        .collect()
}
