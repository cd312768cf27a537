use crate::{
    id::PlayerId,
    position::Position,
    raw::{
        HitEvent, LootAction, LootEvent, MovementEvent, RawDeathRecord, RawMatch, VehicleAction,
        VehicleEvent,
    },
};

/// Everything the ledger needs to know about one player's performance in one match.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlayerMetrics {
    pub kills: u32,
    pub loot_pickups: u32,
    pub hits: u32,
    pub distance_on_foot: f64,
    pub distance_in_vehicle: f64,
    pub time_alive: i64,
}

pub fn reconstruct(raw: &RawMatch, record: &RawDeathRecord) -> PlayerMetrics {
    let player = &record.player;
    let distances = distances(player, &raw.events.movements, &raw.events.vehicles);
    PlayerMetrics {
        kills: kills(player, &raw.results),
        loot_pickups: loot_pickups(player, &raw.events.loots),
        hits: hits_landed(player, &raw.events.hits),
        distance_on_foot: distances.on_foot,
        distance_in_vehicle: distances.in_vehicle,
        time_alive: time_alive(raw, record),
    }
}

/// Number of other participants killed by `player`.
pub fn kills(player: &PlayerId, results: &[RawDeathRecord]) -> u32 {
    results
        .iter()
        .filter(|death| death.credited_killer() == Some(player))
        .count() as u32
}

pub fn loot_pickups(player: &PlayerId, loots: &[LootEvent]) -> u32 {
    loots
        .iter()
        .filter(|loot| loot.player == *player && loot.action == LootAction::PickUp)
        .count() as u32
}

/// Number of hits where `player` was the shooter.
pub fn hits_landed(player: &PlayerId, hits: &[HitEvent]) -> u32 {
    hits.iter().filter(|hit| hit.shooter == *player).count() as u32
}

/// Seconds between the start of the match and the player's death, or the whole match for the
/// survivor.
pub fn time_alive(raw: &RawMatch, record: &RawDeathRecord) -> i64 {
    match record.died_at() {
        Some(death) => death - raw.game.start,
        None => raw.duration(),
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Distances {
    pub on_foot: f64,
    pub in_vehicle: f64,
}

#[derive(Clone, Copy, Debug)]
struct Sample {
    timestamp: i64,
    position: Position,
    action: Option<VehicleAction>,
}

/// Split the distance `player` travelled into distance on foot and distance in a vehicle.
///
/// Movement samples and vehicle enter/exit events are merged into one timeline. Every player
/// starts on foot. Each segment between consecutive samples is credited to the state in effect
/// when the segment began, so the leg ending at a get-in is walked and the leg ending at a get-out
/// is driven.
pub fn distances(
    player: &PlayerId,
    movements: &[MovementEvent],
    vehicles: &[VehicleEvent],
) -> Distances {
    let mut samples = vehicles
        .iter()
        .filter(|event| event.player == *player)
        .map(|event| Sample {
            timestamp: event.timestamp,
            position: event.position,
            action: Some(event.action),
        })
        .chain(
            movements
                .iter()
                .filter(|event| event.player == *player)
                .map(|event| Sample {
                    timestamp: event.timestamp,
                    position: event.position,
                    action: None,
                }),
        )
        .collect::<Vec<_>>();
    // Stable, so vehicle events stay ahead of movement samples with the same timestamp.
    samples.sort_by_key(|sample| sample.timestamp);

    let mut distances = Distances::default();
    let mut on_foot = true;
    for pair in samples.windows(2) {
        let [from, to] = pair else {
            continue;
        };
        let leg = from.position.distance(&to.position);
        if on_foot {
            distances.on_foot += leg;
        } else {
            distances.in_vehicle += leg;
        }
        match to.action {
            Some(VehicleAction::GetIn) => on_foot = false,
            Some(VehicleAction::GetOut) => on_foot = true,
            None => {}
        }
    }
    distances
}
