use crate::{
    id::{self, PlayerId},
    position::Position,
};
use anyhow::{bail, ensure};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct RawMatch {
    /// The game server which reported the match, filled in by the submission endpoint.
    #[serde(default)]
    pub server: String,
    pub weather: RawWeather,
    pub game: RawGame,
    /// One record per participant, ordered by time of death. The last record is the winner.
    pub results: Vec<RawDeathRecord>,
    #[serde(default)]
    pub events: RawEventLog,
    /// When the match was reported.
    pub timestamp: i64,
}

impl RawMatch {
    pub fn player_count(&self) -> usize {
        self.results.len()
    }

    /// The last player standing.
    pub fn winner(&self) -> Option<&RawDeathRecord> {
        self.results.last()
    }

    pub fn duration(&self) -> i64 {
        self.game.end - self.game.start
    }

    /// Reject matches which cannot be processed.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.results.is_empty(), "match has no death records");
        ensure!(
            self.game.end >= self.game.start,
            "match ends ({}) before it starts ({})",
            self.game.end,
            self.game.start
        );
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct RawWeather {
    pub fog: f64,
    pub rain: f64,
    pub hour: u32,
    pub minute: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct RawGame {
    pub name: String,
    #[serde(rename = "mapname")]
    pub map: String,
    #[serde(rename = "gametype")]
    pub game_type: String,
    pub start: i64,
    pub end: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct RawDeathRecord {
    #[serde(rename = "steamid")]
    pub player: PlayerId,
    #[serde(rename = "killedby", with = "id::blank", default)]
    pub killer: Option<PlayerId>,
    #[serde(rename = "killedwith", default)]
    pub weapon: String,
    /// Time of death, or 0 if the player survived.
    #[serde(default)]
    pub timestamp: i64,
    #[serde(rename = "pos", default)]
    pub position: Position,
    #[serde(rename = "killerpos", default)]
    pub killer_position: Position,
}

impl RawDeathRecord {
    pub fn died_at(&self) -> Option<i64> {
        (self.timestamp != 0).then_some(self.timestamp)
    }

    /// The player credited with this death, excluding suicides and environmental deaths.
    pub fn credited_killer(&self) -> Option<&PlayerId> {
        self.killer.as_ref().filter(|killer| **killer != self.player)
    }

    pub fn kill_distance(&self) -> f64 {
        self.position.distance(&self.killer_position)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RawEventLog {
    #[serde(rename = "zombiekills")]
    pub zombie_kills: Vec<ZombieKillEvent>,
    pub vehicles: Vec<VehicleEvent>,
    pub shots: Vec<ShotEvent>,
    pub hits: Vec<HitEvent>,
    pub movements: Vec<MovementEvent>,
    pub loots: Vec<LootEvent>,
    pub circles: Vec<CircleEvent>,
    pub airdrops: Vec<AirdropEvent>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ZombieKillEvent {
    #[serde(rename = "playerid")]
    pub player: PlayerId,
    #[serde(rename = "pos", default)]
    pub position: Position,
    pub timestamp: i64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct VehicleEvent {
    #[serde(rename = "playerid")]
    pub player: PlayerId,
    #[serde(default)]
    pub vehicle: String,
    #[serde(rename = "pos", default)]
    pub position: Position,
    #[serde(rename = "brevent")]
    pub action: VehicleAction,
    pub timestamp: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ShotEvent {
    #[serde(rename = "playerid")]
    pub player: PlayerId,
    #[serde(rename = "pos", default)]
    pub position: Position,
    pub timestamp: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct HitEvent {
    /// The player who was hit.
    #[serde(rename = "playerid")]
    pub player: PlayerId,
    #[serde(rename = "shooterid")]
    pub shooter: PlayerId,
    #[serde(rename = "pos", default)]
    pub position: Position,
    pub timestamp: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct MovementEvent {
    #[serde(rename = "playerid")]
    pub player: PlayerId,
    #[serde(rename = "pos", default)]
    pub position: Position,
    #[serde(default)]
    pub direction: f64,
    pub timestamp: i64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct LootEvent {
    #[serde(rename = "playerid")]
    pub player: PlayerId,
    #[serde(default)]
    pub item: String,
    #[serde(rename = "pos", default)]
    pub position: Position,
    #[serde(rename = "brevent")]
    pub action: LootAction,
    pub timestamp: i64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CircleEvent {
    #[serde(rename = "pos", default)]
    pub position: Position,
    pub radius: f64,
    #[serde(rename = "brevent")]
    pub action: CircleAction,
    pub timestamp: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct AirdropEvent {
    #[serde(rename = "pos", default)]
    pub position: Position,
    pub timestamp: i64,
}

macro_rules! action_codes {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $code:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
        #[serde(try_from = "i32", into = "i32")]
        pub enum $name {
            $($variant = $code),+
        }

        impl TryFrom<i32> for $name {
            type Error = anyhow::Error;

            fn try_from(code: i32) -> anyhow::Result<Self> {
                match code {
                    $($code => Ok(Self::$variant),)+
                    _ => bail!("invalid {} code {code}", stringify!($name)),
                }
            }
        }

        impl From<$name> for i32 {
            fn from(action: $name) -> i32 {
                action as i32
            }
        }

        impl $name {
            /// Offset of this action from the first action of its kind.
            pub fn offset(self) -> u8 {
                self as u8
            }
        }
    };
}

action_codes! {
    /// Whether a player got into or out of a vehicle.
    VehicleAction { GetIn = 0, GetOut = 1 }
}

action_codes! {
    LootAction { PickUp = 0, Drop = 1 }
}

action_codes! {
    /// Whether the next play area was announced or the current one locked in.
    CircleAction { Show = 0, Lock = 1 }
}
