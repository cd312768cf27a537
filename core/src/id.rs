use derive_more::{Display, From, FromStr, Into};
use serde::{Deserialize, Serialize};

/// The external identity of a player, as reported by game servers.
///
/// This is the fixed-length (17 character) platform account id. It is the key under which a
/// player's [`PlayerRecord`](crate::player::PlayerRecord) is stored.
#[derive(
    Clone,
    Debug,
    Default,
    Display,
    From,
    FromStr,
    Into,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Deserialize,
    Serialize,
)]
#[display("{_0}")]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Row id of a raw match as submitted by a game server.
#[derive(
    Clone, Copy, Debug, Display, From, FromStr, Into, PartialEq, Eq, Hash, Deserialize, Serialize,
)]
#[display("{_0}")]
#[serde(transparent)]
pub struct RawMatchId(i64);

/// Row id of a processed match summary.
#[derive(
    Clone, Copy, Debug, Display, From, FromStr, Into, PartialEq, Eq, Hash, Deserialize, Serialize,
)]
#[display("{_0}")]
#[serde(transparent)]
pub struct MatchId(i64);

/// Wire encoding of "no player" in summary fields: a player id made entirely of zeros.
pub const NO_PLAYER: &str = "00000000000000000";

/// Serde adapter encoding `None` as [`NO_PLAYER`].
pub mod sentinel {
    use super::{PlayerId, NO_PLAYER};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(id: &Option<PlayerId>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(id.as_ref().map(PlayerId::as_str).unwrap_or(NO_PLAYER))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<PlayerId>, D::Error> {
        let id = String::deserialize(d)?;
        Ok((id != NO_PLAYER && !id.is_empty()).then(|| id.into()))
    }
}

/// Serde adapter encoding `None` as an empty string, as game servers do for environmental deaths.
pub mod blank {
    use super::PlayerId;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(id: &Option<PlayerId>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(id.as_ref().map(PlayerId::as_str).unwrap_or_default())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<PlayerId>, D::Error> {
        let id = Option::<String>::deserialize(d)?.unwrap_or_default();
        Ok((!id.is_empty()).then(|| id.into()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct Actors {
        #[serde(with = "sentinel")]
        best: Option<PlayerId>,
        #[serde(with = "blank", default)]
        killer: Option<PlayerId>,
    }

    #[test]
    fn test_absent_players_use_wire_sentinels() {
        let actors = Actors {
            best: None,
            killer: None,
        };
        assert_eq!(
            serde_json::to_value(&actors).unwrap(),
            json!({"best": NO_PLAYER, "killer": ""})
        );
        let parsed: Actors = serde_json::from_value(json!({"best": NO_PLAYER})).unwrap();
        assert_eq!(parsed, actors);
    }

    #[test]
    fn test_present_players_pass_through() {
        let parsed: Actors = serde_json::from_value(
            json!({"best": "76561198000000001", "killer": "76561198000000002"}),
        )
        .unwrap();
        assert_eq!(parsed.best, Some("76561198000000001".into()));
        assert_eq!(parsed.killer, Some("76561198000000002".into()));
    }
}
