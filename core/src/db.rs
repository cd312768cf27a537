use crate::{
    baseline::GlobalBaseline,
    id::{MatchId, PlayerId, RawMatchId},
    player::PlayerRecord,
    raw::RawMatch,
    store::Store,
    summary::MatchSummary,
};
use anyhow::Context;
use serde::de::DeserializeOwned;
use sqlx::{
    migrate, query, query_as,
    sqlite::{SqliteConnectOptions, SqliteConnection},
    ConnectOptions,
};
use std::path::Path;

/// Records are stored as JSON documents, with the columns needed to find them alongside.
#[derive(Debug)]
pub struct Db {
    conn: SqliteConnection,
}

impl Db {
    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        Self::new(
            SqliteConnectOptions::default()
                .filename(path)
                .create_if_missing(true),
        )
        .await
    }

    pub async fn memory() -> anyhow::Result<Self> {
        Self::new(Default::default()).await
    }

    async fn new(opt: SqliteConnectOptions) -> anyhow::Result<Self> {
        let mut conn = opt.connect().await?;
        migrate!("db/migrations").run(&mut conn).await?;
        Ok(Self { conn })
    }
}

impl Store for Db {
    async fn insert_raw_match(&mut self, raw: &RawMatch) -> anyhow::Result<RawMatchId> {
        let (id,): (i64,) =
            query_as("INSERT INTO raw_match (server, timestamp, data) VALUES ($1, $2, $3) RETURNING id")
                .bind(raw.server.as_str())
                .bind(raw.timestamp)
                .bind(serde_json::to_string(raw)?)
                .fetch_one(&mut self.conn)
                .await?;
        tracing::debug!(id, server = %raw.server, "stored raw match");
        Ok(id.into())
    }

    async fn raw_match(&mut self, id: RawMatchId) -> anyhow::Result<Option<RawMatch>> {
        let row: Option<(String,)> = query_as("SELECT data FROM raw_match WHERE id = $1 LIMIT 1")
            .bind(i64::from(id))
            .fetch_optional(&mut self.conn)
            .await?;
        row.map(|(data,)| decode(&data).context(format!("corrupt raw match {id}")))
            .transpose()
    }

    async fn insert_summary(&mut self, summary: &MatchSummary) -> anyhow::Result<MatchId> {
        let (id,): (i64,) = query_as(
            "INSERT INTO match_summary (raw_match, timestamp, data) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(i64::from(summary.raw_match))
        .bind(summary.timestamp)
        .bind(serde_json::to_string(summary)?)
        .fetch_one(&mut self.conn)
        .await?;
        tracing::debug!(id, raw_match = %summary.raw_match, "stored match summary");
        Ok(id.into())
    }

    async fn summary(&mut self, id: MatchId) -> anyhow::Result<Option<MatchSummary>> {
        let row: Option<(String,)> =
            query_as("SELECT data FROM match_summary WHERE id = $1 LIMIT 1")
                .bind(i64::from(id))
                .fetch_optional(&mut self.conn)
                .await?;
        row.map(|(data,)| decode(&data).context(format!("corrupt match summary {id}")))
            .transpose()
    }

    async fn player(&mut self, id: &PlayerId) -> anyhow::Result<Option<PlayerRecord>> {
        let row: Option<(String,)> = query_as("SELECT data FROM player WHERE id = $1 LIMIT 1")
            .bind(id.as_str())
            .fetch_optional(&mut self.conn)
            .await?;
        row.map(|(data,)| decode(&data).context(format!("corrupt player {id}")))
            .transpose()
    }

    async fn save_player(&mut self, player: &PlayerRecord) -> anyhow::Result<()> {
        query(
            "INSERT INTO player (id, rating, data) VALUES ($1, $2, $3)
                ON CONFLICT (id) DO UPDATE SET rating = excluded.rating, data = excluded.data",
        )
        .bind(player.id.as_str())
        .bind(player.rating)
        .bind(serde_json::to_string(player)?)
        .execute(&mut self.conn)
        .await?;
        Ok(())
    }

    async fn baseline(&mut self) -> anyhow::Result<GlobalBaseline> {
        let row: Option<(String,)> =
            query_as("SELECT data FROM global_baseline WHERE id = 0 LIMIT 1")
                .fetch_optional(&mut self.conn)
                .await?;
        match row {
            Some((data,)) => decode(&data).context("corrupt global baseline"),
            None => Ok(GlobalBaseline::default()),
        }
    }

    async fn save_baseline(&mut self, baseline: &GlobalBaseline) -> anyhow::Result<()> {
        query(
            "INSERT INTO global_baseline (id, data) VALUES (0, $1)
                ON CONFLICT (id) DO UPDATE SET data = excluded.data",
        )
        .bind(serde_json::to_string(baseline)?)
        .execute(&mut self.conn)
        .await?;
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(data: &str) -> anyhow::Result<T> {
    Ok(serde_json::from_str(data)?)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        baseline::BaselineAverages,
        player::{MatchInfo, PentagonProfile},
        raw::{RawDeathRecord, RawGame},
        summary,
        telemetry::PlayerMetrics,
    };
    use pretty_assertions::assert_eq;

    fn raw_match() -> RawMatch {
        RawMatch {
            server: "eu-1".into(),
            game: RawGame {
                name: "BR #3".into(),
                start: 100,
                end: 700,
                ..Default::default()
            },
            results: vec![
                RawDeathRecord {
                    player: "76561198000000002".into(),
                    killer: Some("76561198000000001".into()),
                    timestamp: 400,
                    ..Default::default()
                },
                RawDeathRecord {
                    player: "76561198000000001".into(),
                    ..Default::default()
                },
            ],
            timestamp: 800,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_raw_match_and_summary() {
        let mut db = Db::memory().await.unwrap();
        let raw = raw_match();

        let raw_id = db.insert_raw_match(&raw).await.unwrap();
        assert_eq!(db.raw_match(raw_id).await.unwrap(), Some(raw.clone()));
        assert_eq!(db.raw_match(RawMatchId::from(99_i64)).await.unwrap(), None);

        let summary = summary::summarize(raw_id, &raw, 1000.0);
        let first = db.insert_summary(&summary).await.unwrap();
        let second = db.insert_summary(&summary).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(db.summary(first).await.unwrap(), Some(summary));
        assert_eq!(db.summary(MatchId::from(99_i64)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_player_upsert() {
        let mut db = Db::memory().await.unwrap();
        let id = PlayerId::from("76561198000000001");
        assert_eq!(db.player(&id).await.unwrap(), None);

        let mut player = PlayerRecord::new(id.clone());
        db.save_player(&player).await.unwrap();
        assert_eq!(db.player(&id).await.unwrap(), Some(player.clone()));

        let game = MatchInfo {
            id: MatchId::from(1_i64),
            name: "BR #1".into(),
            timestamp: 800,
            duration: 600,
            player_count: 2,
            average_rating: 1000.0,
        };
        player.record_match(&game, 1, &PlayerMetrics::default());
        player.pentagon = PentagonProfile {
            looting: 10.0,
            ..PentagonProfile::NEUTRAL
        };
        db.save_player(&player).await.unwrap();
        assert_eq!(db.player(&id).await.unwrap(), Some(player));
    }

    #[tokio::test]
    async fn test_baseline_defaults_until_saved() {
        let mut db = Db::memory().await.unwrap();
        assert_eq!(db.baseline().await.unwrap(), GlobalBaseline::default());

        let baseline = GlobalBaseline {
            total_matches: 3,
            total_players: 12,
            averages: BaselineAverages {
                loot: 4.5,
                ..Default::default()
            },
            ..Default::default()
        };
        db.save_baseline(&baseline).await.unwrap();
        db.save_baseline(&baseline).await.unwrap();
        assert_eq!(db.baseline().await.unwrap(), baseline);
    }

    #[tokio::test]
    async fn test_reopen_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.sqlite");
        let raw = raw_match();

        let id = {
            let mut db = Db::open(&path).await.unwrap();
            db.insert_raw_match(&raw).await.unwrap()
        };

        let mut db = Db::open(&path).await.unwrap();
        assert_eq!(db.raw_match(id).await.unwrap(), Some(raw));
    }
}
