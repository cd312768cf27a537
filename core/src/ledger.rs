use crate::{
    baseline::BaselineAverages,
    player::{MatchInfo, PentagonProfile, PlayerRecord},
    rating::DEFAULT_RATING,
    raw::RawMatch,
    store::Store,
    telemetry,
};
use anyhow::Context;

/// Mean pre-match rating of everyone in the match.
///
/// Players who have never been seen before count with the default rating.
pub async fn average_rating<S: Store>(store: &mut S, raw: &RawMatch) -> anyhow::Result<f64> {
    let mut average = DEFAULT_RATING;
    for (i, death) in raw.results.iter().enumerate() {
        let rating = store
            .player(&death.player)
            .await
            .context(format!("loading player {}", death.player))?
            .map_or(DEFAULT_RATING, |player| player.rating);
        average += (rating - average) / (i + 1) as f64;
    }
    Ok(average)
}

/// Credit every participant of a match and fold the match into the global baseline.
///
/// The baseline is saved before any player, since each player's Pentagon profile is scored against
/// the updated baseline. Players are then saved one at a time in death order. Nothing is rolled
/// back on failure: if saving a player fails, the baseline and every earlier player keep their
/// updates, and the error is returned.
pub async fn update_players<S: Store>(
    store: &mut S,
    raw: &RawMatch,
    game: &MatchInfo,
) -> anyhow::Result<Vec<PlayerRecord>> {
    let mut baseline = store.baseline().await.context("loading global baseline")?;

    let mut players = Vec::with_capacity(raw.player_count());
    let mut metrics = Vec::with_capacity(raw.player_count());
    for (index, death) in raw.results.iter().enumerate() {
        let mut player = match store
            .player(&death.player)
            .await
            .context(format!("loading player {}", death.player))?
        {
            Some(player) => player,
            None => {
                tracing::info!(player = %death.player, "new player");
                PlayerRecord::new(death.player.clone())
            }
        };
        let m = telemetry::reconstruct(raw, death);
        player.record_match(game, index, &m);
        tracing::debug!(
            player = %player.id,
            placement = raw.player_count() - index,
            rating = player.rating,
            kills = m.kills,
            "credited player"
        );
        players.push(player);
        metrics.push(m);
    }

    let averages = BaselineAverages::from_match(&metrics, raw.duration());
    baseline.fold(&averages, raw.player_count(), raw.events.zombie_kills.len());
    store
        .save_baseline(&baseline)
        .await
        .context("saving global baseline")?;
    tracing::debug!(?baseline, "updated global baseline");

    for player in &mut players {
        player.pentagon = PentagonProfile::normalized(&player.totals, &baseline.averages);
        store
            .save_player(player)
            .await
            .context(format!("saving player {}", player.id))?;
    }
    Ok(players)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        db::Db,
        id::{MatchId, PlayerId},
        raw::{RawDeathRecord, RawGame},
    };
    use pretty_assertions::assert_eq;

    fn id(n: u8) -> PlayerId {
        format!("7656119800000000{n}").into()
    }

    fn two_player_match() -> RawMatch {
        RawMatch {
            game: RawGame {
                name: "BR #1".into(),
                start: 0,
                end: 1000,
                ..Default::default()
            },
            results: vec![
                RawDeathRecord {
                    player: id(2),
                    killer: Some(id(1)),
                    timestamp: 500,
                    ..Default::default()
                },
                RawDeathRecord {
                    player: id(1),
                    ..Default::default()
                },
            ],
            timestamp: 1000,
            ..Default::default()
        }
    }

    fn info(raw: &RawMatch, average_rating: f64) -> MatchInfo {
        MatchInfo {
            id: MatchId::from(1_i64),
            name: raw.game.name.clone(),
            timestamp: raw.timestamp,
            duration: raw.duration(),
            player_count: raw.player_count(),
            average_rating,
        }
    }

    #[tokio::test]
    async fn test_average_rating() {
        let mut db = Db::memory().await.unwrap();
        let raw = two_player_match();
        assert_eq!(average_rating(&mut db, &raw).await.unwrap(), 1000.0);

        let mut strong = PlayerRecord::new(id(1));
        strong.rating = 1300.0;
        db.save_player(&strong).await.unwrap();
        assert_eq!(average_rating(&mut db, &raw).await.unwrap(), 1150.0);

        assert_eq!(
            average_rating(&mut db, &RawMatch::default()).await.unwrap(),
            DEFAULT_RATING
        );
    }

    #[tokio::test]
    async fn test_update_players() {
        let mut db = Db::memory().await.unwrap();
        let raw = two_player_match();
        let players = update_players(&mut db, &raw, &info(&raw, 1000.0))
            .await
            .unwrap();
        assert_eq!(players.len(), 2);

        let loser = db.player(&id(2)).await.unwrap().unwrap();
        assert_eq!(loser.totals.matches, 1);
        assert_eq!(loser.totals.wins, 0);
        assert_eq!(loser.totals.top10, 1);
        assert_eq!(loser.totals.time_alive, 500);
        assert_eq!(loser.matches[0].placement, 2);
        assert!(loser.rating < 1000.0);

        let winner = db.player(&id(1)).await.unwrap().unwrap();
        assert_eq!(winner.totals.matches, 1);
        assert_eq!(winner.totals.wins, 1);
        assert_eq!(winner.totals.kills, 1);
        assert_eq!(winner.matches[0].placement, 1);
        assert!(winner.rating > 1000.0);
        assert_eq!(winner, players[1]);

        let baseline = db.baseline().await.unwrap();
        assert_eq!(baseline.total_matches, 1);
        assert_eq!(baseline.total_players, 2);
        assert_eq!(baseline.total_deaths, 1);
        assert_eq!(baseline.averages.time_alive, 0.75);
        // Nobody looted, so there is nothing to score against yet.
        assert_eq!(winner.pentagon, PentagonProfile::NEUTRAL);
    }
}
