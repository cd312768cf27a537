use crate::{
    baseline::GlobalBaseline,
    id::{MatchId, PlayerId, RawMatchId},
    player::PlayerRecord,
    raw::RawMatch,
    summary::MatchSummary,
};
use futures::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Durable storage for matches, players and the global baseline.
///
/// Lookups return `Ok(None)` when a record does not exist, so a missing record is never confused
/// with an unreachable store. No method spans more than one record, and callers must not assume
/// that a sequence of writes is atomic.
pub trait Store {
    fn insert_raw_match(
        &mut self,
        raw: &RawMatch,
    ) -> impl Future<Output = anyhow::Result<RawMatchId>> + Send;

    fn raw_match(
        &mut self,
        id: RawMatchId,
    ) -> impl Future<Output = anyhow::Result<Option<RawMatch>>> + Send;

    fn insert_summary(
        &mut self,
        summary: &MatchSummary,
    ) -> impl Future<Output = anyhow::Result<MatchId>> + Send;

    fn summary(
        &mut self,
        id: MatchId,
    ) -> impl Future<Output = anyhow::Result<Option<MatchSummary>>> + Send;

    fn player(
        &mut self,
        id: &PlayerId,
    ) -> impl Future<Output = anyhow::Result<Option<PlayerRecord>>> + Send;

    /// Insert a player, or replace the existing record with the same ID.
    fn save_player(
        &mut self,
        player: &PlayerRecord,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// The global baseline, or an empty one if no match has been processed yet.
    fn baseline(&mut self) -> impl Future<Output = anyhow::Result<GlobalBaseline>> + Send;

    fn save_baseline(
        &mut self,
        baseline: &GlobalBaseline,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// A store shared between tasks, locked for the duration of each call.
impl<S: Store + Send> Store for Arc<Mutex<S>> {
    async fn insert_raw_match(&mut self, raw: &RawMatch) -> anyhow::Result<RawMatchId> {
        self.lock().await.insert_raw_match(raw).await
    }

    async fn raw_match(&mut self, id: RawMatchId) -> anyhow::Result<Option<RawMatch>> {
        self.lock().await.raw_match(id).await
    }

    async fn insert_summary(&mut self, summary: &MatchSummary) -> anyhow::Result<MatchId> {
        self.lock().await.insert_summary(summary).await
    }

    async fn summary(&mut self, id: MatchId) -> anyhow::Result<Option<MatchSummary>> {
        self.lock().await.summary(id).await
    }

    async fn player(&mut self, id: &PlayerId) -> anyhow::Result<Option<PlayerRecord>> {
        self.lock().await.player(id).await
    }

    async fn save_player(&mut self, player: &PlayerRecord) -> anyhow::Result<()> {
        self.lock().await.save_player(player).await
    }

    async fn baseline(&mut self) -> anyhow::Result<GlobalBaseline> {
        self.lock().await.baseline().await
    }

    async fn save_baseline(&mut self, baseline: &GlobalBaseline) -> anyhow::Result<()> {
        self.lock().await.save_baseline(baseline).await
    }
}
