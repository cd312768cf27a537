use crate::{
    id::{MatchId, RawMatchId},
    ledger,
    notice::Notifier,
    player::MatchInfo,
    rating::DEFAULT_RATING,
    raw::RawMatch,
    store::Store,
    summary,
};
use anyhow::{anyhow, Context};
use futures::future::{self, Future};
use tokio::sync::mpsc;
use tracing::instrument;

/// A raw match which has been stored and is waiting to be processed.
#[derive(Clone, Debug)]
pub struct SubmittedMatch {
    pub id: RawMatchId,
    pub raw: RawMatch,
}

/// Outcome of processing one match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcessedMatch {
    pub match_id: MatchId,
    pub player_count: usize,
}

pub type MatchReceiver = mpsc::Receiver<SubmittedMatch>;

/// Create a queue holding at most `capacity` unprocessed matches.
pub fn queue(capacity: usize) -> (MatchQueue, MatchReceiver) {
    let (sender, receiver) = mpsc::channel(capacity);
    (MatchQueue { sender }, receiver)
}

#[derive(Clone, Debug)]
pub struct MatchQueue {
    sender: mpsc::Sender<SubmittedMatch>,
}

impl MatchQueue {
    /// Queue a match, waiting for room if the queue is full.
    pub async fn submit(&self, submitted: SubmittedMatch) -> anyhow::Result<()> {
        let id = submitted.id;
        self.sender
            .send(submitted)
            .await
            .map_err(|_| anyhow!("match pipeline has stopped"))?;
        tracing::debug!(%id, "queued match");
        Ok(())
    }
}

/// Processes submitted matches one at a time, in submission order.
#[derive(Debug)]
pub struct Pipeline<S, N> {
    store: S,
    notifier: N,
}

impl<S: Store, N: Notifier> Pipeline<S, N> {
    pub fn new(store: S, notifier: N) -> Self {
        Self { store, notifier }
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Process queued matches until the queue is closed.
    ///
    /// A match which fails to process is logged and skipped. It is not retried, but its raw data
    /// is still in the store, so it can be reprocessed by hand.
    pub async fn run(self, matches: MatchReceiver) -> S {
        self.run_until(matches, future::pending()).await
    }

    /// Process queued matches until the queue is closed or `shutdown` resolves.
    ///
    /// `shutdown` is only observed between matches: a match which is already being processed is
    /// always finished. Matches still queued after shutdown are left unprocessed.
    pub async fn run_until(
        mut self,
        mut matches: MatchReceiver,
        shutdown: impl Future<Output = ()>,
    ) -> S {
        tracing::info!("match pipeline started");
        tokio::pin!(shutdown);
        loop {
            let submitted = tokio::select! {
                biased;
                () = &mut shutdown => {
                    tracing::info!("match pipeline cancelled");
                    break;
                }
                next = matches.recv() => match next {
                    Some(submitted) => submitted,
                    None => {
                        tracing::info!("match queue closed");
                        break;
                    }
                },
            };

            let raw_match = submitted.id;
            match self.process(submitted).await {
                Ok(processed) => tracing::info!(
                    %raw_match,
                    match_id = %processed.match_id,
                    players = processed.player_count,
                    "processed match"
                ),
                Err(err) => tracing::error!(%raw_match, "error processing match: {err:#}"),
            }
        }
        self.store
    }

    /// Summarize a match, credit its players and announce the result.
    ///
    /// The steps are not atomic. If a step fails, everything saved by earlier steps stays saved.
    /// Processing the same match twice counts it twice.
    #[instrument(skip_all, fields(raw_match = %submitted.id))]
    pub async fn process(&mut self, submitted: SubmittedMatch) -> anyhow::Result<ProcessedMatch> {
        let SubmittedMatch { id, raw } = submitted;

        let average_rating = match ledger::average_rating(&mut self.store, &raw).await {
            Ok(rating) => rating,
            Err(err) => {
                tracing::warn!("using default lobby rating: {err:#}");
                DEFAULT_RATING
            }
        };

        let summary = summary::summarize(id, &raw, average_rating);
        let match_id = self
            .store
            .insert_summary(&summary)
            .await
            .context("saving match summary")?;

        let game = MatchInfo {
            id: match_id,
            name: summary.name,
            timestamp: raw.timestamp,
            duration: raw.duration(),
            player_count: raw.player_count(),
            average_rating,
        };
        let players = ledger::update_players(&mut self.store, &raw, &game).await?;

        let message = format!(
            "Leaderboards updated: match {match_id} with {} players",
            players.len()
        );
        if let Err(err) = self.notifier.notify(&message).await {
            tracing::warn!("error sending notification: {err:#}");
        }

        Ok(ProcessedMatch {
            match_id,
            player_count: players.len(),
        })
    }
}
