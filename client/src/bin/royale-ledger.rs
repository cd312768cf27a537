use anyhow::{ensure, Context};
use clap::{Parser, Subcommand};
use hyper::{client::connect::HttpConnector, Body, Client, Method, Request};
use royale_ledger_core::{
    db::Db,
    id::{MatchId, PlayerId, RawMatchId},
    notice::LogNotifier,
    pipeline::{Pipeline, ProcessedMatch, SubmittedMatch},
    raw::RawMatch,
    store::Store,
};
use serde_json::{json, Value};
use std::{
    fs,
    path::{Path, PathBuf},
    process::exit,
};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Royale Ledger -- ratings and statistics for battle royale matches.
#[derive(Parser)]
struct Options {
    /// Submission server.
    #[clap(
        short,
        long,
        env = "ROYALE_LEDGER_SERVER",
        default_value = "http://localhost:8080"
    )]
    server: Url,

    /// Shared secret for the submission server.
    #[clap(short = 'k', long, env = "ROYALE_LEDGER_PRIVATE_KEY", default_value = "")]
    private_key: String,

    /// Local database used for offline processing.
    #[clap(
        short,
        long,
        env = "ROYALE_LEDGER_DB",
        default_value = "royale-ledger.sqlite"
    )]
    db: PathBuf,

    #[clap(subcommand)]
    command: Command,
}

impl Options {
    async fn db(&self) -> anyhow::Result<Db> {
        Db::open(&self.db)
            .await
            .context(format!("opening database {}", self.db.display()))
    }

    fn endpoint(&self, endpoint: &str) -> anyhow::Result<Url> {
        Ok(self
            .server
            .join(&format!("data/{}/{endpoint}", self.private_key))?)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Check that the submission server is up and accepts our key.
    Ping,

    /// Submit a match file to the submission server.
    Submit {
        file: PathBuf,

        /// Game server to attribute the match to.
        #[clap(long)]
        server_id: String,
    },

    /// Process a match file against the local database.
    Process {
        file: PathBuf,

        #[clap(long, default_value = "local")]
        server_id: String,
    },

    /// Process a match already stored in the local database again.
    ///
    /// Use this to recover matches which failed to process. Reprocessing a match which was already
    /// processed successfully counts it twice.
    Reprocess { id: RawMatchId },

    /// Show a player's record.
    Player { id: PlayerId },

    /// Show a processed match.
    Match { id: MatchId },
}

impl Command {
    async fn run(&self, opt: &Options) -> anyhow::Result<()> {
        match self {
            Self::Ping => {
                let client = Client::new();
                let body =
                    request(&client, Method::GET, opt.endpoint("ping")?, Body::empty()).await?;
                ensure!(body == "Pong!", "server rejected ping: {body}");
                println!("{body}");
            }
            Self::Submit { file, server_id } => {
                let raw = read_match(file)?;
                let client = Client::new();
                let body = json!({ "server_id": server_id, "match_data": raw });
                let res = request(
                    &client,
                    Method::POST,
                    opt.endpoint("matchsubmit")?,
                    Body::from(body.to_string()),
                )
                .await?;
                let res: Value =
                    serde_json::from_str(&res).context(format!("invalid response: {res}"))?;
                ensure!(res["success"] == 1, "submission rejected: {}", res["error"]);
                tracing::info!(file = %file.display(), %server_id, "submitted match");
                println!("submitted {}", file.display());
            }
            Self::Process { file, server_id } => {
                let mut raw = read_match(file)?;
                raw.server = server_id.clone();
                let mut db = opt.db().await?;
                let id = db.insert_raw_match(&raw).await?;
                tracing::info!(%id, file = %file.display(), "stored raw match");
                process(db, SubmittedMatch { id, raw }).await?;
            }
            Self::Reprocess { id } => {
                let mut db = opt.db().await?;
                let raw = db
                    .raw_match(*id)
                    .await?
                    .context(format!("raw match {id} not found"))?;
                process(db, SubmittedMatch { id: *id, raw }).await?;
            }
            Self::Player { id } => {
                let player = opt
                    .db()
                    .await?
                    .player(id)
                    .await?
                    .context(format!("unknown player {id}"))?;
                println!("{}", serde_json::to_string_pretty(&player)?);
            }
            Self::Match { id } => {
                let summary = opt
                    .db()
                    .await?
                    .summary(*id)
                    .await?
                    .context(format!("match {id} not found"))?;
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
        }

        Ok(())
    }
}

fn read_match(file: &Path) -> anyhow::Result<RawMatch> {
    let data = fs::read(file).context(format!("reading {}", file.display()))?;
    let raw: RawMatch =
        serde_json::from_slice(&data).context(format!("parsing {}", file.display()))?;
    raw.validate()?;
    Ok(raw)
}

async fn process(db: Db, submitted: SubmittedMatch) -> anyhow::Result<ProcessedMatch> {
    let raw_match = submitted.id;
    let processed = Pipeline::new(db, LogNotifier).process(submitted).await?;
    tracing::info!(
        %raw_match,
        match_id = %processed.match_id,
        players = processed.player_count,
        "processed match"
    );
    println!(
        "raw match {raw_match} processed as match {} ({} players)",
        processed.match_id, processed.player_count
    );
    Ok(processed)
}

async fn request(
    client: &Client<HttpConnector>,
    method: Method,
    url: Url,
    body: Body,
) -> anyhow::Result<String> {
    let request = Request::builder()
        .method(method)
        .header(hyper::header::CONTENT_TYPE, "application/json")
        .uri(url.as_str())
        .body(body)?;
    let response = client.request(request).await?;
    ensure!(
        response.status().is_success(),
        "{url}: request failed: {}",
        response.status()
    );
    let body = hyper::body::to_bytes(response).await?;
    Ok(String::from_utf8(body.to_vec())?)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(true)
        .init();
    let opt = Options::parse();

    if let Err(err) = opt.command.run(&opt).await {
        eprintln!("{err:#}");
        exit(1);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    #[tokio::test]
    #[traced_test]
    async fn test_process_logs_result() {
        let raw: RawMatch = serde_json::from_value(json!({
            "weather": {"fog": 0.0, "rain": 0.0, "hour": 12, "minute": 0},
            "game": {"name": "BR #1", "mapname": "chernarusplus", "gametype": "solo", "start": 0, "end": 600},
            "results": [
                {"steamid": "76561198000000002", "killedby": "76561198000000001", "killedwith": "M4A1",
                 "timestamp": 300, "pos": [0.0, 0.0, 0.0], "killerpos": [3.0, 0.0, 4.0]},
                {"steamid": "76561198000000001", "killedby": "", "killedwith": "", "timestamp": 0,
                 "pos": [], "killerpos": []}
            ],
            "timestamp": 600
        }))
        .unwrap();
        let mut db = Db::memory().await.unwrap();
        let id = db.insert_raw_match(&raw).await.unwrap();

        let processed = process(db, SubmittedMatch { id, raw }).await.unwrap();
        assert_eq!(processed.player_count, 2);
        assert!(logs_contain("processed match"));
        assert!(logs_contain("raw_match=1"));
    }
}
