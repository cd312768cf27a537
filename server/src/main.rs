use anyhow::{anyhow, Context};
use clap::Parser;
use hyper::{
    service::{make_service_fn, service_fn},
    Body, Method, Request, Response, Server, StatusCode,
};
use royale_ledger_core::{
    db::Db,
    notice::{Notifier, WebhookNotifier},
    pipeline::{self, MatchQueue, Pipeline, SubmittedMatch},
    raw::RawMatch,
    store::Store,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, path::PathBuf, process::exit, sync::Arc};
use tokio::{signal, spawn, sync::Mutex};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Collects finished matches from game servers and keeps the leaderboards up to date.
#[derive(Parser)]
struct Options {
    #[clap(short, long, env = "ROYALE_LEDGER_PORT", default_value = "8080")]
    port: u16,

    /// Shared secret game servers include in the request path.
    #[clap(short = 'k', long, env = "ROYALE_LEDGER_PRIVATE_KEY")]
    private_key: String,

    #[clap(
        short,
        long,
        env = "ROYALE_LEDGER_DB",
        default_value = "royale-ledger.sqlite"
    )]
    db: PathBuf,

    /// Matches which may wait for processing before submissions start to block.
    #[clap(
        short,
        long,
        env = "ROYALE_LEDGER_QUEUE_CAPACITY",
        default_value = "100"
    )]
    queue_capacity: usize,

    /// Chat webhook to announce matches on. May be given more than once.
    #[clap(
        short,
        long = "webhook",
        env = "ROYALE_LEDGER_WEBHOOK",
        value_delimiter = ','
    )]
    webhooks: Vec<Url>,

    /// Public leaderboard site, linked from the index page.
    #[clap(long, env = "ROYALE_LEDGER_SITE_URL")]
    site_url: Option<Url>,
}

#[derive(Clone)]
struct App {
    db: Arc<Mutex<Db>>,
    queue: MatchQueue,
    notifier: WebhookNotifier,
    private_key: Arc<str>,
    site_url: Option<Url>,
}

#[derive(Debug, Deserialize)]
struct Submission {
    server_id: String,
    match_data: RawMatch,
}

impl App {
    async fn handle(self, req: Request<Body>) -> Response<Body> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        tracing::debug!(%method, path, "request");

        let segments = path.trim_matches('/').split('/').collect::<Vec<_>>();
        match (&method, segments.as_slice()) {
            (&Method::GET, [""]) => text(StatusCode::OK, self.index()),
            (&Method::GET, ["health"]) => text(StatusCode::OK, "Healthy!".into()),
            (&Method::GET, ["data", key, "ping"]) => {
                if self.authorized(key) {
                    text(StatusCode::OK, "Pong!".into())
                } else {
                    text(StatusCode::OK, "invalid request".into())
                }
            }
            (&Method::POST, ["data", key, "matchsubmit"]) => {
                let res = if self.authorized(key) {
                    self.submit(req.into_body()).await
                } else {
                    tracing::debug!("invalid private key in match submission");
                    Err(anyhow!("invalid access key"))
                };
                reply(res)
            }
            _ => text(StatusCode::NOT_FOUND, "Endpoint not found!".into()),
        }
    }

    fn index(&self) -> String {
        match &self.site_url {
            Some(url) => format!("Royale Ledger submission service. Leaderboards: {url}"),
            None => "Royale Ledger submission service.".into(),
        }
    }

    fn authorized(&self, key: &str) -> bool {
        key == &*self.private_key
    }

    /// Store a submitted match and queue it for processing.
    async fn submit(&self, body: Body) -> anyhow::Result<()> {
        let body = hyper::body::to_bytes(body).await?;
        let Submission {
            server_id,
            mut match_data,
        } = serde_json::from_slice(&body).context("invalid request")?;
        match_data.validate().context("invalid request")?;
        match_data.server = server_id;

        let id = self
            .db
            .lock()
            .await
            .insert_raw_match(&match_data)
            .await
            .context("internal error")?;
        tracing::info!(
            %id,
            server = %match_data.server,
            players = match_data.player_count(),
            "match submitted"
        );

        let notifier = self.notifier.clone();
        let announcement = format!("New match data collected from {}", match_data.server);
        spawn(async move {
            if let Err(err) = notifier.notify(&announcement).await {
                tracing::warn!("error sending notification: {err:#}");
            }
        });

        self.queue
            .submit(SubmittedMatch {
                id,
                raw: match_data,
            })
            .await
    }
}

fn text(status: StatusCode, body: String) -> Response<Body> {
    let mut res = Response::new(Body::from(body));
    *res.status_mut() = status;
    res
}

fn reply(res: anyhow::Result<()>) -> Response<Body> {
    let body: Value = match res {
        Ok(()) => json!({"success": 1, "error": "", "data": null}),
        Err(err) => {
            tracing::error!("rejected match submission: {err:#}");
            json!({"success": 0, "error": err.to_string(), "data": null})
        }
    };
    let mut res = Response::new(Body::from(body.to_string()));
    res.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    res
}

async fn run(opt: Options) -> anyhow::Result<()> {
    let db = Arc::new(Mutex::new(
        Db::open(&opt.db)
            .await
            .context(format!("opening database {}", opt.db.display()))?,
    ));
    let notifier = WebhookNotifier::new(opt.webhooks);
    let (queue, receiver) = pipeline::queue(opt.queue_capacity);

    let worker = spawn(
        Pipeline::new(db.clone(), notifier.clone()).run_until(receiver, async {
            signal::ctrl_c().await.ok();
        }),
    );

    let app = App {
        db,
        queue,
        notifier,
        private_key: opt.private_key.into(),
        site_url: opt.site_url,
    };
    let make_svc = make_service_fn(move |_| {
        let app = app.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                let app = app.clone();
                async move { Ok::<_, Infallible>(app.handle(req).await) }
            }))
        }
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], opt.port));
    tracing::info!(%addr, "listening");
    Server::try_bind(&addr)?
        .serve(make_svc)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
            tracing::info!("shutting down");
        })
        .await?;

    // The worker finishes the match it is processing, if any, before it exits.
    worker.await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(true)
        .init();

    if let Err(err) = run(Options::parse()).await {
        eprintln!("{err:#}");
        exit(1);
    }
}
