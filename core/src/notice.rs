use anyhow::ensure;
use futures::future::{join_all, Future};
use hyper::{client::connect::HttpConnector, Body, Client, Method, Request};
use serde_json::json;
use url::Url;

pub trait Notifier {
    fn notify(&self, message: &str) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Writes notifications to the log and nowhere else.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) -> anyhow::Result<()> {
        tracing::info!(message, "notice");
        Ok(())
    }
}

/// Posts notifications to a list of chat webhooks.
#[derive(Clone, Debug)]
pub struct WebhookNotifier {
    client: Client<HttpConnector>,
    urls: Vec<Url>,
}

impl WebhookNotifier {
    pub fn new(urls: Vec<Url>) -> Self {
        Self {
            client: Client::new(),
            urls,
        }
    }

    async fn post(&self, url: &Url, message: &str) -> anyhow::Result<()> {
        let request = Request::builder()
            .method(Method::POST)
            .header(hyper::header::CONTENT_TYPE, "application/json")
            .uri(url.as_str())
            .body(Body::from(serde_json::to_string(&json!({ "content": message }))?))?;
        let response = self.client.request(request).await?;
        ensure!(
            response.status().is_success(),
            "{url}: webhook error: {}",
            response.status()
        );
        Ok(())
    }
}

impl Notifier for WebhookNotifier {
    /// Post to every webhook, failing if any of them failed.
    async fn notify(&self, message: &str) -> anyhow::Result<()> {
        tracing::info!(message, webhooks = self.urls.len(), "notice");
        join_all(self.urls.iter().map(|url| self.post(url, message)))
            .await
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hyper::{
        service::{make_service_fn, service_fn},
        Response, Server, StatusCode,
    };
    use std::{convert::Infallible, net::SocketAddr, sync::Arc};
    use tokio::sync::Mutex;

    /// Serve a webhook which records every body it receives and replies with `status`.
    async fn webhook(status: StatusCode) -> (Url, Arc<Mutex<Vec<String>>>) {
        let received = Arc::new(Mutex::new(vec![]));
        let make_svc = make_service_fn({
            let received = received.clone();
            move |_| {
                let received = received.clone();
                async move {
                    Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                        let received = received.clone();
                        async move {
                            let body = hyper::body::to_bytes(req.into_body()).await?;
                            received
                                .lock()
                                .await
                                .push(String::from_utf8_lossy(&body).into_owned());
                            Ok::<_, anyhow::Error>(
                                Response::builder().status(status).body(Body::empty())?,
                            )
                        }
                    }))
                }
            }
        });
        let server = Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(make_svc);
        let url = format!("http://{}/hook", server.local_addr()).parse().unwrap();
        tokio::spawn(server);
        (url, received)
    }

    #[tokio::test]
    async fn test_log_notifier() {
        LogNotifier.notify("hello").await.unwrap();
    }

    #[tokio::test]
    async fn test_webhooks_receive_message() {
        let (first, first_received) = webhook(StatusCode::NO_CONTENT).await;
        let (second, second_received) = webhook(StatusCode::OK).await;
        let notifier = WebhookNotifier::new(vec![first, second]);
        notifier.notify("match 1 processed").await.unwrap();

        for received in [first_received, second_received] {
            let received = received.lock().await;
            assert_eq!(received.len(), 1);
            let body: serde_json::Value = serde_json::from_str(&received[0]).unwrap();
            assert_eq!(body, json!({ "content": "match 1 processed" }));
        }
    }

    #[tokio::test]
    async fn test_webhook_failure() {
        let (ok, ok_received) = webhook(StatusCode::OK).await;
        let (broken, _) = webhook(StatusCode::INTERNAL_SERVER_ERROR).await;
        let notifier = WebhookNotifier::new(vec![broken, ok]);
        notifier.notify("match 2 processed").await.unwrap_err();
        // The healthy webhook is still notified.
        assert_eq!(ok_received.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_no_webhooks() {
        WebhookNotifier::new(vec![]).notify("nobody listening").await.unwrap();
    }
}
