//! HTTP webhook notifier.
//!
//! Delivers messages as `{"content": "<message>"}` JSON payloads, the shape
//! accepted by Discord-style incoming webhooks.

use std::time::Duration;

use url::Url;

use crate::traits::{Notifier, NotifyError};

/// Longest `content` value the endpoint accepts, in characters.
pub const MAX_CONTENT_CHARS: usize = 2000;

/// Appended to a message cut to fit [`MAX_CONTENT_CHARS`].
pub const CLIP_MARKER: &str = "\n...(message truncated)";

const CODE_FENCE: &str = "```";

/// Posts messages as JSON to a configured endpoint.
#[derive(Debug)]
pub struct WebhookNotifier {
    url: Url,
    timeout: Duration,
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// Create a notifier for `url` whose requests give up after `timeout`.
    pub fn new(url: Url, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url,
            timeout,
            client,
        })
    }

    /// Parse and validate a raw endpoint string before constructing.
    pub fn from_config(raw_url: &str, timeout: Duration) -> Result<Self, NotifyError> {
        Self::new(parse_endpoint(raw_url)?, timeout)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        let content = clip_content(message, MAX_CONTENT_CHARS);
        if content != message {
            tracing::warn!(
                chars = message.chars().count(),
                limit = MAX_CONTENT_CHARS,
                "message too long for webhook, truncating"
            );
        }
        let payload = serde_json::json!({ "content": content });
        let body = serde_json::to_string(&payload)?;

        let response = self
            .client
            .post(self.url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body: body_text,
            });
        }

        tracing::debug!(
            host = self.url.host_str().unwrap_or_default(),
            %status,
            "webhook notification delivered"
        );

        Ok(())
    }

    fn channel_name(&self) -> &str {
        "webhook"
    }
}

/// Accept only absolute `http`/`https` URLs with a host.
pub fn parse_endpoint(raw: &str) -> Result<Url, NotifyError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| NotifyError::Config(format!("invalid webhook URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(NotifyError::Config(format!(
                "unsupported webhook URL scheme: {other}"
            )))
        }
    }
    if url.host_str().is_none() {
        return Err(NotifyError::Config("webhook URL has no host".to_string()));
    }
    Ok(url)
}

/// Cut `message` to at most `limit` characters, including the closing
/// fence and marker added when a cut happens.
fn clip_content(message: &str, limit: usize) -> String {
    if message.chars().count() <= limit {
        return message.to_string();
    }

    let budget = limit.saturating_sub(CLIP_MARKER.chars().count() + CODE_FENCE.len() + 1);
    let cut = match message.char_indices().nth(budget) {
        Some((idx, _)) => &message[..idx],
        None => message,
    };
    // A partial fence at the cut would garble the closing one.
    let kept = cut.trim_end_matches('`');

    let mut clipped = kept.to_string();
    if kept.matches(CODE_FENCE).count() % 2 == 1 {
        clipped.push('\n');
        clipped.push_str(CODE_FENCE);
    }
    clipped.push_str(CLIP_MARKER);
    clipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};

    type Received = Arc<Mutex<Vec<serde_json::Value>>>;

    /// Local endpoint that records each JSON body and answers with `status`.
    async fn spawn_endpoint(status: StatusCode, delay: Duration) -> (String, Received) {
        let received: Received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let app = Router::new().route(
            "/hook",
            post(move |Json(body): Json<serde_json::Value>| {
                let sink = sink.clone();
                async move {
                    tokio::time::sleep(delay).await;
                    sink.lock().unwrap().push(body);
                    status
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/hook"), received)
    }

    #[tokio::test]
    async fn posts_content_payload() {
        let (url, received) = spawn_endpoint(StatusCode::NO_CONTENT, Duration::ZERO).await;
        let notifier = WebhookNotifier::from_config(&url, Duration::from_secs(10)).unwrap();

        notifier.send("[+] Added rules\n```-A X```").await.unwrap();

        let bodies = received.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(
            bodies[0],
            serde_json::json!({ "content": "[+] Added rules\n```-A X```" })
        );
    }

    #[tokio::test]
    async fn non_2xx_is_an_error() {
        let (url, received) = spawn_endpoint(StatusCode::BAD_REQUEST, Duration::ZERO).await;
        let notifier = WebhookNotifier::from_config(&url, Duration::from_secs(10)).unwrap();

        match notifier.send("hello").await {
            Err(NotifyError::Status { status, .. }) => assert_eq!(status, 400),
            other => panic!("expected Status error, got: {other:?}"),
        }
        assert_eq!(received.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let (url, _received) = spawn_endpoint(StatusCode::OK, Duration::from_secs(5)).await;
        let notifier = WebhookNotifier::from_config(&url, Duration::from_millis(200)).unwrap();

        let err = notifier.send("hello").await.unwrap_err();
        match err {
            NotifyError::Http(e) => assert!(e.is_timeout()),
            other => panic!("expected Http timeout, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let notifier =
            WebhookNotifier::from_config(&format!("http://{addr}/hook"), Duration::from_secs(2))
                .unwrap();
        assert!(matches!(
            notifier.send("hello").await,
            Err(NotifyError::Http(_))
        ));
    }

    #[tokio::test]
    async fn long_messages_are_clipped() {
        let (url, received) = spawn_endpoint(StatusCode::OK, Duration::ZERO).await;
        let notifier = WebhookNotifier::from_config(&url, Duration::from_secs(10)).unwrap();

        notifier.send(&"x".repeat(MAX_CONTENT_CHARS + 50)).await.unwrap();

        let bodies = received.lock().unwrap();
        let content = bodies[0]["content"].as_str().unwrap();
        assert!(content.chars().count() <= MAX_CONTENT_CHARS);
        assert!(content.ends_with(CLIP_MARKER));
    }

    #[test]
    fn parse_endpoint_validation() {
        assert!(parse_endpoint("https://discord.com/api/webhooks/1/abc").is_ok());
        assert!(parse_endpoint(" http://127.0.0.1:8080/hook ").is_ok());

        match parse_endpoint("not a url") {
            Err(NotifyError::Config(msg)) => assert!(msg.contains("invalid webhook URL")),
            other => panic!("expected Config error, got: {other:?}"),
        }
        match parse_endpoint("ftp://files.example.com/drop") {
            Err(NotifyError::Config(msg)) => assert!(msg.contains("scheme")),
            other => panic!("expected Config error, got: {other:?}"),
        }
    }

    #[test]
    fn clip_content_leaves_short_messages_alone() {
        assert_eq!(clip_content("short", 100), "short");
        assert_eq!(clip_content("", 0), "");
        let exact = "é".repeat(MAX_CONTENT_CHARS);
        assert_eq!(clip_content(&exact, MAX_CONTENT_CHARS), exact);
    }

    #[test]
    fn clip_content_counts_characters() {
        let clipped = clip_content(&"é".repeat(MAX_CONTENT_CHARS + 1), MAX_CONTENT_CHARS);
        assert!(clipped.chars().count() <= MAX_CONTENT_CHARS);
        assert!(clipped.starts_with("éé"));
        assert!(clipped.ends_with(CLIP_MARKER));
    }

    #[test]
    fn clip_content_closes_open_fence() {
        // First-run summary long enough to be cut inside a rule's code block.
        let mut message = String::from("**NAT table change detected at** 2026-10-16T08:00:00Z\n\n[+] Added rules");
        for i in 0..200 {
            message.push_str(&format!("\n```-A PREROUTING -p tcp --dport {i} -j DNAT --to 10.0.0.{i}```"));
        }
        message.push_str("\n\n**Full diff:**\n```diff\n+A\n```");

        let clipped = clip_content(&message, MAX_CONTENT_CHARS);
        assert!(clipped.chars().count() <= MAX_CONTENT_CHARS);
        assert!(clipped.ends_with(CLIP_MARKER));
        let body = clipped.strip_suffix(CLIP_MARKER).unwrap();
        assert_eq!(body.matches(CODE_FENCE).count() % 2, 0, "unbalanced fences in {body:?}");
        assert!(body.ends_with(CODE_FENCE));
        assert!(!body.ends_with("````"));
    }

    #[test]
    fn clip_content_cut_between_blocks() {
        let message = format!("{}\n{}", "```a```".repeat(10), "b".repeat(MAX_CONTENT_CHARS));
        let clipped = clip_content(&message, MAX_CONTENT_CHARS);
        let body = clipped.strip_suffix(CLIP_MARKER).unwrap();
        assert_eq!(body.matches(CODE_FENCE).count(), 20);
        assert!(body.ends_with('b'));
    }

    #[test]
    fn channel_name_is_webhook() {
        let notifier =
            WebhookNotifier::from_config("https://example.com/hook", Duration::from_secs(10))
                .unwrap();
        assert_eq!(notifier.channel_name(), "webhook");
        assert_eq!(notifier.timeout(), Duration::from_secs(10));
    }
}
