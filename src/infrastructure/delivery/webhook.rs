use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::application::services::delivery::{
    AttemptError, DeliveryClient, DeliveryError, DeliveryReceipt,
};

pub const AUTH_HEADER: &str = "x-ins-auth-key";

/// A single outbound call to the delivery endpoint, without any retrying.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn post(&self, phone_number: &str, content: &str)
    -> Result<DeliveryReceipt, AttemptError>;
}

#[derive(Debug, Serialize)]
struct WebhookRequest<'a> {
    to: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct WebhookResponse {
    #[serde(default)]
    #[allow(dead_code)]
    message: Option<String>,
    #[serde(rename = "messageId")]
    message_id: String,
}

pub struct HttpWebhookTransport {
    http: Client,
    url: String,
    auth_key: String,
}

impl HttpWebhookTransport {
    pub fn new(url: String, auth_key: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent("message-dispatcher/webhook")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            url,
            auth_key,
        })
    }
}

#[async_trait]
impl WebhookTransport for HttpWebhookTransport {
    async fn post(
        &self,
        phone_number: &str,
        content: &str,
    ) -> Result<DeliveryReceipt, AttemptError> {
        let response = self
            .http
            .post(&self.url)
            .header(AUTH_HEADER, &self.auth_key)
            .json(&WebhookRequest {
                to: phone_number,
                content,
            })
            .send()
            .await
            .map_err(|err| AttemptError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| AttemptError::Transport(err.to_string()))?;

        if status != StatusCode::OK && status != StatusCode::ACCEPTED {
            return Err(AttemptError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let payload: WebhookResponse =
            serde_json::from_str(&body).map_err(|err| AttemptError::Decode(err.to_string()))?;

        Ok(DeliveryReceipt {
            delivery_id: payload.message_id,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

/// Delivery client with linear backoff: retry `k` waits `retry_delay * k`.
pub struct WebhookClient {
    transport: Arc<dyn WebhookTransport>,
    policy: RetryPolicy,
}

impl WebhookClient {
    pub fn new(transport: Arc<dyn WebhookTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }
}

#[async_trait]
impl DeliveryClient for WebhookClient {
    async fn send(
        &self,
        cancel: &CancellationToken,
        phone_number: &str,
        content: &str,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let mut attempt: u32 = 0;

        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DeliveryError::Cancelled),
                result = self.transport.post(phone_number, content) => result,
            };

            let err = match result {
                Ok(receipt) => return Ok(receipt),
                Err(err) => err,
            };

            attempt += 1;
            warn!(attempt, error = %err, "webhook attempt failed");

            if attempt > self.policy.max_retries {
                return Err(DeliveryError::RetriesExhausted {
                    attempts: attempt,
                    source: err,
                });
            }

            let delay = self.policy.retry_delay * attempt;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DeliveryError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::time::Instant;

    use super::*;
    use crate::{
        application::handlers::message_dispatcher::{BatchProcessor, MessageDispatcher},
        domain::{
            models::{MessageStatus, NewMessage},
            repositories::MessageRepository,
        },
        infrastructure::repositories::in_memory::InMemoryMessageRepository,
    };

    /// Replays a fixed script of attempt results and records when each call happened.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<DeliveryReceipt, AttemptError>>>,
        calls: Mutex<Vec<Instant>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<DeliveryReceipt, AttemptError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl WebhookTransport for ScriptedTransport {
        async fn post(
            &self,
            _phone_number: &str,
            _content: &str,
        ) -> Result<DeliveryReceipt, AttemptError> {
            self.calls.lock().unwrap().push(Instant::now());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AttemptError::Transport("script exhausted".to_string())))
        }
    }

    fn server_error() -> Result<DeliveryReceipt, AttemptError> {
        Err(AttemptError::UnexpectedStatus {
            status: 500,
            body: "internal error".to_string(),
        })
    }

    fn accepted(id: &str) -> Result<DeliveryReceipt, AttemptError> {
        Ok(DeliveryReceipt {
            delivery_id: id.to_string(),
        })
    }

    /// The paused clock lands on timer ticks, so allow millisecond rounding.
    fn assert_gap(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(10),
            "expected ~{expected:?}, got {actual:?}"
        );
    }

    fn client(transport: Arc<ScriptedTransport>, max_retries: u32) -> WebhookClient {
        WebhookClient::new(
            transport,
            RetryPolicy {
                max_retries,
                retry_delay: Duration::from_secs(1),
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_third_attempt_with_linear_backoff() {
        let transport =
            ScriptedTransport::new(vec![server_error(), server_error(), accepted("abc")]);
        let client = client(transport.clone(), 3);

        let receipt = client
            .send(&CancellationToken::new(), "+905551111111", "hello")
            .await
            .unwrap();

        assert_eq!(receipt.delivery_id, "abc");
        let calls = transport.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 3);
        assert_gap(calls[1] - calls[0], Duration::from_secs(1));
        assert_gap(calls[2] - calls[1], Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries_with_last_error() {
        let transport = ScriptedTransport::new(vec![
            server_error(),
            server_error(),
            server_error(),
            Err(AttemptError::Transport("connection refused".to_string())),
        ]);
        let client = client(transport.clone(), 3);

        let err = client
            .send(&CancellationToken::new(), "+905551111111", "hello")
            .await
            .unwrap_err();

        assert_eq!(transport.call_count(), 4);
        match err {
            DeliveryError::RetriesExhausted { attempts, source } => {
                assert_eq!(attempts, 4);
                assert!(matches!(
                    source,
                    AttemptError::Transport(ref msg) if msg == "connection refused"
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_means_single_attempt() {
        let transport = ScriptedTransport::new(vec![server_error(), accepted("late")]);
        let client = client(transport.clone(), 0);

        let err = client
            .send(&CancellationToken::new(), "+905551111111", "hello")
            .await
            .unwrap_err();

        assert!(matches!(err, DeliveryError::RetriesExhausted { attempts: 1, .. }));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_backoff() {
        let transport = ScriptedTransport::new(vec![server_error(), accepted("never")]);
        let client = client(transport.clone(), 3);
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                cancel.cancel();
            })
        };

        let started = Instant::now();
        let err = client.send(&cancel, "+905551111111", "hello").await.unwrap_err();
        canceller.await.unwrap();

        assert!(matches!(err, DeliveryError::Cancelled));
        assert_eq!(transport.call_count(), 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn already_cancelled_token_skips_the_call() {
        let transport = ScriptedTransport::new(vec![accepted("abc")]);
        let client = client(transport.clone(), 3);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = client.send(&cancel, "+905551111111", "hello").await.unwrap_err();

        assert!(matches!(err, DeliveryError::Cancelled));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dispatcher_marks_message_sent_after_two_failed_attempts() {
        let repo = Arc::new(InMemoryMessageRepository::new());
        let stored = repo
            .insert(NewMessage {
                phone_number: "+905551111111".to_string(),
                content: "hello".to_string(),
            })
            .await
            .unwrap();

        let transport =
            ScriptedTransport::new(vec![server_error(), server_error(), accepted("abc-123")]);
        let dispatcher =
            MessageDispatcher::new(repo.clone(), Arc::new(client(transport.clone(), 3)));

        let report = dispatcher
            .process_pending(&CancellationToken::new(), 2)
            .await
            .unwrap();

        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(transport.call_count(), 3);

        let message = repo.get(&stored.id).await.unwrap();
        assert_eq!(message.status, MessageStatus::Sent);
        assert_eq!(message.delivery_id.as_deref(), Some("abc-123"));
        assert!(message.sent_at.is_some());
    }

    /// Serves exactly one canned HTTP response and hands back the raw request.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/send", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                if n == 0 || request_complete(&raw) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&raw).into_owned()
        });

        (url, handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        raw.len() >= header_end + 4 + content_length
    }

    #[tokio::test]
    async fn http_transport_posts_json_with_auth_header() {
        let (url, server) =
            serve_once("202 Accepted", r#"{"message":"Accepted","messageId":"67f2f8a8"}"#).await;
        let transport =
            HttpWebhookTransport::new(url, "secret-key".to_string(), Duration::from_secs(5))
                .unwrap();

        let receipt = transport.post("+905551111111", "hello").await.unwrap();
        let request = server.await.unwrap();

        assert_eq!(receipt.delivery_id, "67f2f8a8");
        assert!(request.starts_with("POST /send"));
        assert!(request.to_ascii_lowercase().contains("x-ins-auth-key: secret-key"));
        assert!(request.to_ascii_lowercase().contains("content-type: application/json"));
        assert!(request.contains(r#""to":"+905551111111""#));
        assert!(request.contains(r#""content":"hello""#));
    }

    #[tokio::test]
    async fn http_transport_rejects_non_accepted_status() {
        let (url, server) = serve_once("201 Created", r#"{"messageId":"x"}"#).await;
        let transport =
            HttpWebhookTransport::new(url, "k".to_string(), Duration::from_secs(5)).unwrap();

        let err = transport.post("+905551111111", "hello").await.unwrap_err();
        server.await.unwrap();

        assert!(matches!(err, AttemptError::UnexpectedStatus { status: 201, .. }));
    }

    #[tokio::test]
    async fn http_transport_reports_undecodable_body() {
        let (url, server) = serve_once("200 OK", "not json").await;
        let transport =
            HttpWebhookTransport::new(url, "k".to_string(), Duration::from_secs(5)).unwrap();

        let err = transport.post("+905551111111", "hello").await.unwrap_err();
        server.await.unwrap();

        assert!(matches!(err, AttemptError::Decode(_)));
    }
}
