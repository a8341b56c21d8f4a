//! Main HTTP server: LINE webhook intake and health endpoint.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use anyhow::Result;
use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use http_body::{Frame, SizeHint};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, instrument, warn};

use linerelay_channels::LineWebhook;

use crate::relay::RelayService;

pub const SERVICE_NAME: &str = "line-copilot-relay";

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub relay: Arc<RelayService>,
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(relay: Arc<RelayService>) -> Self {
        Self {
            relay,
            started_at: Instant::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: String,
    pub service: String,
    pub uptime_seconds: u64,
    pub cached_conversations: usize,
    pub timestamp: DateTime<Utc>,
}

/// Build the router. Anything other than the webhook POST and the health check is 404.
pub fn build_router(state: GatewayState, webhook_path: &str) -> Router {
    Router::new()
        .route(
            webhook_path,
            post(webhook_handler).fallback(|| async { StatusCode::NOT_FOUND }),
        )
        .route("/api/health", get(health))
        .with_state(state)
}

/// Acknowledge the webhook at once; the batch is relayed on a detached task that
/// starts its backend work only after the server has released the ack body.
///
/// The platform expects a fast 200 whatever the payload, so an undecodable body is
/// logged and acknowledged too.
async fn webhook_handler(State(state): State<GatewayState>, body: Bytes) -> Response {
    match LineWebhook::from_slice(&body) {
        Ok(webhook) if webhook.events.is_empty() => {
            debug!("Webhook with no events acknowledged");
            StatusCode::OK.into_response()
        }
        Ok(webhook) => {
            info!(events = webhook.events.len(), "Webhook received");
            let (ack, acked) = AckBody::new();
            state.relay.dispatch_after(webhook.events, async move {
                let _ = acked.await;
            });
            (StatusCode::OK, Body::new(ack)).into_response()
        }
        Err(e) => {
            warn!(error = %e, bytes = body.len(), "Undecodable webhook body acknowledged");
            StatusCode::OK.into_response()
        }
    }
}

/// Empty response body that fires a signal once the server is done with it.
///
/// Hyper drops a body after its last frame has been taken for writing, or when the
/// connection goes away; either way the ack is no longer pending.
struct AckBody {
    sent: Option<oneshot::Sender<()>>,
}

impl AckBody {
    fn new() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (Self { sent: Some(tx) }, rx)
    }
}

impl http_body::Body for AckBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, Infallible>>> {
        Poll::Ready(None)
    }

    fn is_end_stream(&self) -> bool {
        true
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(0)
    }
}

impl Drop for AckBody {
    fn drop(&mut self) {
        if let Some(tx) = self.sent.take() {
            let _ = tx.send(());
        }
    }
}

/// Handler for `GET /api/health`
async fn health(State(state): State<GatewayState>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok".into(),
        service: SERVICE_NAME.into(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        cached_conversations: state.relay.cache().len().await,
        timestamp: Utc::now(),
    })
}

/// Starts the HTTP server and runs until Ctrl-C or SIGTERM.
#[instrument(skip(state))]
pub async fn start_server(addr: &str, webhook_path: &str, state: GatewayState) -> Result<()> {
    let app = build_router(state, webhook_path).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, webhook_path, service = SERVICE_NAME, "Relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::ReplyPoller;
    use axum::body::Body;
    use axum::http::Request;
    use linerelay_channels::mock::{MockBotBackend, RecordingReplySink, bot_messages};
    use serde_json::{Value, json};
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(backend: &Arc<MockBotBackend>, sink: &Arc<RecordingReplySink>) -> (Router, GatewayState) {
        let relay = Arc::new(RelayService::new(
            backend.clone(),
            sink.clone(),
            ReplyPoller::new(3, Duration::from_secs(1)),
        ));
        let state = GatewayState::new(relay);
        (build_router(state.clone(), "/"), state)
    }

    fn post_json(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn hello_batch() -> Value {
        json!({
            "destination": "Ubot",
            "events": [{
                "type": "message",
                "message": { "type": "text", "id": "1", "text": "hello" },
                "source": { "type": "user", "userId": "U1" },
                "replyToken": "R1"
            }]
        })
    }

    #[tokio::test(start_paused = true)]
    async fn webhook_acks_then_relays() {
        let backend = Arc::new(MockBotBackend::new().with_poll(bot_messages(&["Hi!"], "1")));
        let sink = Arc::new(RecordingReplySink::new());
        let (router, _) = app(&backend, &sink);

        let response = router.oneshot(post_json(hello_batch())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(backend.create_count(), 1);
        assert_eq!(sink.replies(), vec![("R1".to_string(), "Hi!".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn backend_untouched_until_ack_is_released() {
        let backend = Arc::new(MockBotBackend::new().with_poll(bot_messages(&["Hi!"], "1")));
        let sink = Arc::new(RecordingReplySink::new());
        let (router, _) = app(&backend, &sink);

        let response = router.oneshot(post_json(hello_batch())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            http_body::Body::size_hint(response.body()).exact(),
            Some(0)
        );

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(backend.calls().is_empty());

        drop(response);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(backend.create_count(), 1);
        assert_eq!(sink.replies(), vec![("R1".to_string(), "Hi!".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn ack_does_not_wait_for_backend() {
        let backend = Arc::new(MockBotBackend::new().hanging());
        let sink = Arc::new(RecordingReplySink::new());
        let (router, _) = app(&backend, &sink);

        let response = tokio::time::timeout(
            Duration::from_millis(100),
            router.oneshot(post_json(hello_batch())),
        )
        .await
        .expect("webhook ack must not wait on the bot backend")
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(sink.replies().is_empty());
    }

    #[tokio::test]
    async fn malformed_body_still_acks() {
        let backend = Arc::new(MockBotBackend::new());
        let sink = Arc::new(RecordingReplySink::new());
        let (router, _) = app(&backend, &sink);

        let request = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from("not json"))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn verification_call_with_empty_events() {
        let backend = Arc::new(MockBotBackend::new());
        let sink = Arc::new(RecordingReplySink::new());
        let (router, _) = app(&backend, &sink);

        let response = router
            .oneshot(post_json(json!({ "destination": "Ubot", "events": [] })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn other_methods_are_not_found() {
        let backend = Arc::new(MockBotBackend::new());
        let sink = Arc::new(RecordingReplySink::new());
        let (router, _) = app(&backend, &sink);

        let get_root = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = router.clone().oneshot(get_root).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let unknown = Request::builder()
            .method("POST")
            .uri("/elsewhere")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(unknown).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_reports_cached_conversations() {
        let backend = Arc::new(MockBotBackend::new());
        let sink = Arc::new(RecordingReplySink::new());
        let (router, state) = app(&backend, &sink);
        state
            .relay
            .cache()
            .put("U1", linerelay_core::ConversationSession::new("conv-1", "t"))
            .await;

        let request = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let report: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(report["status"], "ok");
        assert_eq!(report["service"], SERVICE_NAME);
        assert_eq!(report["cached_conversations"], 1);
    }
}
