//! Webhook ingress. Signature verification gates everything; each accepted
//! text event is handled on its own task so the platform gets its 200
//! acknowledgement without waiting on catalog fetches.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};
use uuid::Uuid;

use bookline_db::DbPool;
use bookline_line::client::ReplyClient;
use bookline_line::webhook::{parse_envelope, verify_signature, MessageContent, WebhookEvent};

use crate::handler::UtteranceHandler;
use crate::health;

const SIGNATURE_HEADER: &str = "x-line-signature";

#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<UtteranceHandler>,
    pub channel_secret: SecretString,
    pub reply_client: Arc<dyn ReplyClient>,
}

pub fn router(state: AppState, db_pool: DbPool) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .with_state(state)
        .merge(health::router(db_pool))
}

pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if !verify_signature(state.channel_secret.expose_secret(), &body, signature) {
        warn!(
            event_name = "webhook.signature.rejected",
            "delivery rejected before parsing: signature verification failed"
        );
        return (StatusCode::UNAUTHORIZED, "signature verification failed");
    }

    let envelope = match parse_envelope(&body) {
        Ok(envelope) => envelope,
        Err(error) => {
            warn!(event_name = "webhook.payload.malformed", error = %error, "payload rejected");
            return (StatusCode::BAD_REQUEST, "malformed payload");
        }
    };

    for event in envelope.events {
        let WebhookEvent::Message(event) = event else {
            continue;
        };
        let MessageContent::Text { text } = event.message else {
            continue;
        };
        let Some(user_id) = event.source.user_id else {
            continue;
        };

        let correlation_id = Uuid::new_v4().to_string();
        let handler = Arc::clone(&state.handler);
        let reply_client = Arc::clone(&state.reply_client);
        let reply_token = event.reply_token;
        tokio::spawn(async move {
            let handled = handler.handle(&user_id, &text).await;
            info!(
                event_name = "webhook.turn.handled",
                correlation_id = %correlation_id,
                response_summary = %handled.turn.response_summary,
                "turn computed"
            );
            if let Err(error) = reply_client.reply(&reply_token, vec![handled.message]).await {
                warn!(
                    event_name = "line.reply.failed",
                    correlation_id = %correlation_id,
                    error = %error,
                    "reply delivery failed"
                );
            }
            // Session bookkeeping runs last; the reply already went out.
            handler.record_turn(handled.turn).await;
        });
    }

    (StatusCode::OK, "OK")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use hmac::{Hmac, Mac};
    use sha2::Sha256;
    use tower::ServiceExt;

    use bookline_db::{connect_with_settings, InMemorySessionStore};
    use bookline_line::flex::OutboundMessage;

    use crate::test_stubs::{
        handler_with, RecordingReplyClient, StubEmbeddingClient, StubPageFetcher, SEARCH_PAGE,
    };

    use super::{router, AppState};

    const CHANNEL_SECRET: &str = "route-test-secret";

    fn sign(body: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(CHANNEL_SECRET.as_bytes())
            .expect("hmac accepts any key length");
        mac.update(body.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }

    async fn test_state(reply_client: Arc<RecordingReplyClient>) -> AppState {
        let client = StubEmbeddingClient::for_catalog()
            .with_alias("ค้นหาหนังสือ สามก๊ก", "ค้นหาหนังสือ");
        let handler = handler_with(
            client,
            StubPageFetcher::returning(SEARCH_PAGE),
            Arc::new(InMemorySessionStore::default()),
        )
        .await;
        AppState {
            handler: Arc::new(handler),
            channel_secret: CHANNEL_SECRET.to_string().into(),
            reply_client,
        }
    }

    async fn test_router(reply_client: Arc<RecordingReplyClient>) -> axum::Router {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 5, 100)
            .await
            .expect("pool connects");
        router(test_state(reply_client).await, pool)
    }

    fn signed_request(body: &str) -> Request<Body> {
        Request::post("/webhook")
            .header("x-line-signature", sign(body))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds")
    }

    #[tokio::test]
    async fn unsigned_and_mis_signed_deliveries_are_rejected() {
        let app = test_router(Arc::new(RecordingReplyClient::default())).await;

        let unsigned = Request::post("/webhook")
            .body(Body::from(r#"{"events":[]}"#))
            .expect("request builds");
        let response = app.clone().oneshot(unsigned).await.expect("route responds");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let mis_signed = Request::post("/webhook")
            .header("x-line-signature", sign(r#"{"events":[{}]}"#))
            .body(Body::from(r#"{"events":[]}"#))
            .expect("request builds");
        let response = app.oneshot(mis_signed).await.expect("route responds");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_payload_is_rejected_only_after_the_signature_passes() {
        let app = test_router(Arc::new(RecordingReplyClient::default())).await;
        let response =
            app.oneshot(signed_request("not json")).await.expect("route responds");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn empty_delivery_acknowledges_immediately() {
        let app = test_router(Arc::new(RecordingReplyClient::default())).await;
        let response =
            app.oneshot(signed_request(r#"{"events":[]}"#)).await.expect("route responds");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn text_message_event_produces_a_reply_through_the_client() {
        let reply_client = Arc::new(RecordingReplyClient::default());
        let app = test_router(Arc::clone(&reply_client)).await;

        let body = r#"{
            "events": [{
                "type": "message",
                "replyToken": "reply-42",
                "source": {"type": "user", "userId": "U-route"},
                "message": {"type": "text", "id": "m-1", "text": "ค้นหาหนังสือ สามก๊ก"}
            }]
        }"#;
        let response = app.oneshot(signed_request(body)).await.expect("route responds");
        assert_eq!(response.status(), StatusCode::OK);

        // The turn runs on a spawned task after the acknowledgement.
        let mut replies = reply_client.replies();
        for _ in 0..50 {
            if !replies.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            replies = reply_client.replies();
        }
        assert_eq!(replies.len(), 1);
        let (reply_token, messages) = &replies[0];
        assert_eq!(reply_token, "reply-42");
        assert_eq!(messages.len(), 1);
        assert!(matches!(messages[0], OutboundMessage::Flex { .. }));
    }

    #[tokio::test]
    async fn non_text_events_are_acknowledged_without_a_reply() {
        let reply_client = Arc::new(RecordingReplyClient::default());
        let app = test_router(Arc::clone(&reply_client)).await;

        let body = r#"{
            "events": [
                {"type": "follow", "replyToken": "r", "source": {"type": "user"}},
                {
                    "type": "message",
                    "replyToken": "reply-43",
                    "source": {"type": "user", "userId": "U-route"},
                    "message": {"type": "sticker", "packageId": "1", "stickerId": "2"}
                }
            ]
        }"#;
        let response = app.oneshot(signed_request(body)).await.expect("route responds");
        assert_eq!(response.status(), StatusCode::OK);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(reply_client.replies().is_empty());
    }
}
