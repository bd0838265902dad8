//! Client frame dispatch: parses a text frame as a [`ClientEvent`] and routes
//! it to the relay hub.

use relay_core::{ClientEvent, ClientFrame, ServerEvent, SessionId};
use tracing::{debug, instrument, warn};

use crate::relay::Relay;

/// Handle one text frame from a session.
///
/// Returns the event to send back to that session, if any. Malformed frames
/// and unknown events produce an `error` event.
#[instrument(skip_all, fields(session_id = %session_id, event_type))]
pub async fn handle_frame(relay: &Relay, session_id: &SessionId, text: &str) -> Option<ServerEvent> {
    let event = match ClientFrame::parse(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "rejected client frame");
            metrics::counter!(crate::metrics::WS_INVALID_FRAMES_TOTAL).increment(1);
            return Some(ServerEvent::error(e.to_string()));
        }
    };

    match event {
        ClientEvent::SetUsername { username } => {
            let _ = tracing::Span::current().record("event_type", "set_username");
            Some(relay.set_display_name(session_id, username.as_deref()))
        }
        ClientEvent::SendMessage { message } => {
            let _ = tracing::Span::current().record("event_type", "send_message");
            match relay.send_outbound(session_id, &message).await {
                Ok(reply) => reply,
                Err(e) => {
                    debug!(code = e.code(), "outbound rejected");
                    Some(ServerEvent::from(&e))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use assert_matches::assert_matches;

    use crate::test_support::CountingWebhook;

    fn relay() -> (Relay, Arc<CountingWebhook>) {
        let hook = Arc::new(CountingWebhook::default());
        (Relay::new(hook.clone(), 1), hook)
    }

    #[tokio::test]
    async fn set_username_replies_with_name() {
        let (relay, _) = relay();
        let id = SessionId::from("s1");
        let reply = handle_frame(
            &relay,
            &id,
            r#"{"type":"set_username","data":{"username":"bob"}}"#,
        )
        .await;
        assert_eq!(
            reply,
            Some(ServerEvent::UsernameSet {
                username: "bob".into()
            })
        );
    }

    #[tokio::test]
    async fn set_username_without_data_is_anonymous() {
        let (relay, _) = relay();
        let reply = handle_frame(&relay, &SessionId::from("s1"), r#"{"type":"set_username"}"#).await;
        assert_eq!(
            reply,
            Some(ServerEvent::UsernameSet {
                username: "Anonymous".into()
            })
        );
    }

    #[tokio::test]
    async fn send_before_name_is_error() {
        let (relay, hook) = relay();
        let reply = handle_frame(
            &relay,
            &SessionId::from("s1"),
            r#"{"type":"send_message","data":{"message":"hi"}}"#,
        )
        .await;
        assert_eq!(reply, Some(ServerEvent::error("Please set a username first")));
        assert_eq!(hook.calls(), 0);
    }

    #[tokio::test]
    async fn send_after_name_is_acknowledged() {
        let (relay, hook) = relay();
        let id = SessionId::from("s1");
        let _ = handle_frame(&relay, &id, r#"{"type":"set_username","data":{"username":""}}"#).await;
        let reply = handle_frame(
            &relay,
            &id,
            r#"{"type":"send_message","data":{"message":"hi"}}"#,
        )
        .await;
        assert_matches!(
            reply,
            Some(ServerEvent::MessageSent { ref username, ref content, .. })
                if username == "Anonymous" && content == "hi"
        );
        assert_eq!(hook.calls(), 1);
    }

    #[tokio::test]
    async fn blank_message_has_no_reply() {
        let (relay, hook) = relay();
        let id = SessionId::from("s1");
        let _ = relay.set_display_name(&id, Some("bob"));
        let reply = handle_frame(
            &relay,
            &id,
            r#"{"type":"send_message","data":{"message":"   "}}"#,
        )
        .await;
        assert_eq!(reply, None);
        assert_eq!(hook.calls(), 0);
    }

    #[tokio::test]
    async fn invalid_json_is_error() {
        let (relay, _) = relay();
        let reply = handle_frame(&relay, &SessionId::from("s1"), "not json").await;
        assert_matches!(
            reply,
            Some(ServerEvent::Error { ref message }) if message.starts_with("Invalid JSON")
        );
    }

    #[tokio::test]
    async fn unknown_event_is_error() {
        let (relay, _) = relay();
        let reply = handle_frame(&relay, &SessionId::from("s1"), r#"{"type":"dance"}"#).await;
        assert_eq!(reply, Some(ServerEvent::error("Unknown event: dance")));
    }
}
