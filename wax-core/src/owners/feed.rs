//! SSE client for the backend's ownership live-update feed.
//!
//! One feed connection serves both loader instances: events carry the entity
//! scope, and `spawn_owner_bridge` forwards the matching ones into each
//! controller. The connection retries forever with exponential backoff; a
//! dropped event is recovered by the next refresh-all or visibility pass,
//! which is the loader's eventual-consistency posture anyway.

use super::{OwnerScope, OwnersService};
use crate::config::{Config, FEED_PATH};
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// An ownership-change notification from the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// One entity's ownership data may have changed.
    Changed {
        scope: OwnerScope,
        entity_id: String,
    },
    /// Bulk invalidation: refetch everything visible.
    RefreshAll,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFeedEvent {
    #[serde(default)]
    entity_id: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    refresh_all: bool,
}

/// Consumes the backend's SSE endpoint and republishes parsed events on a
/// broadcast channel.
pub struct OwnersFeed {
    url: String,
    session_token: String,
    event_tx: broadcast::Sender<FeedEvent>,
}

impl OwnersFeed {
    pub fn new(config: &Config, session_token: impl Into<String>) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            url: format!("{}{}", config.api_url.trim_end_matches('/'), FEED_PATH),
            session_token: session_token.into(),
            event_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.event_tx.subscribe()
    }

    /// Spawn the connection loop. Runs until the handle is aborted.
    pub fn spawn(&self) -> JoinHandle<()> {
        let url = self.url.clone();
        let token = self.session_token.clone();
        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            run_feed(url, token, event_tx).await;
        })
    }
}

async fn run_feed(url: String, token: String, event_tx: broadcast::Sender<FeedEvent>) {
    let client = reqwest::Client::new();
    let mut attempt: u32 = 0;
    loop {
        let request = client.get(&url).bearer_auth(&token);
        let mut source = match EventSource::new(request) {
            Ok(source) => source,
            Err(e) => {
                warn!("Cannot open ownership feed to {url}: {e}");
                return;
            }
        };

        while let Some(event) = source.next().await {
            match event {
                Ok(Event::Open) => {
                    info!("Ownership feed connected");
                    attempt = 0;
                }
                Ok(Event::Message(msg)) => {
                    if let Some(feed_event) = parse_feed_event(&msg) {
                        let _ = event_tx.send(feed_event);
                    }
                }
                Err(e) => {
                    debug!("Ownership feed error: {e}");
                    source.close();
                    break;
                }
            }
        }

        attempt += 1;
        let delay = backoff_delay(attempt);
        warn!(
            "Ownership feed disconnected, reconnecting in {}s (attempt {attempt})",
            delay.as_secs()
        );
        tokio::time::sleep(delay).await;
    }
}

/// 1s, 2s, 4s, ... capped at 30s.
fn backoff_delay(attempt: u32) -> Duration {
    let secs = 1u64 << (attempt.clamp(1, 6) - 1);
    Duration::from_secs(secs.min(30))
}

fn parse_feed_event(msg: &eventsource_stream::Event) -> Option<FeedEvent> {
    // Keepalives come through as comment-ish messages with no payload.
    if msg.data.is_empty() || msg.data == "keepalive" {
        return None;
    }
    if msg.event != "owners" && msg.event != "message" {
        debug!("Ignoring unknown feed event type: {}", msg.event);
        return None;
    }
    let wire: WireFeedEvent = match serde_json::from_str(&msg.data) {
        Ok(wire) => wire,
        Err(e) => {
            debug!("Malformed feed event ({e}): {}", msg.data);
            return None;
        }
    };
    if wire.refresh_all {
        return Some(FeedEvent::RefreshAll);
    }
    let entity_id = wire.entity_id?;
    let scope = match wire.scope.as_deref() {
        Some("album") => OwnerScope::Album,
        Some("pressing") => OwnerScope::Pressing,
        other => {
            debug!("Feed event with unknown scope {other:?}");
            return None;
        }
    };
    Some(FeedEvent::Changed { scope, entity_id })
}

/// Forward feed events for one scope into a controller instance.
///
/// Ends when the feed sender is dropped or the service shuts down. A lagged
/// receiver skips ahead; the missed invalidations are covered by the next
/// refresh-all or visibility change.
pub fn spawn_owner_bridge(
    service: OwnersService,
    scope: OwnerScope,
    mut events: broadcast::Receiver<FeedEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(FeedEvent::Changed {
                    scope: event_scope,
                    entity_id,
                }) => {
                    if event_scope == scope {
                        service.invalidate(&entity_id);
                    }
                }
                Ok(FeedEvent::RefreshAll) => service.refresh_all(),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("Owner bridge ({}) lagged, skipped {missed} events", scope.as_str());
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
            if service.is_shut_down() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sse_event(event: &str, data: &str) -> eventsource_stream::Event {
        eventsource_stream::Event {
            event: event.to_string(),
            data: data.to_string(),
            id: String::new(),
            retry: None,
        }
    }

    #[test]
    fn parse_targeted_event() {
        let msg = sse_event("owners", r#"{"scope": "album", "entityId": "alb-1"}"#);
        assert_eq!(
            parse_feed_event(&msg),
            Some(FeedEvent::Changed {
                scope: OwnerScope::Album,
                entity_id: "alb-1".to_string()
            })
        );
    }

    #[test]
    fn parse_refresh_all() {
        let msg = sse_event("owners", r#"{"refreshAll": true}"#);
        assert_eq!(parse_feed_event(&msg), Some(FeedEvent::RefreshAll));
    }

    #[test]
    fn keepalive_and_unknown_events_are_skipped() {
        assert_eq!(parse_feed_event(&sse_event("owners", "")), None);
        assert_eq!(parse_feed_event(&sse_event("owners", "keepalive")), None);
        assert_eq!(
            parse_feed_event(&sse_event("scan", r#"{"entityId": "x"}"#)),
            None
        );
    }

    #[test]
    fn malformed_payloads_are_skipped() {
        assert_eq!(parse_feed_event(&sse_event("owners", "{not json")), None);
        // Missing scope on a targeted event
        assert_eq!(
            parse_feed_event(&sse_event("owners", r#"{"entityId": "alb-1"}"#)),
            None
        );
    }

    #[test]
    fn backoff_caps_at_30s() {
        assert_eq!(backoff_delay(1), Duration::from_secs(1));
        assert_eq!(backoff_delay(2), Duration::from_secs(2));
        assert_eq!(backoff_delay(5), Duration::from_secs(16));
        assert_eq!(backoff_delay(6), Duration::from_secs(30));
        assert_eq!(backoff_delay(40), Duration::from_secs(30));
    }
}
