//! The owner-batching controller.
//!
//! Callers hand the service the entity IDs they currently render
//! ([`OwnersService::set_visible`]); the service coalesces everything that
//! still needs a lookup into chunked batch calls against an injected
//! [`OwnerSource`], writes the results into its cache, and notifies
//! subscribers. Invalidation events from the live-update feed re-queue
//! visible entries and park invisible ones until they come on screen.

use super::OwnersEvent;
use crate::api::models::OwnerRecord;
use crate::api::ApiError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::debug;

/// Resolves owner lists for a bounded batch of entity IDs.
///
/// IDs absent from the returned map mean "no owners", not an error.
#[async_trait]
pub trait OwnerSource: Send + Sync {
    async fn fetch_owners(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, Vec<OwnerRecord>>, ApiError>;
}

/// Mutable session state. Lives behind one mutex; the lock is never held
/// across the batch network call, so every mutation between awaits is atomic
/// with respect to the others.
struct OwnersState {
    /// Pending lookups, in enqueue order, no duplicates.
    queue: VecDeque<String>,
    /// Membership mirror of `queue` for O(1) tests.
    queued: HashSet<String>,
    /// Every ID ever enqueued. Gates re-enqueue from visibility input;
    /// invalidations bypass it. Failed chunks are evicted so the next
    /// visibility pass retries them naturally.
    requested: HashSet<String>,
    /// Invalidations waiting for their ID to become visible (or for the
    /// in-flight pass to finish). At most one entry per ID.
    deferred: HashSet<String>,
    /// Most recent caller-supplied interest set.
    visible: HashSet<String>,
    /// Latest known owner list per entity ID. Whole-value replace on every
    /// successful chunk, never a merge.
    owners: HashMap<String, Vec<OwnerRecord>>,
    /// True while a dispatch pass is running. The sole concurrency gate:
    /// at most one batch call is in flight at any instant.
    in_flight: bool,
    /// Cleared by `shutdown()`; suppresses all cache writes afterward.
    mounted: bool,
}

impl OwnersState {
    fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            queued: HashSet::new(),
            requested: HashSet::new(),
            deferred: HashSet::new(),
            visible: HashSet::new(),
            owners: HashMap::new(),
            in_flight: false,
            mounted: true,
        }
    }

    fn enqueue(&mut self, id: String) {
        self.requested.insert(id.clone());
        if self.queued.insert(id.clone()) {
            self.queue.push_back(id);
        }
    }

    /// Move deferred entries that are now visible into the queue.
    fn replay_deferred(&mut self) {
        let eligible: Vec<String> = self
            .deferred
            .iter()
            .filter(|id| self.visible.contains(*id))
            .cloned()
            .collect();
        for id in eligible {
            self.deferred.remove(&id);
            self.enqueue(id);
        }
    }
}

struct Inner {
    state: Mutex<OwnersState>,
    source: Arc<dyn OwnerSource>,
    chunk_size: usize,
    event_tx: broadcast::Sender<OwnersEvent>,
}

/// The owner-batching loader. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct OwnersService {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for OwnersService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnersService")
            .field("chunk_size", &self.inner.chunk_size)
            .finish_non_exhaustive()
    }
}

impl OwnersService {
    pub fn new(source: Arc<dyn OwnerSource>, chunk_size: usize) -> Self {
        let (event_tx, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(OwnersState::new()),
                source,
                chunk_size: chunk_size.max(1),
                event_tx,
            }),
        }
    }

    /// Subscribe to owner-data change events.
    pub fn subscribe(&self) -> broadcast::Receiver<OwnersEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Record the entity IDs the caller currently renders.
    ///
    /// IDs never requested before are queued for lookup; deferred
    /// invalidations whose ID is in the new set are replayed. Calling this
    /// twice with the same set issues no additional network calls.
    pub fn set_visible<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let should_dispatch = {
            let mut state = self.inner.state.lock().expect("owners state poisoned");
            if !state.mounted {
                return;
            }
            let visible: HashSet<String> = ids.into_iter().map(Into::into).collect();
            let fresh: Vec<String> = visible
                .iter()
                .filter(|id| !state.requested.contains(*id))
                .cloned()
                .collect();
            state.visible = visible;
            for id in fresh {
                state.enqueue(id);
            }
            state.replay_deferred();
            !state.queue.is_empty()
        };
        if should_dispatch {
            self.trigger_dispatch();
        }
    }

    /// Handle a targeted "ownership changed" event for one entity.
    ///
    /// Visible and idle: refetch now. Visible but already queued or mid-pass:
    /// park in the deferred set so the in-flight request is not duplicated.
    /// Invisible: park until the ID comes on screen.
    pub fn invalidate(&self, entity_id: &str) {
        let should_dispatch = {
            let mut state = self.inner.state.lock().expect("owners state poisoned");
            if !state.mounted {
                return;
            }
            if !state.visible.contains(entity_id) {
                state.deferred.insert(entity_id.to_string());
                false
            } else if state.in_flight || state.queued.contains(entity_id) {
                state.deferred.insert(entity_id.to_string());
                false
            } else {
                state.enqueue(entity_id.to_string());
                true
            }
        };
        if should_dispatch {
            self.trigger_dispatch();
        }
    }

    /// Handle a "refresh all" broadcast: refetch every visible entity.
    pub fn refresh_all(&self) {
        let should_dispatch = {
            let mut state = self.inner.state.lock().expect("owners state poisoned");
            if !state.mounted {
                return;
            }
            if state.in_flight {
                let visible: Vec<String> = state.visible.iter().cloned().collect();
                for id in visible {
                    state.deferred.insert(id);
                }
                false
            } else {
                let visible: Vec<String> = state.visible.iter().cloned().collect();
                for id in visible {
                    state.enqueue(id);
                }
                !state.queue.is_empty()
            }
        };
        if should_dispatch {
            self.trigger_dispatch();
        }
    }

    /// Latest known owner list for one entity. `None` means not fetched yet.
    pub fn owners_for(&self, entity_id: &str) -> Option<Vec<OwnerRecord>> {
        let state = self.inner.state.lock().expect("owners state poisoned");
        state.owners.get(entity_id).cloned()
    }

    /// Snapshot of the full owners-by-entity mapping.
    pub fn snapshot(&self) -> HashMap<String, Vec<OwnerRecord>> {
        let state = self.inner.state.lock().expect("owners state poisoned");
        state.owners.clone()
    }

    /// Tear the loader down. A pass already in flight completes its network
    /// call but discards the result instead of writing to the cache.
    pub fn shutdown(&self) {
        let mut state = self.inner.state.lock().expect("owners state poisoned");
        state.mounted = false;
    }

    pub fn is_shut_down(&self) -> bool {
        let state = self.inner.state.lock().expect("owners state poisoned");
        !state.mounted
    }

    /// Start a dispatch pass unless one is already running. The pass runs on
    /// a spawned task, so enqueues from the same scheduling window coalesce
    /// into a single pass.
    fn trigger_dispatch(&self) {
        {
            let mut state = self.inner.state.lock().expect("owners state poisoned");
            if state.in_flight || state.queue.is_empty() || !state.mounted {
                return;
            }
            state.in_flight = true;
        }
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.run_pass().await;
        });
    }
}

impl Inner {
    /// One dispatch pass: drain the queue chunk by chunk, one batch call at
    /// a time, then replay deferred entries and keep going if that produced
    /// new work. `in_flight` stays set for the whole pass.
    async fn run_pass(self: Arc<Self>) {
        loop {
            let chunk: Vec<String> = {
                let mut state = self.state.lock().expect("owners state poisoned");
                if !state.mounted {
                    state.in_flight = false;
                    return;
                }
                let take = self.chunk_size.min(state.queue.len());
                let chunk: Vec<String> = state.queue.drain(..take).collect();
                // Clear queued-set membership now so invalidations arriving
                // during the network call can re-queue these IDs.
                for id in &chunk {
                    state.queued.remove(id);
                }
                chunk
            };

            if chunk.is_empty() {
                let more = {
                    let mut state = self.state.lock().expect("owners state poisoned");
                    state.replay_deferred();
                    if state.queue.is_empty() {
                        state.in_flight = false;
                        false
                    } else {
                        true
                    }
                };
                if !more {
                    return;
                }
                continue;
            }

            debug!("Dispatching owner batch of {} entities", chunk.len());
            let result = self.source.fetch_owners(&chunk).await;

            let updated: Option<Vec<String>> = {
                let mut state = self.state.lock().expect("owners state poisoned");
                if !state.mounted {
                    // Late response after shutdown: discard, and release the
                    // claimed IDs so they are not stuck "requested" with no
                    // cached value.
                    for id in &chunk {
                        state.requested.remove(id);
                    }
                    state.in_flight = false;
                    return;
                }
                match result {
                    Ok(mut owners) => {
                        for id in &chunk {
                            let records = owners.remove(id).unwrap_or_default();
                            state.owners.insert(id.clone(), records);
                        }
                        Some(chunk)
                    }
                    Err(e) => {
                        // Release the chunk back to "unrequested" so the next
                        // visibility pass retries it. No timer retry, no error
                        // surfaced: owner badges just stay absent.
                        debug!("Owner batch of {} entities failed: {e}", chunk.len());
                        for id in &chunk {
                            state.requested.remove(id);
                        }
                        None
                    }
                }
            };

            if let Some(entity_ids) = updated {
                let _ = self.event_tx.send(OwnersEvent::Updated { entity_ids });
            }
        }
    }
}
