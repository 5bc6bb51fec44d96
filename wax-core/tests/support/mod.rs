use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use wax_core::api::models::OwnerRecord;
use wax_core::api::ApiError;
use wax_core::owners::OwnerSource;

/// Initialize tracing for tests with proper test output handling
#[allow(dead_code)]
pub fn tracing_init() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_line_number(true)
        .with_target(false)
        .with_file(true)
        .try_init();
}

/// Build an owner record with a fresh user id.
#[allow(dead_code)]
pub fn owner(display_name: &str) -> OwnerRecord {
    OwnerRecord {
        user_id: uuid::Uuid::new_v4().to_string(),
        display_name: display_name.to_string(),
        avatar_icon: "disc".to_string(),
        avatar_color: "#112233".to_string(),
        avatar_accent: "#445566".to_string(),
        copy_count: 1,
    }
}

/// Scripted [`OwnerSource`] that records every batch call.
///
/// `hold()` installs a gate so the next fetch blocks until `release()`,
/// which is how tests pin a dispatch pass "in flight" deterministically.
pub struct MockOwnerSource {
    owners: Mutex<HashMap<String, Vec<OwnerRecord>>>,
    calls: Mutex<Vec<Vec<String>>>,
    fail_remaining: AtomicUsize,
    gate: Mutex<Option<Arc<Notify>>>,
}

#[allow(dead_code)]
impl MockOwnerSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            owners: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            fail_remaining: AtomicUsize::new(0),
            gate: Mutex::new(None),
        })
    }

    pub fn set_owners(&self, entity_id: &str, owners: Vec<OwnerRecord>) {
        self.owners
            .lock()
            .unwrap()
            .insert(entity_id.to_string(), owners);
    }

    /// Fail the next `count` batch calls with a server error.
    pub fn fail_next(&self, count: usize) {
        self.fail_remaining.store(count, Ordering::SeqCst);
    }

    /// Block upcoming fetches until `release()`.
    pub fn hold(&self) {
        *self.gate.lock().unwrap() = Some(Arc::new(Notify::new()));
    }

    /// Unblock the in-flight fetch and let later ones through.
    pub fn release(&self) {
        if let Some(gate) = self.gate.lock().unwrap().take() {
            // At most one fetch can be waiting (single in-flight dispatch).
            gate.notify_one();
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl OwnerSource for MockOwnerSource {
    async fn fetch_owners(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, Vec<OwnerRecord>>, ApiError> {
        self.calls.lock().unwrap().push(ids.to_vec());

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ApiError::Server {
                status: 500,
                body: "batch lookup failed".to_string(),
            });
        }

        let owners = self.owners.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| owners.get(id).map(|v| (id.clone(), v.clone())))
            .collect())
    }
}

/// Yield until `cond` holds. Panics if it never does; with the
/// current-thread test runtime this is deterministic, not timing-based.
#[allow(dead_code)]
pub async fn wait_until(cond: impl Fn() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached after 200 yields");
}

/// Let any spawned dispatch passes run to completion.
#[allow(dead_code)]
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}
