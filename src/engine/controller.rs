// ── Engine: Operation Controller ───────────────────────────────────────────
// Single-flight state machine between the presentation layer and the domain
// client. Two states, Idle and Busy, plus an error slot and results slots
// that persist across transitions.
//
// The busy gate is checked-and-set synchronously (inside `send_if_modified`,
// with no await between check and set), so no scheduler interleaving can
// ever admit two mutating operations at once. A call that arrives while
// Busy is a silent no-op: it does not queue, does not error, and does not
// touch state.
//
// Streaming chat/agent runs do NOT pass through here — they are an
// independent concurrency domain with a caller-local busy indicator, and may
// run alongside controller operations.

use tokio::sync::watch;

use crate::atoms::constants::DEFAULT_RECENT_LIMIT;
use crate::atoms::error::ClientError;
use crate::atoms::types::OperationState;
use crate::engine::client::CognitiveApi;

/// Single-flight controller over the request/response operations.
///
/// Consumers observe state through [`state`](Controller::state) snapshots or
/// a [`watch`](Controller::watch) receiver notified on every change; they
/// never mutate it directly.
pub struct Controller<C: CognitiveApi> {
    api: C,
    state: watch::Sender<OperationState>,
}

impl<C: CognitiveApi> Controller<C> {
    pub fn new(api: C) -> Self {
        Controller {
            api,
            state: watch::Sender::new(OperationState::default()),
        }
    }

    /// Read-only snapshot of the current state.
    pub fn state(&self) -> OperationState {
        self.state.borrow().clone()
    }

    /// Subscribe to state-change notifications.
    pub fn watch(&self) -> watch::Receiver<OperationState> {
        self.state.subscribe()
    }

    /// Idle → Busy, clearing the error slot. Returns false (and changes
    /// nothing) if already Busy.
    fn begin(&self) -> bool {
        let mut started = false;
        self.state.send_if_modified(|s| {
            if s.busy {
                return false;
            }
            s.busy = true;
            s.error.clear();
            started = true;
            true
        });
        started
    }

    /// Busy → Idle on success, replacing a results slot wholesale.
    fn settle_ok(&self, apply: impl FnOnce(&mut OperationState)) {
        self.state.send_modify(|s| {
            apply(s);
            s.busy = false;
        });
    }

    /// Busy → Idle on failure. Results slots are left untouched.
    fn settle_err(&self, e: ClientError) {
        log::warn!("[controller] Operation failed: {}", e);
        self.state.send_modify(|s| {
            s.error = e.to_string();
            s.busy = false;
        });
    }

    // ── Mutating operations ────────────────────────────────────────────

    /// Submit a task. On success the last-task slot is replaced and a
    /// recent-memory refresh runs automatically as the next busy cycle.
    pub async fn submit_task(&self, text: &str) {
        if !self.begin() {
            return;
        }
        match self.api.submit_task(text).await {
            Ok(response) => {
                self.settle_ok(|s| s.last_task_response = Some(response));
                self.refresh_recent_memory(None, DEFAULT_RECENT_LIMIT).await;
            }
            Err(e) => self.settle_err(e),
        }
    }

    /// Refresh the memory-items slot from `/memory/recent`.
    pub async fn refresh_recent_memory(&self, memory_type: Option<&str>, limit: u32) {
        if !self.begin() {
            return;
        }
        match self.api.recent_memory(memory_type, limit).await {
            Ok(response) => self.settle_ok(|s| s.memory_items = response.results),
            Err(e) => self.settle_err(e),
        }
    }

    /// Replace the memory-items slot with query results.
    pub async fn query_memory(&self, query: &str, types: Option<&[String]>, limit: u32) {
        if !self.begin() {
            return;
        }
        match self.api.query_memory(query, types, limit).await {
            Ok(response) => self.settle_ok(|s| s.memory_items = response.results),
            Err(e) => self.settle_err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::error::ClientResult;
    use crate::atoms::types::{MemoryItem, MemoryQueryResponse, TaskResponse};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::sync::Notify;

    fn saved_note_response() -> TaskResponse {
        TaskResponse {
            task_id: "t1".into(),
            intent: "note".into(),
            ok: true,
            message: "saved".into(),
            data: serde_json::Map::new(),
        }
    }

    fn items(n: usize) -> Vec<MemoryItem> {
        (0..n)
            .map(|i| MemoryItem {
                id: i as i64,
                memory_type: "episodic".into(),
                content: format!("item {}", i),
                metadata: serde_json::Map::new(),
                source_task_id: None,
                created_at: String::new(),
                updated_at: String::new(),
            })
            .collect()
    }

    /// Mock backend: counts calls, optionally parks `submit_task` until
    /// released, optionally fails everything with HTTP 500.
    #[derive(Default)]
    struct MockApi {
        release: Notify,
        gate_submit: AtomicBool,
        fail: AtomicBool,
        submits: AtomicU32,
        recents: AtomicU32,
        queries: AtomicU32,
        recent_items: usize,
    }

    #[async_trait]
    impl CognitiveApi for Arc<MockApi> {
        async fn submit_task(&self, _text: &str) -> ClientResult<TaskResponse> {
            self.submits.fetch_add(1, Ordering::SeqCst);
            if self.gate_submit.load(Ordering::SeqCst) {
                self.release.notified().await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(ClientError::api(500, "internal server error"));
            }
            Ok(saved_note_response())
        }

        async fn recent_memory(
            &self,
            _memory_type: Option<&str>,
            _limit: u32,
        ) -> ClientResult<MemoryQueryResponse> {
            self.recents.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(ClientError::api(500, "internal server error"));
            }
            Ok(MemoryQueryResponse {
                ok: true,
                count: self.recent_items as u64,
                results: items(self.recent_items),
            })
        }

        async fn query_memory(
            &self,
            _query: &str,
            _types: Option<&[String]>,
            _limit: u32,
        ) -> ClientResult<MemoryQueryResponse> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(ClientError::api(500, "internal server error"));
            }
            Ok(MemoryQueryResponse { ok: true, count: 0, results: vec![] })
        }
    }

    #[tokio::test]
    async fn submit_task_stores_response_and_chains_refresh() {
        let api = Arc::new(MockApi { recent_items: 2, ..MockApi::default() });
        let controller = Controller::new(api.clone());

        controller.submit_task("save note X").await;

        let state = controller.state();
        assert!(!state.busy);
        assert_eq!(state.error, "");
        assert_eq!(state.last_task_response, Some(saved_note_response()));
        // the automatic refresh ran as its own cycle
        assert_eq!(api.recents.load(Ordering::SeqCst), 1);
        assert_eq!(state.memory_items.len(), 2);
    }

    #[tokio::test]
    async fn second_mutating_operation_while_busy_is_a_noop() {
        let api = Arc::new(MockApi::default());
        api.gate_submit.store(true, Ordering::SeqCst);
        let controller = Arc::new(Controller::new(api.clone()));

        let background = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.submit_task("first").await })
        };

        let mut rx = controller.watch();
        rx.wait_for(|s| s.busy).await.unwrap();

        // while busy: no state change, no duplicate request
        controller.query_memory("second", None, 10).await;
        controller.submit_task("third").await;
        assert_eq!(api.queries.load(Ordering::SeqCst), 0);
        assert_eq!(api.submits.load(Ordering::SeqCst), 1);
        assert!(controller.state().busy);

        api.release.notify_one();
        background.await.unwrap();

        let state = controller.state();
        assert!(!state.busy);
        assert_eq!(state.last_task_response, Some(saved_note_response()));
    }

    #[tokio::test]
    async fn failure_sets_error_and_leaves_results_untouched() {
        let api = Arc::new(MockApi { recent_items: 2, ..MockApi::default() });
        let controller = Controller::new(api.clone());

        controller.submit_task("seed state").await;
        let before = controller.state();
        assert_eq!(before.memory_items.len(), 2);

        api.fail.store(true, Ordering::SeqCst);
        controller.submit_task("will fail").await;

        let state = controller.state();
        assert!(!state.busy);
        assert!(state.error.contains("500"));
        assert_eq!(state.last_task_response, before.last_task_response);
        assert_eq!(state.memory_items, before.memory_items);
        // no chained refresh after a failed submit
        assert_eq!(api.recents.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn next_operation_clears_the_error_slot() {
        let api = Arc::new(MockApi::default());
        let controller = Controller::new(api.clone());

        api.fail.store(true, Ordering::SeqCst);
        controller.query_memory("boom", None, 5).await;
        assert!(!controller.state().error.is_empty());

        api.fail.store(false, Ordering::SeqCst);
        controller.query_memory("fine", None, 5).await;
        let state = controller.state();
        assert_eq!(state.error, "");
        assert!(state.memory_items.is_empty());
    }

    #[tokio::test]
    async fn empty_query_result_replaces_items_without_error() {
        let api = Arc::new(MockApi { recent_items: 3, ..MockApi::default() });
        let controller = Controller::new(api.clone());

        controller.refresh_recent_memory(None, 20).await;
        assert_eq!(controller.state().memory_items.len(), 3);

        controller.query_memory("nothing matches", None, 10).await;
        let state = controller.state();
        assert!(state.memory_items.is_empty());
        assert_eq!(state.error, "");
        assert!(!state.busy);
    }

    #[tokio::test]
    async fn observers_are_notified_on_every_transition() {
        let api = Arc::new(MockApi::default());
        let controller = Controller::new(api);
        let mut rx = controller.watch();

        controller.query_memory("q", None, 5).await;

        // at least one change was published, and the latest is idle
        assert!(rx.has_changed().unwrap());
        let latest = rx.borrow_and_update().clone();
        assert!(!latest.busy);
    }
}
