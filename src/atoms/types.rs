// ── Atoms: Wire Types ──────────────────────────────────────────────────────
// Data structures that cross the HTTP boundary, plus the controller's
// observable state. Response schemas are deliberately permissive on read:
// every field carries a serde default (empty string, zero, empty map, empty
// sequence) so a missing field never fails deserialization — the backend is
// the authority on its own payload shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One step of a multi-iteration tool-using agent run. The schema is owned
/// by the backend; the client yields each step verbatim.
pub type AgentStepEvent = Value;

// ── Task ───────────────────────────────────────────────────────────────────

/// Result of `POST /task`. `data` is an open-ended payload opaque to the
/// client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResponse {
    #[serde(default)]
    pub task_id: String,
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

// ── Memory ─────────────────────────────────────────────────────────────────

/// One stored memory row as returned by `/memory/recent` and `/memory/query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub memory_type: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub source_task_id: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Shared result shape of both memory read endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryQueryResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub results: Vec<MemoryItem>,
}

/// Result of `POST /memory/write`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryWriteResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub memory_id: i64,
}

// ── Chat ───────────────────────────────────────────────────────────────────

/// Result of the one-shot `POST /llm/chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub task_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub memory_used: u64,
}

/// One emitted fragment of an in-progress streamed answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenEvent {
    pub token: String,
}

// ── Agent (one-shot) ───────────────────────────────────────────────────────

/// Result of the non-streaming `POST /agent/v2/run`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRunResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub steps: Vec<Value>,
    #[serde(default)]
    pub decision_trace: Map<String, Value>,
    #[serde(default)]
    pub error: Option<String>,
}

// ── Service health ─────────────────────────────────────────────────────────

/// Result of `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub llm_enabled: bool,
    #[serde(default)]
    pub agent_v2_enabled: bool,
    #[serde(default)]
    pub tools_enabled: bool,
}

// ── Controller state ───────────────────────────────────────────────────────

/// Snapshot of the operation controller's observable state. Owned
/// exclusively by the controller; consumers receive clones and never mutate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationState {
    /// True while a mutating operation is in flight.
    pub busy: bool,
    /// Human-readable description of the last failure; empty when clear.
    /// Cleared at the start of the next mutating operation.
    pub error: String,
    /// Last successful task submission result.
    pub last_task_response: Option<TaskResponse>,
    /// Last successfully fetched memory items (recent or query results).
    pub memory_items: Vec<MemoryItem>,
}
