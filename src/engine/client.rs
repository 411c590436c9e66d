// ── Engine: Domain Client ──────────────────────────────────────────────────
// One operation per remote capability. Builds requests against the
// configured base address, attaches the installation identity, and for the
// streaming operations composes the frame decoder + event mapper.
//
// Propagation policy: no retries — every failure surfaces to the immediate
// caller. An `ok: false` inside a 2xx body is not a client error; callers
// inspect the `ok` field.

use async_trait::async_trait;
use log::info;
use reqwest::Client;
use serde_json::{json, Value};

use crate::atoms::constants::{
    AGENT_ALLOW_TOOLS, AGENT_MAX_ITERATIONS, AGENT_TIMEOUT_MS, USER_ID_HEADER,
};
use crate::atoms::error::ClientResult;
use crate::atoms::types::{
    AgentRunResponse, ChatResponse, HealthResponse, MemoryQueryResponse, MemoryWriteResponse,
    TaskResponse,
};
use crate::engine::http::{require_success, shared_client};
use crate::engine::stream::{
    decode_events, into_agent_stream, into_token_stream, AgentEventStream, TokenStream,
};

// ── Request body builders ──────────────────────────────────────────────────
// Pure helpers — limits and parameters are never validated client-side
// beyond trimming; the backend is the authority on range and validity.

fn task_body(text: &str) -> Value {
    json!({ "text": text.trim() })
}

fn query_body(query: &str, types: Option<&[String]>, limit: u32) -> Value {
    let mut body = json!({ "query": query.trim(), "limit": limit });
    if let Some(types) = types {
        body["types"] = json!(types);
    }
    body
}

fn chat_body(message: &str, use_memory: bool, memory_limit: u32) -> Value {
    json!({
        "message": message.trim(),
        "use_memory": use_memory,
        "memory_limit": memory_limit,
    })
}

fn agent_body(prompt: &str) -> Value {
    json!({
        "prompt": prompt.trim(),
        "max_iterations": AGENT_MAX_ITERATIONS,
        "allow_tools": AGENT_ALLOW_TOOLS,
        "timeout_ms": AGENT_TIMEOUT_MS,
    })
}

fn write_body(
    memory_type: &str,
    content: &str,
    source_task_id: Option<&str>,
    metadata: Option<&Value>,
) -> Value {
    let mut body = json!({
        "memory_type": memory_type,
        "content": content.trim(),
    });
    if let Some(task_id) = source_task_id {
        body["source_task_id"] = json!(task_id);
    }
    if let Some(metadata) = metadata {
        body["metadata"] = metadata.clone();
    }
    body
}

// ── Controller-facing trait ────────────────────────────────────────────────

/// The three request/response operations the operation controller drives.
/// A trait seam so the single-flight machine is testable without a network.
#[async_trait]
pub trait CognitiveApi: Send + Sync {
    async fn submit_task(&self, text: &str) -> ClientResult<TaskResponse>;

    async fn recent_memory(
        &self,
        memory_type: Option<&str>,
        limit: u32,
    ) -> ClientResult<MemoryQueryResponse>;

    async fn query_memory(
        &self,
        query: &str,
        types: Option<&[String]>,
        limit: u32,
    ) -> ClientResult<MemoryQueryResponse>;
}

// ── Client ─────────────────────────────────────────────────────────────────

/// HTTP client for the cognitive backend. Cheap to clone; all instances
/// share one connection pool.
#[derive(Clone)]
pub struct CognitiveClient {
    http: Client,
    base_url: String,
    user_id: String,
}

impl CognitiveClient {
    /// Create a client for the given backend address and installation
    /// identity (see `IdentityStore::user_id`).
    pub fn new(base_url: impl Into<String>, user_id: impl Into<String>) -> Self {
        let base_url = base_url.into();
        CognitiveClient {
            http: shared_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id: user_id.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn post(&self, path: &str, body: &Value) -> reqwest::RequestBuilder {
        self.http
            .post(self.url(path))
            .header(USER_ID_HEADER, &self.user_id)
            .json(body)
    }

    // ── Request/response operations ────────────────────────────────────

    /// `GET /health` — backend liveness and feature flags.
    pub async fn health(&self) -> ClientResult<HealthResponse> {
        let response = self
            .http
            .get(self.url("/health"))
            .header(USER_ID_HEADER, &self.user_id)
            .send()
            .await?;
        Ok(require_success(response).await?.json().await?)
    }

    /// `POST /llm/chat` — one-shot chat with optional memory retrieval.
    pub async fn chat(
        &self,
        message: &str,
        use_memory: bool,
        memory_limit: u32,
    ) -> ClientResult<ChatResponse> {
        let response = self
            .post("/llm/chat", &chat_body(message, use_memory, memory_limit))
            .send()
            .await?;
        Ok(require_success(response).await?.json().await?)
    }

    /// `POST /agent/v2/run` — one-shot agent run (fixed iteration cap,
    /// tool-use flag, and server-side timeout budget).
    pub async fn run_agent(&self, prompt: &str) -> ClientResult<AgentRunResponse> {
        let response = self.post("/agent/v2/run", &agent_body(prompt)).send().await?;
        Ok(require_success(response).await?.json().await?)
    }

    /// `POST /memory/write` — store one memory row.
    pub async fn write_memory(
        &self,
        memory_type: &str,
        content: &str,
        source_task_id: Option<&str>,
        metadata: Option<&Value>,
    ) -> ClientResult<MemoryWriteResponse> {
        let body = write_body(memory_type, content, source_task_id, metadata);
        let response = self.post("/memory/write", &body).send().await?;
        Ok(require_success(response).await?.json().await?)
    }

    // ── Streaming operations ───────────────────────────────────────────
    // A non-200 at connection open fails before any events; after that the
    // returned stream owns the connection and releases it when dropped.

    /// `POST /llm/stream` — streamed chat; yields token fragments until the
    /// completion sentinel.
    pub async fn chat_stream(
        &self,
        message: &str,
        use_memory: bool,
        memory_limit: u32,
    ) -> ClientResult<TokenStream> {
        info!("[client] Opening chat stream");
        let response = self
            .post("/llm/stream", &chat_body(message, use_memory, memory_limit))
            .send()
            .await?;
        let response = require_success(response).await?;
        Ok(into_token_stream(decode_events(response.bytes_stream())))
    }

    /// `POST /agent/v2/stream` — streamed agent run; yields one structured
    /// record per step until the completion sentinel.
    pub async fn agent_stream(&self, prompt: &str) -> ClientResult<AgentEventStream> {
        info!("[client] Opening agent stream");
        let response = self.post("/agent/v2/stream", &agent_body(prompt)).send().await?;
        let response = require_success(response).await?;
        Ok(into_agent_stream(decode_events(response.bytes_stream())))
    }
}

#[async_trait]
impl CognitiveApi for CognitiveClient {
    /// `POST /task` — submit a natural-language task.
    async fn submit_task(&self, text: &str) -> ClientResult<TaskResponse> {
        info!("[client] Submitting task");
        let response = self.post("/task", &task_body(text)).send().await?;
        Ok(require_success(response).await?.json().await?)
    }

    /// `GET /memory/recent` — newest memory rows, optionally filtered by type.
    async fn recent_memory(
        &self,
        memory_type: Option<&str>,
        limit: u32,
    ) -> ClientResult<MemoryQueryResponse> {
        let mut request = self
            .http
            .get(self.url("/memory/recent"))
            .header(USER_ID_HEADER, &self.user_id)
            .query(&[("limit", limit)]);
        if let Some(memory_type) = memory_type {
            request = request.query(&[("memory_type", memory_type)]);
        }
        let response = request.send().await?;
        Ok(require_success(response).await?.json().await?)
    }

    /// `POST /memory/query` — retrieval query over stored memory.
    async fn query_memory(
        &self,
        query: &str,
        types: Option<&[String]>,
        limit: u32,
    ) -> ClientResult<MemoryQueryResponse> {
        let body = query_body(query, types, limit);
        let response = self.post("/memory/query", &body).send().await?;
        Ok(require_success(response).await?.json().await?)
    }
}
