// ── Atoms: Constants ───────────────────────────────────────────────────────
// All named constants for the crate live here.
// Rationale: collecting constants in one place eliminates magic strings,
// makes auditing easier, and keeps every layer's code self-documenting.

// ── Stream framing ─────────────────────────────────────────────────────────
// The backend delivers chunked response bodies as newline-delimited records.
// Data records carry this prefix; anything else on a line is a keep-alive or
// protocol comment and is never surfaced.
pub const DATA_PREFIX: &str = "data:";

/// Reserved payload field signaling end-of-stream. The terminal record is
/// `data: {"done": true}` — the presence of the field is what matters, so a
/// token whose text happens to contain "done" can never end a stream.
pub const DONE_FIELD: &str = "done";

/// Payload field the backend uses to report a server-side failure mid-stream.
pub const ERROR_FIELD: &str = "error";

/// Payload field carrying one fragment of a streamed textual answer.
pub const TOKEN_FIELD: &str = "token";

// ── Identity ───────────────────────────────────────────────────────────────
// The per-installation identity is a single key-value pair in the local
// store. Changing the key would orphan existing identities — treat as a
// stable identifier.
pub const IDENTITY_KEY: &str = "user_id";

/// Header carrying the opaque installation identity on every request.
pub const USER_ID_HEADER: &str = "X-User-Id";

// ── Backend defaults ───────────────────────────────────────────────────────

/// Default backend address (the service's local development binding).
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Default page size for `/memory/recent` (mirrors the server default).
pub const DEFAULT_RECENT_LIMIT: u32 = 20;

/// Default memory budget for chat calls (mirrors the server default).
pub const DEFAULT_MEMORY_LIMIT: u32 = 8;

// ── Agent run parameters ───────────────────────────────────────────────────
// These are fixed by the wire contract for `/agent/v2/run` and
// `/agent/v2/stream`: the client always sends the same iteration cap,
// tool-use flag, and server-side timeout budget. The timeout is a hint
// interpreted by the backend — the client enforces no local deadline.
pub const AGENT_MAX_ITERATIONS: u32 = 8;
pub const AGENT_ALLOW_TOOLS: bool = true;
pub const AGENT_TIMEOUT_MS: u64 = 30_000;
