// Task OS Client — Rust client for the Task OS cognitive backend.
//
// Talks to the backend over HTTP: conventional request/response calls for
// task submission and memory search, plus two long-lived incrementally
// delivered response channels (token streaming and multi-step agent-event
// streaming). The public surface is exactly what a presentation layer
// needs:
//
//   • `IdentityStore` — the stable per-installation identity
//   • `CognitiveClient` — one operation per remote capability
//   • `Controller` — single-flight gate over the mutating operations;
//     observe it, never mutate it
//
// Streaming calls bypass the controller by design: a stream is
// presentation-paced and may run alongside controller operations.

pub mod atoms;
pub mod engine;

pub use atoms::constants::{DEFAULT_BASE_URL, DEFAULT_MEMORY_LIMIT, DEFAULT_RECENT_LIMIT};
pub use atoms::error::{ClientError, ClientResult};
pub use atoms::types::{
    AgentRunResponse, AgentStepEvent, ChatResponse, HealthResponse, MemoryItem,
    MemoryQueryResponse, MemoryWriteResponse, OperationState, TaskResponse, TokenEvent,
};
pub use engine::client::{CognitiveApi, CognitiveClient};
pub use engine::controller::Controller;
pub use engine::identity::IdentityStore;
pub use engine::stream::{AgentEventStream, FrameDecoder, TokenStream};
