// ── Engine Layer ───────────────────────────────────────────────────────────
// The working layer: identity persistence, HTTP plumbing, stream decoding,
// the domain client, and the single-flight operation controller.
//
// Dependency rule (one-way): engine/ → atoms/. The presentation layer sits
// above and only observes controller state and invokes operations — nothing
// in here knows about screens or widgets.

pub mod client;
pub mod controller;
pub(crate) mod http;
pub mod identity;
pub mod stream;
