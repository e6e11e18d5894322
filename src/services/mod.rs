/// Capability checks re-validated before every write.
pub mod authority;
/// Catalog/search provider abstraction.
pub mod catalog;
/// Health check service.
pub mod health_service;
/// Identity/profile provider abstraction.
pub mod identity;
/// Playback controller abstraction.
pub mod playback;
/// Host preference persistence.
pub mod preferences;
/// Pure per-player view derivation.
pub mod projection;
/// Round lifecycle coordination.
pub mod round_service;
/// Scoring engine: pre-fill, overrides, confirmation.
pub mod scoring;
/// Session lifecycle: create, join, settings.
pub mod session_service;
/// Server-Sent Events snapshot streaming.
pub mod sse_service;
/// Session store supervision and degraded mode.
pub mod storage_supervisor;
/// OpenAPI documentation generation.
pub mod documentation;
