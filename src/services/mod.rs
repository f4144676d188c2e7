/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Fire-and-forget persistence launching.
pub mod persistence_service;
/// Quiz cycle: start, questions, answers, results.
pub mod quiz_service;
/// Typed real-time event helpers.
pub mod room_events;
/// Room membership operations.
pub mod room_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;
