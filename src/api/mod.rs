//! HTTP API Handlers and Routes
//!
//! The presentation layer for A.T.L.A.S, built on the Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! ## Research (`/api/research`)
//! - `POST /api/research` - Run the full pipeline synchronously and return
//!   the final report. Never suspends: a clarification request resolves by
//!   carrying the raw topic forward.
//!
//! ## Streaming (`/ws`)
//! - `GET /ws` - WebSocket entry point. Each text message starts a run;
//!   per-stage progress events stream back as `{"type": ..., "data": ...}`
//!   messages. While a run awaits clarification, the next text message is
//!   taken as the answer.
//!
//! ## Health (`/health`)
//! - `GET /health` - Health check endpoint

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;
