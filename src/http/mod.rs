//! HTTP control API
//!
//! REST surface the UI drives:
//! - recordings CRUD and categories
//! - monthly statistics
//! - local model lifecycle (load/status/reset) and per-recording transcription
//! - batch extraction of pending recordings via the hosted model

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
