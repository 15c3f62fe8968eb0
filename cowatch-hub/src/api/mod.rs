//! HTTP and real-time API handlers

pub mod health;
pub mod sse;
pub mod state;
pub mod ui;
pub mod ws;

pub use health::health_routes;
pub use sse::event_stream;
pub use state::{get_state, post_state};
pub use ui::static_routes;
pub use ws::ws_handler;
