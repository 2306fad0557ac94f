//! Dashboard server
//!
//! Serves an HTML overview plus JSON endpoints for usage, sessions and the
//! background daemon.

mod api;
mod dashboard;
mod server;

pub use api::{SharedContext, WebContext};
pub use server::WebServer;
