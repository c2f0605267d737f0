//! WebSocket chat server: routes, per-connection pump and shutdown handling.

mod handler;
mod server;
mod signal;
pub mod state;

pub use handler::handle_frame;
pub use server::Server;
