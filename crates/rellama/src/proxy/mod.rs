mod rewrite;
mod server;

pub use rewrite::{is_rewritable_route, rewrite_model};
pub use server::{AppState, ProxyServer, create_router, DEFAULT_LISTEN_ADDR};
