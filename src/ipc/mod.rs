mod error;
mod handlers;
mod helpers;
mod router;
mod types;

pub use handlers::watch::drain_events;
pub use router::handle_request;
pub use types::{AppState, Request};
