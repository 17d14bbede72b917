//! HTTP shell over the migrator core: routing, middleware and the error
//! recovery boundary.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod server;
pub mod state;

pub use server::{build_router, serve};
pub use state::AppState;
