pub mod artifacts;
pub mod convert;
pub mod error;
pub mod formats;
pub mod handlers;
pub mod jobs;
pub mod middleware;
pub mod routes;

pub use routes::create_router;
