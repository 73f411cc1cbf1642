// Control service - spawns one AI player per game session over HTTP

pub mod registry;
pub mod routes;

pub use registry::Registry;
pub use routes::{build_router, AppState};
