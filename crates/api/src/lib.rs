pub mod catalog_handlers;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod router;
pub mod state;
pub mod user_handlers;

pub use error::ApiError;
pub use state::AppState;
