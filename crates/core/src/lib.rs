pub mod config;
pub mod db;
pub mod ids;
pub mod migrations;

pub use config::{
    AppConfig, AuthConfig, CorsConfig, DatabaseConfig, SeedConfig, ServerConfig, TelemetryConfig,
};
pub use db::{store_error, Database, StoreError, StoreResult};
pub use ids::parse_positive_id;
pub use migrations::{run_migrations, Migration, MIGRATIONS};
