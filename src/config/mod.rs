/// Application configuration
pub mod app;
pub use app::{load_app_config, AppConfig, LoadGeneratorConfig};

/// Configuration traits
pub mod traits;
pub use traits::{Configuration, PathConfiguration};
