//! Component F: configuration loading and the CLI surface.

mod cli;
mod error;
mod loader;
mod settings;

pub use cli::Cli;
pub use error::ConfigError;
pub use loader::load;
pub use settings::{AppConfig, CloudSectionConfig, PhorqueSection, PolicySection, STATIC_SECTIONS};
