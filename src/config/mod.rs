// Configuration management module
// TOML settings for providers, the record source, the index and prompt assembly

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, GenerationBackend, GenerationConfig, IndexConfig, OllamaConfig,
    RetrievalConfig, SourceConfig,
};

/// Get the default configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("records-rag"))
        .ok_or(ConfigError::DirectoryError)
}
