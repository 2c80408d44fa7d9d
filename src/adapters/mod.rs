// Adapters - External system implementations

pub mod exec_process;
pub mod toml_config;

// Re-export adapters
pub use exec_process::{ProcessLauncher, StagePrograms};
pub use toml_config::{GififyConfig, PipelineConfig, TomlConfigAdapter};
