/// Platform-specific data and config locations
///
/// Resolved through `dirs`, which follows XDG on Linux, Known Folders on
/// Windows and the Standard Directories on macOS. Falls back to the current
/// directory when no home is available.
use std::path::PathBuf;

/// Folder name used under every platform directory
pub const APP_DIR_NAME: &str = "project-graph-rag";

/// Platform-agnostic path utilities
pub struct PlatformPaths;

impl PlatformPaths {
    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Returns: {data_dir}/project-graph-rag
    pub fn project_data_dir() -> PathBuf {
        Self::data_dir().join(APP_DIR_NAME)
    }

    /// Returns: {config_dir}/project-graph-rag
    pub fn project_config_dir() -> PathBuf {
        Self::config_dir().join(APP_DIR_NAME)
    }

    /// Returns: {data_dir}/project-graph-rag/lancedb
    pub fn default_lancedb_path() -> PathBuf {
        Self::project_data_dir().join("lancedb")
    }

    /// Returns: {config_dir}/project-graph-rag/config.toml
    pub fn default_config_path() -> PathBuf {
        Self::project_config_dir().join("config.toml")
    }
}
