use std::path::PathBuf;

/// Environment variable that overrides the data root.
pub const ROOT_ENV: &str = "DESKWATCH_ROOT";

/// Returns the directory holding `config.yaml` and the persisted session.
///
/// Resolution order:
/// 1. `DESKWATCH_ROOT` environment variable (if set)
/// 2. The platform config directory for deskwatch
/// 3. `.deskwatch` in the current working directory
pub fn deskwatch_root() -> PathBuf {
    if let Ok(root) = std::env::var(ROOT_ENV)
        && !root.is_empty()
    {
        return PathBuf::from(root);
    }
    directories::ProjectDirs::from("com", "deskwatch", "deskwatch")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".deskwatch"))
}

/// Returns the path of the configuration file.
pub fn config_path() -> PathBuf {
    deskwatch_root().join("config.yaml")
}

/// Returns the path of the persisted manager session.
pub fn session_path() -> PathBuf {
    deskwatch_root().join("session.yaml")
}
