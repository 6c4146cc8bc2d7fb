//! Bootstrap helpers for persona-forge.
//!
//! Credentials such as `OPENAI_API_KEY` are usually kept in a dotenv file
//! rather than exported in the shell. Two files are read:
//!
//!   explicit env vars > `./.env` > `~/.persona-forge/.env`
//!
//! dotenvy never overwrites existing env vars, so loading `./.env` first
//! gives it priority over the home-directory file.

use std::path::PathBuf;

/// `~/.persona-forge`, or `./.persona-forge` when no home directory exists.
pub fn forge_home_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".persona-forge")
}

/// Path to the persona-forge-specific `.env` file: `~/.persona-forge/.env`.
pub fn forge_env_path() -> PathBuf {
    forge_home_dir().join(".env")
}

/// History file for the interactive session.
pub fn session_history_path() -> PathBuf {
    forge_home_dir().join("history")
}

/// Load `./.env` and then `~/.persona-forge/.env`.
pub fn load_forge_env() {
    let _ = dotenvy::dotenv();

    let path = forge_env_path();
    if path.exists()
        && let Err(e) = dotenvy::from_path(&path)
    {
        tracing::warn!("Failed to load {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_path_lives_under_forge_home() {
        let path = forge_env_path();
        assert!(path.to_string_lossy().contains(".persona-forge"));
        assert!(path.to_string_lossy().ends_with(".env"));
        assert!(session_history_path().starts_with(forge_home_dir()));
    }
}
